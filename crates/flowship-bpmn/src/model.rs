// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Workflow Model - normalized in-memory form of a BPMN process.
//!
//! The parser produces these types; the code generator is their only consumer.
//! Every vector preserves document order so that downstream generation is
//! deterministic.

use serde::{Deserialize, Serialize};

// ============================================================================
// Root Type
// ============================================================================

/// A parsed BPMN process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowModel {
    /// `id` attribute of the process element.
    pub process_id: String,

    /// `name` attribute of the process element (falls back to the id).
    pub process_name: String,

    /// Start events in document order.
    #[serde(default)]
    pub start_events: Vec<StartEvent>,

    /// End events in document order.
    #[serde(default)]
    pub end_events: Vec<EndEvent>,

    /// Human-performed steps.
    #[serde(default)]
    pub user_tasks: Vec<UserTask>,

    /// Automated steps (service, send and script tasks).
    #[serde(default)]
    pub service_tasks: Vec<ServiceTask>,

    /// Branching and merging nodes.
    #[serde(default)]
    pub gateways: Vec<Gateway>,

    /// Intermediate and boundary timer events.
    #[serde(default)]
    pub timer_events: Vec<TimerEvent>,

    /// Intermediate and boundary message events.
    #[serde(default)]
    pub message_events: Vec<MessageEvent>,

    /// Call activities invoking other processes.
    #[serde(default)]
    pub call_activities: Vec<CallActivity>,

    /// Edges of the process graph.
    #[serde(default)]
    pub sequence_flows: Vec<SequenceFlow>,

    /// Declared process variables (drive the request contract).
    #[serde(default)]
    pub variables: Vec<ProcessVariable>,
}

impl WorkflowModel {
    /// All node ids in a stable order (events, tasks, gateways, auxiliary nodes).
    pub fn node_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        ids.extend(self.start_events.iter().map(|n| n.id.as_str()));
        ids.extend(self.end_events.iter().map(|n| n.id.as_str()));
        ids.extend(self.user_tasks.iter().map(|n| n.id.as_str()));
        ids.extend(self.service_tasks.iter().map(|n| n.id.as_str()));
        ids.extend(self.gateways.iter().map(|n| n.id.as_str()));
        ids.extend(self.timer_events.iter().map(|n| n.id.as_str()));
        ids.extend(self.message_events.iter().map(|n| n.id.as_str()));
        ids.extend(self.call_activities.iter().map(|n| n.id.as_str()));
        ids
    }

    /// Look up a node by id.
    pub fn find_node(&self, id: &str) -> Option<NodeRef<'_>> {
        if let Some(n) = self.start_events.iter().find(|n| n.id == id) {
            return Some(NodeRef::StartEvent(n));
        }
        if let Some(n) = self.end_events.iter().find(|n| n.id == id) {
            return Some(NodeRef::EndEvent(n));
        }
        if let Some(n) = self.user_tasks.iter().find(|n| n.id == id) {
            return Some(NodeRef::UserTask(n));
        }
        if let Some(n) = self.service_tasks.iter().find(|n| n.id == id) {
            return Some(NodeRef::ServiceTask(n));
        }
        if let Some(n) = self.gateways.iter().find(|n| n.id == id) {
            return Some(NodeRef::Gateway(n));
        }
        if let Some(n) = self.timer_events.iter().find(|n| n.id == id) {
            return Some(NodeRef::TimerEvent(n));
        }
        if let Some(n) = self.message_events.iter().find(|n| n.id == id) {
            return Some(NodeRef::MessageEvent(n));
        }
        self.call_activities
            .iter()
            .find(|n| n.id == id)
            .map(NodeRef::CallActivity)
    }

    /// Number of user and service tasks (one generated handler each).
    pub fn task_count(&self) -> usize {
        self.user_tasks.len() + self.service_tasks.len()
    }

    /// Flows leaving the given node, in document order.
    pub fn outgoing_flows(&self, node_id: &str) -> Vec<&SequenceFlow> {
        self.sequence_flows
            .iter()
            .filter(|f| f.source_ref == node_id)
            .collect()
    }

    /// Flows entering the given node, in document order.
    pub fn incoming_flows(&self, node_id: &str) -> Vec<&SequenceFlow> {
        self.sequence_flows
            .iter()
            .filter(|f| f.target_ref == node_id)
            .collect()
    }
}

/// Borrowed view over any node kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeRef<'a> {
    StartEvent(&'a StartEvent),
    EndEvent(&'a EndEvent),
    UserTask(&'a UserTask),
    ServiceTask(&'a ServiceTask),
    Gateway(&'a Gateway),
    TimerEvent(&'a TimerEvent),
    MessageEvent(&'a MessageEvent),
    CallActivity(&'a CallActivity),
}

impl NodeRef<'_> {
    /// Node kind name for messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeRef::StartEvent(_) => "startEvent",
            NodeRef::EndEvent(_) => "endEvent",
            NodeRef::UserTask(_) => "userTask",
            NodeRef::ServiceTask(_) => "serviceTask",
            NodeRef::Gateway(_) => "gateway",
            NodeRef::TimerEvent(_) => "timerEvent",
            NodeRef::MessageEvent(_) => "messageEvent",
            NodeRef::CallActivity(_) => "callActivity",
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// Process entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartEvent {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: StartEventKind,
}

/// Trigger of a start event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StartEventKind {
    /// No trigger (manual/API start).
    Plain,
    /// Started by a correlated message.
    Message { message_name: String },
    /// Started on a schedule.
    Timer { timer: TimerDefinition },
    /// Started by a broadcast signal.
    Signal { signal_name: String },
}

/// Process exit point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndEvent {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: EndEventKind,
}

/// Result of an end event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EndEventKind {
    Plain,
    /// Throws a BPMN error with the given code.
    Error { error_code: String },
    /// Terminates all remaining tokens.
    Terminate,
    /// Publishes a message on completion.
    Message { message_name: String },
}

/// Timer schedule of a timer event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerDefinition {
    pub kind: TimerKind,
    /// Raw expression as written in the document (ISO-8601 or FEEL).
    pub expression: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerKind {
    Date,
    Duration,
    Cycle,
}

/// Intermediate or boundary timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerEvent {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub timer: TimerDefinition,
}

/// Intermediate or boundary message catch/throw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub message_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_key: Option<String>,
}

// ============================================================================
// Tasks
// ============================================================================

/// Candidate/assignee configuration of a user task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidate_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidate_users: Vec<String>,
}

impl Assignment {
    /// True when nobody is designated to work on the task.
    pub fn is_unassigned(&self) -> bool {
        self.assignee.is_none() && self.candidate_groups.is_empty() && self.candidate_users.is_empty()
    }
}

/// A process step performed by a human through the task inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTask {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Vendor-extension task-type tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    #[serde(default)]
    pub assignment: Assignment,
    /// Linked form reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    /// Due-date expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default)]
    pub incoming: Vec<String>,
    #[serde(default)]
    pub outgoing: Vec<String>,
}

/// How an automated step is carried out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImplementationKind {
    /// Dispatched to an external job worker by task type.
    #[default]
    JobWorker,
    /// Calls a REST endpoint.
    RestCall,
    /// Publishes a message.
    MessagePublish,
    /// Evaluates an inline script.
    Script,
}

impl ImplementationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImplementationKind::JobWorker => "job-worker",
            ImplementationKind::RestCall => "rest-call",
            ImplementationKind::MessagePublish => "message-publish",
            ImplementationKind::Script => "script",
        }
    }
}

/// Default retry count when a service task declares none.
pub const DEFAULT_RETRIES: u32 = 3;

/// A process step performed automatically by a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTask {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Vendor-extension task-type tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    pub implementation: ImplementationKind,
    pub retries: u32,
    #[serde(default)]
    pub incoming: Vec<String>,
    #[serde(default)]
    pub outgoing: Vec<String>,
}

// ============================================================================
// Gateways, Call Activities, Flows
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GatewayKind {
    /// Exactly one outgoing path.
    Exclusive,
    /// All outgoing paths.
    Parallel,
    /// Any subset of outgoing paths.
    Inclusive,
    /// First event to arrive wins.
    EventBased,
}

/// Branching or merging node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gateway {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: GatewayKind,
    /// Flow taken when no condition matches (exclusive/inclusive only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_flow: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallKind {
    /// Calls another BPMN process.
    #[default]
    Process,
    /// Calls a CMMN case.
    Case,
}

/// Invocation of another process definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallActivity {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub called_element: String,
    pub call_kind: CallKind,
}

/// Edge of the process graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceFlow {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub source_ref: String,
    pub target_ref: String,
    /// Condition expression guarding this flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// A declared process variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessVariable {
    pub name: String,
    /// Declared type name as written (e.g. "string", "integer", "datetime").
    #[serde(rename = "type")]
    pub var_type: String,
    #[serde(default)]
    pub required: bool,
}
