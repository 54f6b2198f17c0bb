// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! BPMN XML -> [`WorkflowModel`].
//!
//! Elements are matched by local name so the parser accepts documents from any
//! modeler regardless of the prefix bound to the BPMN namespace. Vendor extensions
//! (Zeebe, Camunda 7, plain `property` lists) are read the same way.

use std::collections::HashMap;

use roxmltree::{Document, Node};
use tracing::debug;

use crate::error::{ParseError, Result};
use crate::model::*;

/// Tag names of every BPMN flow node that may appear as a sequence-flow endpoint.
pub(crate) const FLOW_NODE_TAGS: &[&str] = &[
    "startEvent",
    "endEvent",
    "intermediateCatchEvent",
    "intermediateThrowEvent",
    "boundaryEvent",
    "task",
    "userTask",
    "serviceTask",
    "sendTask",
    "receiveTask",
    "scriptTask",
    "manualTask",
    "businessRuleTask",
    "callActivity",
    "subProcess",
    "transaction",
    "adHocSubProcess",
    "exclusiveGateway",
    "parallelGateway",
    "inclusiveGateway",
    "eventBasedGateway",
    "complexGateway",
];

/// Parse a BPMN document into a [`WorkflowModel`].
///
/// When the document declares several processes the first one is used.
pub fn parse(xml: &str) -> Result<WorkflowModel> {
    let doc = Document::parse(xml).map_err(|e| ParseError::MalformedXml(e.to_string()))?;
    let process = find_processes(&doc)
        .into_iter()
        .next()
        .ok_or(ParseError::MissingProcess)?;

    let definitions = Definitions::collect(&doc);
    let model = read_process(&definitions, process);

    debug!(
        process_id = %model.process_id,
        user_tasks = model.user_tasks.len(),
        service_tasks = model.service_tasks.len(),
        flows = model.sequence_flows.len(),
        "Parsed BPMN process"
    );

    Ok(model)
}

/// All `process` elements of the document in document order.
pub(crate) fn find_processes<'a, 'input>(doc: &'a Document<'input>) -> Vec<Node<'a, 'input>> {
    doc.descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "process")
        .collect()
}

// ============================================================================
// Document-level definitions (messages, errors, signals)
// ============================================================================

#[derive(Debug, Clone)]
struct MessageDef {
    name: String,
    correlation_key: Option<String>,
}

/// Root-level elements referenced by id from event definitions.
#[derive(Debug, Default)]
pub(crate) struct Definitions {
    messages: HashMap<String, MessageDef>,
    errors: HashMap<String, String>,
    signals: HashMap<String, String>,
}

impl Definitions {
    pub(crate) fn collect(doc: &Document<'_>) -> Self {
        let mut defs = Definitions::default();
        for node in doc.descendants().filter(Node::is_element) {
            let Some(id) = attr(&node, "id") else {
                continue;
            };
            match node.tag_name().name() {
                "message" => {
                    let name = attr(&node, "name").unwrap_or(id).to_string();
                    let correlation_key = extension(&node, "subscription")
                        .and_then(|s| attr_string(&s, "correlationKey"));
                    defs.messages.insert(
                        id.to_string(),
                        MessageDef {
                            name,
                            correlation_key,
                        },
                    );
                }
                "error" => {
                    let code = attr(&node, "errorCode")
                        .or_else(|| attr(&node, "name"))
                        .unwrap_or(id);
                    defs.errors.insert(id.to_string(), code.to_string());
                }
                "signal" => {
                    let name = attr(&node, "name").unwrap_or(id);
                    defs.signals.insert(id.to_string(), name.to_string());
                }
                _ => {}
            }
        }
        defs
    }

    fn message_name(&self, reference: Option<&str>) -> String {
        match reference {
            Some(r) => self
                .messages
                .get(r)
                .map(|m| m.name.clone())
                .unwrap_or_else(|| r.to_string()),
            None => String::new(),
        }
    }

    fn correlation_key(&self, reference: Option<&str>) -> Option<String> {
        reference
            .and_then(|r| self.messages.get(r))
            .and_then(|m| m.correlation_key.clone())
    }
}

// ============================================================================
// Process
// ============================================================================

pub(crate) fn read_process(defs: &Definitions, process: Node<'_, '_>) -> WorkflowModel {
    let process_id = attr_string(&process, "id").unwrap_or_default();
    let process_name = attr_string(&process, "name").unwrap_or_else(|| process_id.clone());

    let mut model = WorkflowModel {
        process_id,
        process_name,
        ..Default::default()
    };

    for child in process.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "startEvent" => model.start_events.push(read_start_event(defs, &child)),
            "endEvent" => model.end_events.push(read_end_event(defs, &child)),
            "userTask" => model.user_tasks.push(read_user_task(&child)),
            "serviceTask" | "businessRuleTask" => {
                model.service_tasks.push(read_service_task(&child, None))
            }
            "sendTask" => model
                .service_tasks
                .push(read_service_task(&child, Some(ImplementationKind::MessagePublish))),
            "scriptTask" => model
                .service_tasks
                .push(read_service_task(&child, Some(ImplementationKind::Script))),
            "receiveTask" => model.message_events.push(read_message_event(defs, &child, None)),
            "exclusiveGateway" => model.gateways.push(read_gateway(&child, GatewayKind::Exclusive)),
            "parallelGateway" => model.gateways.push(read_gateway(&child, GatewayKind::Parallel)),
            "inclusiveGateway" => model.gateways.push(read_gateway(&child, GatewayKind::Inclusive)),
            "eventBasedGateway" => {
                model.gateways.push(read_gateway(&child, GatewayKind::EventBased))
            }
            "intermediateCatchEvent" | "intermediateThrowEvent" | "boundaryEvent" => {
                read_intermediate_event(defs, &child, &mut model)
            }
            "callActivity" => model.call_activities.push(read_call_activity(&child)),
            "sequenceFlow" => model.sequence_flows.push(read_sequence_flow(&child)),
            "extensionElements" => model.variables.extend(read_variables(&child)),
            other => {
                debug!(element = other, id = ?attr(&child, "id"), "Skipping BPMN element");
            }
        }
    }

    link_flows(&mut model);
    model
}

/// Merge flow ids derived from `sourceRef`/`targetRef` into task incoming/outgoing lists.
fn link_flows(model: &mut WorkflowModel) {
    let flows = model.sequence_flows.clone();
    let link = |id: &str, incoming: &mut Vec<String>, outgoing: &mut Vec<String>| {
        for flow in &flows {
            if flow.target_ref == id && !incoming.contains(&flow.id) {
                incoming.push(flow.id.clone());
            }
            if flow.source_ref == id && !outgoing.contains(&flow.id) {
                outgoing.push(flow.id.clone());
            }
        }
    };
    for task in &mut model.user_tasks {
        link(&task.id, &mut task.incoming, &mut task.outgoing);
    }
    for task in &mut model.service_tasks {
        link(&task.id, &mut task.incoming, &mut task.outgoing);
    }
}

// ============================================================================
// Events
// ============================================================================

fn read_start_event(defs: &Definitions, node: &Node<'_, '_>) -> StartEvent {
    let kind = if let Some(def) = child(node, "messageEventDefinition") {
        StartEventKind::Message {
            message_name: defs.message_name(attr(&def, "messageRef")),
        }
    } else if let Some(def) = child(node, "timerEventDefinition") {
        StartEventKind::Timer {
            timer: read_timer(&def),
        }
    } else if let Some(def) = child(node, "signalEventDefinition") {
        let signal_name = attr(&def, "signalRef")
            .map(|r| defs.signals.get(r).cloned().unwrap_or_else(|| r.to_string()))
            .unwrap_or_default();
        StartEventKind::Signal { signal_name }
    } else {
        StartEventKind::Plain
    };

    StartEvent {
        id: attr_string(node, "id").unwrap_or_default(),
        name: attr_string(node, "name"),
        kind,
    }
}

fn read_end_event(defs: &Definitions, node: &Node<'_, '_>) -> EndEvent {
    let kind = if let Some(def) = child(node, "errorEventDefinition") {
        let error_code = attr(&def, "errorRef")
            .map(|r| defs.errors.get(r).cloned().unwrap_or_else(|| r.to_string()))
            .unwrap_or_default();
        EndEventKind::Error { error_code }
    } else if child(node, "terminateEventDefinition").is_some() {
        EndEventKind::Terminate
    } else if let Some(def) = child(node, "messageEventDefinition") {
        EndEventKind::Message {
            message_name: defs.message_name(attr(&def, "messageRef")),
        }
    } else {
        EndEventKind::Plain
    };

    EndEvent {
        id: attr_string(node, "id").unwrap_or_default(),
        name: attr_string(node, "name"),
        kind,
    }
}

fn read_intermediate_event(defs: &Definitions, node: &Node<'_, '_>, model: &mut WorkflowModel) {
    if let Some(def) = child(node, "timerEventDefinition") {
        model.timer_events.push(TimerEvent {
            id: attr_string(node, "id").unwrap_or_default(),
            name: attr_string(node, "name"),
            timer: read_timer(&def),
        });
    } else if let Some(def) = child(node, "messageEventDefinition") {
        model
            .message_events
            .push(read_message_event(defs, node, Some(&def)));
    } else {
        debug!(id = ?attr(node, "id"), "Skipping intermediate event without timer/message definition");
    }
}

fn read_timer(def: &Node<'_, '_>) -> TimerDefinition {
    for c in def.children().filter(Node::is_element) {
        let kind = match c.tag_name().name() {
            "timeDate" => TimerKind::Date,
            "timeDuration" => TimerKind::Duration,
            "timeCycle" => TimerKind::Cycle,
            _ => continue,
        };
        return TimerDefinition {
            kind,
            expression: text(&c),
        };
    }
    TimerDefinition {
        kind: TimerKind::Duration,
        expression: String::new(),
    }
}

/// Read a message catch/throw. `definition` is the `messageEventDefinition` child;
/// receive tasks carry `messageRef` on the element itself.
fn read_message_event(
    defs: &Definitions,
    node: &Node<'_, '_>,
    definition: Option<&Node<'_, '_>>,
) -> MessageEvent {
    let message_ref = definition
        .and_then(|d| attr(d, "messageRef"))
        .or_else(|| attr(node, "messageRef"));

    let correlation_key = extension(node, "subscription")
        .and_then(|s| attr_string(&s, "correlationKey"))
        .or_else(|| defs.correlation_key(message_ref));

    MessageEvent {
        id: attr_string(node, "id").unwrap_or_default(),
        name: attr_string(node, "name"),
        message_name: defs.message_name(message_ref),
        correlation_key,
    }
}

// ============================================================================
// Tasks
// ============================================================================

fn read_user_task(node: &Node<'_, '_>) -> UserTask {
    let assignment_def = extension(node, "assignmentDefinition");
    let from_def = |name: &str| assignment_def.as_ref().and_then(|d| attr_string(d, name));

    let assignment = Assignment {
        assignee: from_def("assignee").or_else(|| attr_string(node, "assignee")),
        candidate_groups: split_list(
            from_def("candidateGroups").or_else(|| attr_string(node, "candidateGroups")),
        ),
        candidate_users: split_list(
            from_def("candidateUsers").or_else(|| attr_string(node, "candidateUsers")),
        ),
    };

    let form_key = extension(node, "formDefinition")
        .and_then(|f| attr_string(&f, "formKey").or_else(|| attr_string(&f, "formId")))
        .or_else(|| attr_string(node, "formKey"));

    let priority = extension(node, "priorityDefinition")
        .and_then(|p| attr_string(&p, "priority"))
        .or_else(|| attr_string(node, "priority"))
        .and_then(|p| p.trim_start_matches('=').trim().parse().ok());

    let due_date = extension(node, "taskSchedule")
        .and_then(|s| attr_string(&s, "dueDate"))
        .or_else(|| attr_string(node, "dueDate"));

    UserTask {
        id: attr_string(node, "id").unwrap_or_default(),
        name: attr_string(node, "name"),
        task_type: read_task_type(node),
        assignment,
        form_key,
        priority,
        due_date,
        incoming: child_texts(node, "incoming"),
        outgoing: child_texts(node, "outgoing"),
    }
}

fn read_service_task(node: &Node<'_, '_>, forced: Option<ImplementationKind>) -> ServiceTask {
    let task_type = read_task_type(node);
    let implementation = forced.unwrap_or_else(|| read_implementation(node, task_type.as_deref()));

    let retries = extension(node, "taskDefinition")
        .and_then(|d| attr_string(&d, "retries"))
        .or_else(|| property(node, "retries"))
        .and_then(|r| r.trim_start_matches('=').trim().parse().ok())
        .unwrap_or(DEFAULT_RETRIES);

    ServiceTask {
        id: attr_string(node, "id").unwrap_or_default(),
        name: attr_string(node, "name"),
        task_type,
        implementation,
        retries,
        incoming: child_texts(node, "incoming"),
        outgoing: child_texts(node, "outgoing"),
    }
}

/// Vendor task-type tag: Zeebe `taskDefinition@type`, a `taskType` property or
/// attribute, or a Camunda 7 external-task `topic`.
fn read_task_type(node: &Node<'_, '_>) -> Option<String> {
    extension(node, "taskDefinition")
        .and_then(|d| attr_string(&d, "type"))
        .or_else(|| property(node, "taskType"))
        .or_else(|| attr_string(node, "taskType"))
        .or_else(|| attr_string(node, "topic"))
}

fn read_implementation(node: &Node<'_, '_>, task_type: Option<&str>) -> ImplementationKind {
    let declared = property(node, "implementation").or_else(|| attr_string(node, "implementation"));
    if let Some(kind) = declared.as_deref().and_then(implementation_from_str) {
        return kind;
    }

    // "rest:customs-lookup" style task types carry the kind as a prefix
    task_type
        .and_then(|t| t.split([':', '.']).next())
        .and_then(implementation_from_str)
        .unwrap_or_default()
}

fn implementation_from_str(value: &str) -> Option<ImplementationKind> {
    match value.trim().to_ascii_lowercase().as_str() {
        "rest" | "http" | "rest-call" | "restcall" | "##webservice" => {
            Some(ImplementationKind::RestCall)
        }
        "message" | "publish" | "message-publish" => Some(ImplementationKind::MessagePublish),
        "script" | "feel" => Some(ImplementationKind::Script),
        "job-worker" | "worker" | "external" => Some(ImplementationKind::JobWorker),
        _ => None,
    }
}

// ============================================================================
// Gateways, call activities, flows, variables
// ============================================================================

fn read_gateway(node: &Node<'_, '_>, kind: GatewayKind) -> Gateway {
    let default_flow = match kind {
        GatewayKind::Exclusive | GatewayKind::Inclusive => attr_string(node, "default"),
        GatewayKind::Parallel | GatewayKind::EventBased => None,
    };
    Gateway {
        id: attr_string(node, "id").unwrap_or_default(),
        name: attr_string(node, "name"),
        kind,
        default_flow,
    }
}

fn read_call_activity(node: &Node<'_, '_>) -> CallActivity {
    let (called_element, call_kind) = if let Some(case_ref) = attr_string(node, "caseRef") {
        (case_ref, CallKind::Case)
    } else {
        let called = extension(node, "calledElement")
            .and_then(|c| attr_string(&c, "processId"))
            .or_else(|| attr_string(node, "calledElement"))
            .unwrap_or_default();
        (called, CallKind::Process)
    };

    CallActivity {
        id: attr_string(node, "id").unwrap_or_default(),
        name: attr_string(node, "name"),
        called_element,
        call_kind,
    }
}

fn read_sequence_flow(node: &Node<'_, '_>) -> SequenceFlow {
    let condition = child(node, "conditionExpression")
        .map(|c| text(&c))
        .filter(|c| !c.is_empty());

    SequenceFlow {
        id: attr_string(node, "id").unwrap_or_default(),
        name: attr_string(node, "name"),
        source_ref: attr_string(node, "sourceRef").unwrap_or_default(),
        target_ref: attr_string(node, "targetRef").unwrap_or_default(),
        condition,
    }
}

fn read_variables(extension_elements: &Node<'_, '_>) -> Vec<ProcessVariable> {
    extension_elements
        .descendants()
        .filter(|n| {
            n.is_element() && matches!(n.tag_name().name(), "variable" | "processVariable")
        })
        .filter_map(|n| {
            let name = attr_string(&n, "name")?;
            let var_type = attr_string(&n, "type").unwrap_or_else(|| "string".to_string());
            let required = attr(&n, "required")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
                .unwrap_or(false);
            Some(ProcessVariable {
                name,
                var_type,
                required,
            })
        })
        .collect()
}

// ============================================================================
// Node helpers
// ============================================================================

/// Attribute by local name, ignoring namespace.
pub(crate) fn attr<'a>(node: &Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attributes()
        .find(|a| a.name() == name)
        .map(|a| a.value())
}

/// Attribute by local name, trimmed, `None` when empty.
fn attr_string(node: &Node<'_, '_>, name: &str) -> Option<String> {
    attr(node, name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn child<'a, 'input>(node: &Node<'a, 'input>, local: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == local)
}

fn child_texts(node: &Node<'_, '_>, local: &str) -> Vec<String> {
    node.children()
        .filter(|c| c.is_element() && c.tag_name().name() == local)
        .map(|c| text(&c))
        .filter(|t| !t.is_empty())
        .collect()
}

fn text(node: &Node<'_, '_>) -> String {
    node.text().map(str::trim).unwrap_or_default().to_string()
}

/// First element with the given local name under the node's `extensionElements`.
fn extension<'a, 'input>(node: &Node<'a, 'input>, local: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .filter(|c| c.is_element() && c.tag_name().name() == "extensionElements")
        .flat_map(|e| e.descendants())
        .find(|d| d.is_element() && d.tag_name().name() == local)
}

/// Value of an extension `property` entry with the given name.
fn property(node: &Node<'_, '_>, key: &str) -> Option<String> {
    node.children()
        .filter(|c| c.is_element() && c.tag_name().name() == "extensionElements")
        .flat_map(|e| e.descendants())
        .filter(|d| d.is_element() && d.tag_name().name() == "property")
        .find(|p| attr(p, "name") == Some(key))
        .and_then(|p| attr_string(&p, "value"))
}

fn split_list(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.trim_start_matches('=')
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
