// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Structural validation of BPMN documents.
//!
//! Validation runs independently of [`crate::parse`] and never fails: every problem
//! is reported as a coded error or warning. Only errors block code generation and
//! deployment; a document can be valid with warnings.

use std::collections::{BTreeSet, HashSet};

use roxmltree::{Document, Node};
use serde::Serialize;

use crate::model::{GatewayKind, WorkflowModel};
use crate::parser::{Definitions, FLOW_NODE_TAGS, attr, find_processes, read_process};

/// Wire names of the fields every generated start request carries.
pub const RESERVED_VARIABLE_NAMES: &[&str] = &["initiatorId", "tenantId"];

// ============================================================================
// Validation Result
// ============================================================================

/// Result of validation containing both errors and warnings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationResult {
    /// Problems that block generation and deployment.
    pub errors: Vec<ValidationError>,
    /// Problems that are reported but do not block anything.
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are allowed).
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Alias of [`ValidationResult::is_ok`].
    pub fn valid(&self) -> bool {
        self.is_ok()
    }

    /// Returns true if there are any errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns true if there are any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Merge another validation result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Rendered error messages.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Rendered warning messages.
    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(ToString::to_string).collect()
    }
}

impl std::fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.errors.is_empty() {
            return write!(f, "valid ({} warning(s))", self.warnings.len());
        }
        write!(f, "{}", self.error_messages().join("; "))
    }
}

// ============================================================================
// Validation Errors
// ============================================================================

/// Which end of a sequence flow a reference belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FlowEnd {
    Source,
    Target,
}

impl std::fmt::Display for FlowEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowEnd::Source => write!(f, "sourceRef"),
            FlowEnd::Target => write!(f, "targetRef"),
        }
    }
}

/// Errors that make a document unusable for generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "code", rename_all = "camelCase")]
#[allow(missing_docs)]
pub enum ValidationError {
    /// The document is not well-formed XML.
    MalformedXml { reason: String },
    /// The document contains no process element.
    NoProcess,
    /// The process has no start event.
    NoStartEvent { process_id: String },
    /// The process has no end event.
    NoEndEvent { process_id: String },
    /// A sequence flow points at a node that does not exist.
    DanglingFlowReference {
        flow_id: String,
        end: FlowEnd,
        node_id: String,
        available_nodes: Vec<String>,
    },
    /// Two flow nodes share an id.
    DuplicateNodeId { node_id: String },
    /// A process variable uses a name every start request already carries.
    ReservedVariableName { name: String },
    /// Two process variables share a name.
    DuplicateVariableName { name: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::MalformedXml { reason } => {
                write!(f, "[E001] Document is not well-formed XML: {}", reason)
            }
            ValidationError::NoProcess => {
                write!(f, "[E002] Document contains no process element")
            }
            ValidationError::NoStartEvent { process_id } => {
                write!(f, "[E003] Process '{}' has no start event", process_id)
            }
            ValidationError::NoEndEvent { process_id } => {
                write!(f, "[E004] Process '{}' has no end event", process_id)
            }
            ValidationError::DanglingFlowReference {
                flow_id,
                end,
                node_id,
                available_nodes,
            } => {
                write!(
                    f,
                    "[E010] Sequence flow '{}' {} references unknown node '{}'",
                    flow_id, end, node_id
                )?;
                if let Some(similar) = find_similar_name(node_id, available_nodes) {
                    write!(f, ". Did you mean '{}'?", similar)?;
                }
                Ok(())
            }
            ValidationError::DuplicateNodeId { node_id } => {
                write!(f, "[E011] Node id '{}' is declared more than once", node_id)
            }
            ValidationError::ReservedVariableName { name } => write!(
                f,
                "[E020] Process variable '{}' is reserved by the start request ({})",
                name,
                RESERVED_VARIABLE_NAMES.join(", ")
            ),
            ValidationError::DuplicateVariableName { name } => {
                write!(f, "[E021] Process variable '{}' is declared more than once", name)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// Validation Warnings
// ============================================================================

/// Problems that are reported but do not block generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "code", rename_all = "camelCase")]
#[allow(missing_docs)]
pub enum ValidationWarning {
    /// More than one process element; only the first is used.
    MultipleProcesses { count: usize, used: String },
    /// More than one start event.
    MultipleStartEvents { process_id: String, count: usize },
    /// A non-start node has no incoming flow.
    NoIncomingFlow { node_id: String, node_kind: String },
    /// A non-end node has no outgoing flow.
    NoOutgoingFlow { node_id: String, node_kind: String },
    /// A user or service task has no task-type tag.
    MissingTaskType { task_id: String },
    /// An exclusive gateway cannot pick a path deterministically.
    AmbiguousRouting {
        gateway_id: String,
        unconditioned_flows: Vec<String>,
    },
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationWarning::MultipleProcesses { count, used } => write!(
                f,
                "[W001] Document declares {} processes; only '{}' is used",
                count, used
            ),
            ValidationWarning::MultipleStartEvents { process_id, count } => write!(
                f,
                "[W010] Process '{}' has {} start events",
                process_id, count
            ),
            ValidationWarning::NoIncomingFlow { node_id, node_kind } => write!(
                f,
                "[W020] Node '{}' ({}) has no incoming sequence flow",
                node_id, node_kind
            ),
            ValidationWarning::NoOutgoingFlow { node_id, node_kind } => write!(
                f,
                "[W021] Node '{}' ({}) has no outgoing sequence flow",
                node_id, node_kind
            ),
            ValidationWarning::MissingTaskType { task_id } => write!(
                f,
                "[W030] Task '{}' has no task type; a type derived from the task id will be used",
                task_id
            ),
            ValidationWarning::AmbiguousRouting {
                gateway_id,
                unconditioned_flows,
            } => write!(
                f,
                "[W040] Exclusive gateway '{}' has no default flow and unconditioned outgoing flows: {}",
                gateway_id,
                unconditioned_flows.join(", ")
            ),
        }
    }
}

// ============================================================================
// Entry Points
// ============================================================================

/// Validate a BPMN document.
///
/// Never fails; malformed input is reported as [`ValidationError::MalformedXml`].
pub fn validate(xml: &str) -> ValidationResult {
    let mut result = ValidationResult::default();

    let doc = match Document::parse(xml) {
        Ok(doc) => doc,
        Err(e) => {
            result.errors.push(ValidationError::MalformedXml {
                reason: e.to_string(),
            });
            return result;
        }
    };

    let processes = find_processes(&doc);
    let Some(process) = processes.first().copied() else {
        result.errors.push(ValidationError::NoProcess);
        return result;
    };

    let definitions = Definitions::collect(&doc);
    let model = read_process(&definitions, process);

    if processes.len() > 1 {
        result.warnings.push(ValidationWarning::MultipleProcesses {
            count: processes.len(),
            used: model.process_id.clone(),
        });
    }

    let nodes = collect_flow_nodes(process);

    // Phase 1: events
    validate_events(&model, &mut result);

    // Phase 2: node identity and flow references
    validate_node_ids(&nodes, &mut result);
    validate_flow_references(&model, &nodes, &mut result);

    // Phase 3: connectivity
    validate_connectivity(&model, &nodes, &mut result);

    // Phase 4: task configuration and routing
    validate_task_types(&model, &mut result);
    validate_gateways(&model, &mut result);

    // Phase 5: request contract
    validate_variables(&model, &mut result);

    result
}

/// Validate an already parsed model.
///
/// Runs the same checks as [`validate`] except those that need the raw document
/// (malformed XML, process count, duplicate ids). Nodes the model does not
/// represent (plain tasks, sub-processes) are unknown here, so flows touching them
/// are reported as dangling.
pub fn validate_model(model: &WorkflowModel) -> ValidationResult {
    let mut result = ValidationResult::default();

    let mut nodes: Vec<FlowNode> = Vec::new();
    nodes.extend(model.start_events.iter().map(|n| FlowNode::new(&n.id, "startEvent")));
    nodes.extend(model.end_events.iter().map(|n| FlowNode::new(&n.id, "endEvent")));
    nodes.extend(model.user_tasks.iter().map(|n| FlowNode::new(&n.id, "userTask")));
    nodes.extend(model.service_tasks.iter().map(|n| FlowNode::new(&n.id, "serviceTask")));
    nodes.extend(model.gateways.iter().map(|n| FlowNode::new(&n.id, gateway_tag(n.kind))));
    nodes.extend(
        model
            .timer_events
            .iter()
            .map(|n| FlowNode::new(&n.id, "intermediateCatchEvent")),
    );
    nodes.extend(
        model
            .message_events
            .iter()
            .map(|n| FlowNode::new(&n.id, "intermediateCatchEvent")),
    );
    nodes.extend(model.call_activities.iter().map(|n| FlowNode::new(&n.id, "callActivity")));

    validate_events(model, &mut result);
    validate_flow_references(model, &nodes, &mut result);
    validate_connectivity(model, &nodes, &mut result);
    validate_task_types(model, &mut result);
    validate_gateways(model, &mut result);
    validate_variables(model, &mut result);

    result
}

/// A flow node as it appears in the document: id plus element local name.
#[derive(Debug, Clone)]
struct FlowNode {
    id: String,
    tag: String,
}

impl FlowNode {
    fn new(id: &str, tag: &str) -> Self {
        Self {
            id: id.to_string(),
            tag: tag.to_string(),
        }
    }
}

fn gateway_tag(kind: GatewayKind) -> &'static str {
    match kind {
        GatewayKind::Exclusive => "exclusiveGateway",
        GatewayKind::Parallel => "parallelGateway",
        GatewayKind::Inclusive => "inclusiveGateway",
        GatewayKind::EventBased => "eventBasedGateway",
    }
}

fn collect_flow_nodes(process: Node<'_, '_>) -> Vec<FlowNode> {
    process
        .children()
        .filter(|c| c.is_element() && FLOW_NODE_TAGS.contains(&c.tag_name().name()))
        .filter_map(|c| attr(&c, "id").map(|id| FlowNode::new(id, c.tag_name().name())))
        .collect()
}

// ============================================================================
// Phase 1: Events
// ============================================================================

fn validate_events(model: &WorkflowModel, result: &mut ValidationResult) {
    match model.start_events.len() {
        0 => result.errors.push(ValidationError::NoStartEvent {
            process_id: model.process_id.clone(),
        }),
        1 => {}
        count => result.warnings.push(ValidationWarning::MultipleStartEvents {
            process_id: model.process_id.clone(),
            count,
        }),
    }

    if model.end_events.is_empty() {
        result.errors.push(ValidationError::NoEndEvent {
            process_id: model.process_id.clone(),
        });
    }
}

// ============================================================================
// Phase 2: Identity and References
// ============================================================================

fn validate_node_ids(nodes: &[FlowNode], result: &mut ValidationResult) {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut reported: BTreeSet<&str> = BTreeSet::new();
    for node in nodes {
        if !seen.insert(&node.id) && reported.insert(&node.id) {
            result.errors.push(ValidationError::DuplicateNodeId {
                node_id: node.id.clone(),
            });
        }
    }
}

fn validate_flow_references(model: &WorkflowModel, nodes: &[FlowNode], result: &mut ValidationResult) {
    let known: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let available: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();

    for flow in &model.sequence_flows {
        for (end, node_id) in [
            (FlowEnd::Source, &flow.source_ref),
            (FlowEnd::Target, &flow.target_ref),
        ] {
            if !known.contains(node_id.as_str()) {
                result.errors.push(ValidationError::DanglingFlowReference {
                    flow_id: flow.id.clone(),
                    end,
                    node_id: node_id.clone(),
                    available_nodes: available.clone(),
                });
            }
        }
    }
}

// ============================================================================
// Phase 3: Connectivity
// ============================================================================

fn validate_connectivity(model: &WorkflowModel, nodes: &[FlowNode], result: &mut ValidationResult) {
    let targets: HashSet<&str> = model
        .sequence_flows
        .iter()
        .map(|f| f.target_ref.as_str())
        .collect();
    let sources: HashSet<&str> = model
        .sequence_flows
        .iter()
        .map(|f| f.source_ref.as_str())
        .collect();

    for node in nodes {
        // Boundary events are entered through their host activity
        let entered_without_flow = matches!(node.tag.as_str(), "startEvent" | "boundaryEvent");
        if !entered_without_flow && !targets.contains(node.id.as_str()) {
            result.warnings.push(ValidationWarning::NoIncomingFlow {
                node_id: node.id.clone(),
                node_kind: node.tag.clone(),
            });
        }

        if node.tag != "endEvent" && !sources.contains(node.id.as_str()) {
            result.warnings.push(ValidationWarning::NoOutgoingFlow {
                node_id: node.id.clone(),
                node_kind: node.tag.clone(),
            });
        }
    }
}

// ============================================================================
// Phase 4: Tasks and Gateways
// ============================================================================

fn validate_task_types(model: &WorkflowModel, result: &mut ValidationResult) {
    let untyped = model
        .user_tasks
        .iter()
        .filter(|t| t.task_type.is_none())
        .map(|t| &t.id)
        .chain(
            model
                .service_tasks
                .iter()
                .filter(|t| t.task_type.is_none())
                .map(|t| &t.id),
        );

    for task_id in untyped {
        result.warnings.push(ValidationWarning::MissingTaskType {
            task_id: task_id.clone(),
        });
    }
}

fn validate_gateways(model: &WorkflowModel, result: &mut ValidationResult) {
    for gateway in model
        .gateways
        .iter()
        .filter(|g| g.kind == GatewayKind::Exclusive)
    {
        let outgoing = model.outgoing_flows(&gateway.id);
        if outgoing.len() <= 1 || gateway.default_flow.is_some() {
            continue;
        }

        let unconditioned: Vec<String> = outgoing
            .iter()
            .filter(|f| f.condition.is_none())
            .map(|f| f.id.clone())
            .collect();

        if !unconditioned.is_empty() {
            result.warnings.push(ValidationWarning::AmbiguousRouting {
                gateway_id: gateway.id.clone(),
                unconditioned_flows: unconditioned,
            });
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Closest candidate by edit distance, if any is reasonably close.
// ============================================================================
// Phase 5: Request Contract
// ============================================================================

fn validate_variables(model: &WorkflowModel, result: &mut ValidationResult) {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut reported: BTreeSet<&str> = BTreeSet::new();
    for variable in &model.variables {
        let name = variable.name.as_str();
        if RESERVED_VARIABLE_NAMES.contains(&name) {
            if reported.insert(name) {
                result.errors.push(ValidationError::ReservedVariableName {
                    name: name.to_string(),
                });
            }
        } else if !seen.insert(name) && reported.insert(name) {
            result.errors.push(ValidationError::DuplicateVariableName {
                name: name.to_string(),
            });
        }
    }
}

fn find_similar_name(target: &str, candidates: &[String]) -> Option<String> {
    let target_lower = target.to_lowercase();

    candidates
        .iter()
        .filter_map(|candidate| {
            let distance = levenshtein_distance(&target_lower, &candidate.to_lowercase());
            if distance <= target.len() / 2 + 1 {
                Some((candidate.clone(), distance))
            } else {
                None
            }
        })
        .min_by_key(|(_, d)| *d)
        .map(|(name, _)| name)
}

fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
