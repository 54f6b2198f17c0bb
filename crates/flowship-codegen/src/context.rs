// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Names and per-task plans shared by all emitters.

use flowship_bpmn::{Assignment, ImplementationKind, WorkflowModel};
use proc_macro2::{Ident, Span};

use crate::WorkflowMetadata;
use crate::naming::{
    dedupe, kebab_case, package_safe, pascal_case, rust_ident, sanitize_ident, snake_case,
};
use crate::types::{RequestField, request_fields};

/// What a generated handler does.
#[derive(Debug, Clone)]
pub enum HandlerKind {
    /// Completed externally through the task inbox.
    User {
        assignment: Assignment,
        form_key: Option<String>,
    },
    /// Registered as a job worker.
    Service {
        implementation: ImplementationKind,
        retries: u32,
    },
}

/// One generated handler file.
#[derive(Debug, Clone)]
pub struct HandlerPlan {
    pub task_id: String,
    pub task_name: Option<String>,
    /// Declared task type, or one derived from the task id.
    pub task_type: String,
    /// Module name, e.g. `review_handler`.
    pub module: String,
    /// Type name, e.g. `ReviewHandler`.
    pub type_name: String,
    pub kind: HandlerKind,
}

impl HandlerPlan {
    pub fn path(&self) -> String {
        format!("src/handlers/{}.rs", self.module)
    }

    pub fn module_ident(&self) -> Ident {
        ident(&self.module)
    }

    pub fn type_ident(&self) -> Ident {
        ident(&self.type_name)
    }

    pub fn is_service(&self) -> bool {
        matches!(self.kind, HandlerKind::Service { .. })
    }
}

/// Context for code emission, computed once per generation.
pub struct EmitContext<'a> {
    pub metadata: &'a WorkflowMetadata,
    pub model: &'a WorkflowModel,
    pub package_name: String,
    /// PascalCase of the process id, prefix of generated type names.
    pub type_prefix: String,
    pub request_fields: Vec<RequestField>,
    pub handlers: Vec<HandlerPlan>,
}

impl<'a> EmitContext<'a> {
    pub fn new(metadata: &'a WorkflowMetadata, model: &'a WorkflowModel) -> Self {
        let type_prefix = sanitize_ident(&pascal_case(&model.process_id));
        Self {
            metadata,
            model,
            package_name: package_safe(&model.process_id),
            type_prefix,
            request_fields: request_fields(model),
            handlers: plan_handlers(model),
        }
    }

    pub fn request_ident(&self) -> Ident {
        ident(&format!("{}Request", self.type_prefix))
    }

    pub fn service_ident(&self) -> Ident {
        ident(&format!("{}Service", self.type_prefix))
    }

    pub fn controller_ident(&self) -> Ident {
        ident(&format!("{}Controller", self.type_prefix))
    }

    /// Path of the shipped process definition inside the bundle.
    pub fn resource_path(&self) -> String {
        format!("resources/{}.bpmn", self.resource_stem())
    }

    /// File stem of the shipped definition; the process id unless it contains path characters.
    pub fn resource_stem(&self) -> String {
        let stem: String = self
            .model
            .process_id
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
            .collect();
        if stem.trim_matches('.').is_empty() {
            self.package_name.clone()
        } else {
            stem
        }
    }

    pub fn service_tasks(&self) -> impl Iterator<Item = &HandlerPlan> {
        self.handlers.iter().filter(|h| h.is_service())
    }
}

/// Identifier from an already sanitized name.
pub fn ident(name: &str) -> Ident {
    Ident::new(name, Span::call_site())
}

/// One handler per user task then per service task, in document order.
fn plan_handlers(model: &WorkflowModel) -> Vec<HandlerPlan> {
    let mut modules: Vec<String> = Vec::new();
    let mut types: Vec<String> = Vec::new();
    let mut plan = |task_id: &str,
                    task_name: Option<&String>,
                    task_type: Option<&String>,
                    kind: HandlerKind| {
        let module = dedupe(rust_ident(&format!("{}_handler", snake_case(task_id))), &mut modules);
        let type_name = dedupe(
            sanitize_ident(&format!("{}Handler", pascal_case(task_id))),
            &mut types,
        );
        HandlerPlan {
            task_id: task_id.to_string(),
            task_name: task_name.cloned(),
            task_type: task_type
                .cloned()
                .unwrap_or_else(|| kebab_case(task_id)),
            module,
            type_name,
            kind,
        }
    };

    let mut handlers = Vec::new();
    for task in &model.user_tasks {
        handlers.push(plan(
            &task.id,
            task.name.as_ref(),
            task.task_type.as_ref(),
            HandlerKind::User {
                assignment: task.assignment.clone(),
                form_key: task.form_key.clone(),
            },
        ));
    }
    for task in &model.service_tasks {
        handlers.push(plan(
            &task.id,
            task.name.as_ref(),
            task.task_type.as_ref(),
            HandlerKind::Service {
                implementation: task.implementation,
                retries: task.retries,
            },
        ));
    }
    handlers
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowship_bpmn::{ServiceTask, UserTask};

    fn user_task(id: &str) -> UserTask {
        UserTask {
            id: id.to_string(),
            name: None,
            task_type: None,
            assignment: Assignment::default(),
            form_key: None,
            priority: None,
            due_date: None,
            incoming: vec![],
            outgoing: vec![],
        }
    }

    fn metadata() -> WorkflowMetadata {
        WorkflowMetadata {
            workflow_name: "w".to_string(),
            version: 1,
            bpmn_xml: String::new(),
            description: None,
        }
    }

    #[test]
    fn test_handler_names_are_unique() {
        let model = WorkflowModel {
            process_id: "p".to_string(),
            user_tasks: vec![user_task("review-doc"), user_task("review_doc")],
            service_tasks: vec![ServiceTask {
                id: "type".to_string(),
                name: None,
                task_type: Some("t".to_string()),
                implementation: ImplementationKind::Script,
                retries: 1,
                incoming: vec![],
                outgoing: vec![],
            }],
            ..Default::default()
        };
        let metadata = metadata();
        let ctx = EmitContext::new(&metadata, &model);

        let modules: Vec<_> = ctx.handlers.iter().map(|h| h.module.as_str()).collect();
        assert_eq!(
            modules,
            vec!["review_doc_handler", "review_doc_handler_2", "type_handler"]
        );
        let types: Vec<_> = ctx.handlers.iter().map(|h| h.type_name.as_str()).collect();
        assert_eq!(
            types,
            vec!["ReviewDocHandler", "ReviewDocHandler_2", "TypeHandler"]
        );
        assert_eq!(ctx.handlers[0].task_type, "review-doc");
        assert_eq!(ctx.service_tasks().count(), 1);
    }

    #[test]
    fn test_identifiers_for_odd_process_ids() {
        let model = WorkflowModel {
            process_id: "2fa/check".to_string(),
            ..Default::default()
        };
        let metadata = metadata();
        let ctx = EmitContext::new(&metadata, &model);
        assert_eq!(ctx.request_ident().to_string(), "_2faCheckRequest");
        assert_eq!(ctx.resource_path(), "resources/2fa_check.bpmn");
        assert_eq!(ctx.package_name, "wf2facheck");
    }
}
