// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Flowship BPMN
//!
//! Reads BPMN 2.0 process documents into a normalized [`WorkflowModel`] and checks
//! them for structural problems.
//!
//! # Parsing vs. validation
//!
//! [`parse`] is lenient: it extracts whatever it recognizes from the first process
//! and fails only when the document is not XML or has no process at all.
//! [`validate`] runs separately over the raw document and reports coded errors
//! (`[E0xx]`) and warnings (`[W0xx]`). Callers must gate generation on
//! [`ValidationResult::is_ok`], not on the absence of warnings.
//!
//! ```
//! let xml = r#"<definitions xmlns="http://www.omg.org/spec/BPMN/20100524/MODEL">
//!   <process id="review-flow">
//!     <startEvent id="Start"/>
//!     <endEvent id="End"/>
//!     <sequenceFlow id="f1" sourceRef="Start" targetRef="End"/>
//!   </process>
//! </definitions>"#;
//!
//! let report = flowship_bpmn::validate(xml);
//! assert!(report.is_ok());
//!
//! let model = flowship_bpmn::parse(xml).unwrap();
//! assert_eq!(model.process_id, "review-flow");
//! ```

pub mod error;
pub mod model;
pub mod parser;
pub mod validation;

pub use error::ParseError;
pub use model::*;
pub use parser::parse;
pub use validation::{
    FlowEnd, RESERVED_VARIABLE_NAMES, ValidationError, ValidationResult, ValidationWarning, validate,
    validate_model,
};
