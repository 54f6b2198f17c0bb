// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for BPMN parsing.

use thiserror::Error;

/// Errors returned by [`crate::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The document is not well-formed XML.
    #[error("Malformed BPMN XML: {0}")]
    MalformedXml(String),

    /// The document contains no `process` element.
    #[error("BPMN document contains no process element")]
    MissingProcess,
}

/// Result type for parsing.
pub type Result<T> = std::result::Result<T, ParseError>;
