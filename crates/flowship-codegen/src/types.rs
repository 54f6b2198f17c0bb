// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mapping of declared process-variable types to generated Rust types.

use flowship_bpmn::WorkflowModel;
use proc_macro2::TokenStream;
use quote::quote;
use serde::Serialize;
use tracing::warn;

use crate::naming::{dedupe, rust_ident, snake_case};

/// Target type of a request-contract field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RustType {
    String,
    I32,
    I64,
    F64,
    Bool,
    Date,
    DateTime,
    /// Fallback for unknown declared types.
    Json,
}

impl RustType {
    /// Map a declared type name (case-insensitive). Unknown names map to [`RustType::Json`].
    pub fn from_declared(type_name: &str) -> Self {
        match type_name.trim().to_ascii_lowercase().as_str() {
            "string" | "text" => RustType::String,
            "integer" | "int" => RustType::I32,
            "long" => RustType::I64,
            "double" | "number" | "float" | "decimal" => RustType::F64,
            "boolean" | "bool" => RustType::Bool,
            "date" => RustType::Date,
            "datetime" | "timestamp" => RustType::DateTime,
            _ => RustType::Json,
        }
    }

    /// Type path as written in generated code.
    pub fn as_str(&self) -> &'static str {
        match self {
            RustType::String => "String",
            RustType::I32 => "i32",
            RustType::I64 => "i64",
            RustType::F64 => "f64",
            RustType::Bool => "bool",
            RustType::Date => "chrono::NaiveDate",
            RustType::DateTime => "chrono::DateTime<chrono::Utc>",
            RustType::Json => "serde_json::Value",
        }
    }

    pub fn to_tokens(self) -> TokenStream {
        match self {
            RustType::String => quote! { String },
            RustType::I32 => quote! { i32 },
            RustType::I64 => quote! { i64 },
            RustType::F64 => quote! { f64 },
            RustType::Bool => quote! { bool },
            RustType::Date => quote! { chrono::NaiveDate },
            RustType::DateTime => quote! { chrono::DateTime<chrono::Utc> },
            RustType::Json => quote! { serde_json::Value },
        }
    }
}

/// One field of the generated request contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestField {
    /// Wire name (the process variable name).
    pub name: String,
    /// Rust field identifier.
    pub ident: String,
    pub rust_type: RustType,
    pub required: bool,
    /// Fixed fields are present on every request regardless of declared variables.
    pub fixed: bool,
}

/// Fields of the request contract: the two fixed fields followed by one field per
/// declared process variable, in declaration order.
///
/// Variables whose name is already a field on the wire (a fixed field or an earlier
/// variable) are left out. Distinct names that collide after identifier conversion
/// get a numeric suffix.
pub fn request_fields(model: &WorkflowModel) -> Vec<RequestField> {
    let mut fields = vec![
        RequestField {
            name: "initiatorId".to_string(),
            ident: "initiator_id".to_string(),
            rust_type: RustType::String,
            required: true,
            fixed: true,
        },
        RequestField {
            name: "tenantId".to_string(),
            ident: "tenant_id".to_string(),
            rust_type: RustType::String,
            required: true,
            fixed: true,
        },
    ];

    let mut taken: Vec<String> = fields.iter().map(|f| f.ident.clone()).collect();
    for variable in &model.variables {
        if fields.iter().any(|f| f.name == variable.name) {
            warn!(variable = %variable.name, "Skipping process variable that shadows a request field");
            continue;
        }
        let ident = dedupe(rust_ident(&snake_case(&variable.name)), &mut taken);
        fields.push(RequestField {
            name: variable.name.clone(),
            ident,
            rust_type: RustType::from_declared(&variable.var_type),
            required: variable.required,
            fixed: false,
        });
    }
    fields
}
