// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Request and response contracts.

use proc_macro2::TokenStream;
use quote::quote;

use super::render;
use crate::context::{EmitContext, ident};
use crate::types::RequestField;

/// `src/contracts/mod.rs`
pub fn emit_mod(ctx: &EmitContext<'_>) -> String {
    let request = ctx.request_ident();
    let tokens = quote! {
        pub mod request;
        pub mod response;

        pub use request::#request;
        pub use response::ProcessInstanceResponse;
    };
    render(ctx, tokens)
}

/// `src/contracts/request.rs`
pub fn emit_request(ctx: &EmitContext<'_>) -> String {
    let request = ctx.request_ident();
    let doc = format!(
        "Request to start a '{}' process instance.",
        ctx.model.process_name
    );
    let fields: Vec<TokenStream> = ctx.request_fields.iter().map(emit_field).collect();

    let tokens = quote! {
        use serde::{Deserialize, Serialize};

        #[doc = #doc]
        #[derive(Debug, Clone, Serialize, Deserialize)]
        pub struct #request {
            #(#fields)*
        }

        impl #request {
            /// Process variables submitted with the start command.
            pub fn into_variables(self) -> serde_json::Value {
                serde_json::to_value(self).unwrap_or_default()
            }
        }
    };
    render(ctx, tokens)
}

fn emit_field(field: &RequestField) -> TokenStream {
    let name = &field.name;
    let field_ident = ident(&field.ident);
    let ty = field.rust_type.to_tokens();

    let mut doc = match (field.fixed, field.ident.as_str()) {
        (true, "initiator_id") => "Identity of the user starting the process.".to_string(),
        (true, _) => "Tenant the process instance belongs to.".to_string(),
        (false, _) => format!("Process variable `{}`.", name),
    };
    if field.required {
        doc.push_str(" Required.");
    }

    if field.required {
        quote! {
            #[doc = #doc]
            #[serde(rename = #name)]
            pub #field_ident: #ty,
        }
    } else {
        quote! {
            #[doc = #doc]
            #[serde(rename = #name, default, skip_serializing_if = "Option::is_none")]
            pub #field_ident: Option<#ty>,
        }
    }
}

/// `src/contracts/response.rs`
pub fn emit_response(ctx: &EmitContext<'_>) -> String {
    let tokens = quote! {
        use serde::{Deserialize, Serialize};

        /// Identifier of a started process instance.
        #[derive(Debug, Clone, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct ProcessInstanceResponse {
            pub process_instance_key: String,
            pub process_id: String,
        }

        impl ProcessInstanceResponse {
            pub fn new(process_instance_key: String) -> Self {
                Self {
                    process_instance_key,
                    process_id: crate::service::PROCESS_ID.to_string(),
                }
            }
        }
    };
    render(ctx, tokens)
}
