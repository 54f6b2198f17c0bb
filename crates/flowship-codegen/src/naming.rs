// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Naming helpers for BPMN ids.
//!
//! All helpers are total: any input, including empty strings and ids made only of
//! separators, produces a usable name.

const FALLBACK: &str = "unnamed";

/// Reserved words that cannot be used as plain identifiers (edition 2024).
const RUST_KEYWORDS: &[&str] = &[
    "_", "abstract", "as", "async", "await", "become", "box", "break", "const", "continue",
    "crate", "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if",
    "impl", "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv",
    "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true", "try",
    "type", "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Split an id into words on separators and lower-to-upper case boundaries.
///
/// `"trade_clearance-v2"` -> `["trade", "clearance", "v2"]`,
/// `"CheckHTTPStatus"` -> `["Check", "HTTP", "Status"]`.
pub fn words(id: &str) -> Vec<String> {
    let mut words = Vec::new();
    for segment in id.split(|c: char| !c.is_ascii_alphanumeric()) {
        let chars: Vec<char> = segment.chars().collect();
        let mut current = String::new();
        for (i, &c) in chars.iter().enumerate() {
            if !current.is_empty() && c.is_ascii_uppercase() {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
                if prev.is_ascii_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_ascii_uppercase() && next_is_lower)
                {
                    words.push(std::mem::take(&mut current));
                }
            }
            current.push(c);
        }
        if !current.is_empty() {
            words.push(current);
        }
    }
    words
}

/// `review-declaration` -> `ReviewDeclaration`.
pub fn pascal_case(id: &str) -> String {
    let words = words(id);
    if words.is_empty() {
        return "Unnamed".to_string();
    }
    words
        .iter()
        .map(|w| {
            let lower = w.to_ascii_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// `ReviewDeclaration_v2` -> `review-declaration-v2`.
pub fn kebab_case(id: &str) -> String {
    join_lower(id, "-")
}

/// `ReviewDeclaration-v2` -> `review_declaration_v2`.
pub fn snake_case(id: &str) -> String {
    join_lower(id, "_")
}

fn join_lower(id: &str, separator: &str) -> String {
    let words = words(id);
    if words.is_empty() {
        return FALLBACK.to_string();
    }
    words
        .iter()
        .map(|w| w.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Package name: non-alphanumerics stripped, lowercased.
///
/// A leading digit gets a `wf` prefix since package names cannot start with one.
pub fn package_safe(id: &str) -> String {
    let name: String = id
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    match name.chars().next() {
        None => FALLBACK.to_string(),
        Some(c) if c.is_ascii_digit() => format!("wf{}", name),
        Some(_) => name,
    }
}

/// Replace characters not allowed in identifiers with underscores.
pub fn sanitize_ident(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for (i, c) in s.chars().enumerate() {
        if c.is_ascii_alphanumeric() || c == '_' {
            // First character cannot be a digit
            if i == 0 && c.is_ascii_digit() {
                result.push('_');
            }
            result.push(c);
        } else {
            result.push('_');
        }
    }
    if result.is_empty() {
        result.push_str("_empty");
    }
    result
}

/// Sanitized identifier that is never a reserved word (`type` -> `type_`).
pub fn rust_ident(s: &str) -> String {
    let ident = sanitize_ident(s);
    if RUST_KEYWORDS.contains(&ident.as_str()) {
        format!("{}_", ident)
    } else {
        ident
    }
}

/// Make `candidate` unique among `taken` by appending `_2`, `_3`, ...
pub fn dedupe(candidate: String, taken: &mut Vec<String>) -> String {
    let mut name = candidate.clone();
    let mut n = 2;
    while taken.contains(&name) {
        name = format!("{}_{}", candidate, n);
        n += 1;
    }
    taken.push(name.clone());
    name
}
