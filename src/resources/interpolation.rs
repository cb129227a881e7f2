// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Discovery and substitution of `${kind.name.attribute}` placeholders.
//!
//! Placeholders whose path does not parse as a [`Reference`] (for example a
//! shell `${HOME}` inside a lifecycle script) are left untouched.

use serde_json::Value;

use super::Reference;

/// A placeholder found in a string: byte span plus the parsed reference.
struct Placeholder {
    start: usize,
    end: usize,
    reference: Reference,
}

fn scan(text: &str) -> Vec<Placeholder> {
    let mut found = Vec::new();
    let mut cursor = 0;
    while let Some(offset) = text[cursor..].find("${") {
        let start = cursor + offset;
        let Some(length) = text[start + 2..].find('}') else {
            break;
        };
        let close = start + 2 + length;
        if let Ok(reference) = Reference::parse_path(&text[start + 2..close]) {
            found.push(Placeholder {
                start,
                end: close + 1,
                reference,
            });
        }
        cursor = close + 1;
    }
    found
}

/// References embedded in a single string, in order of appearance.
pub fn references_in(text: &str) -> Vec<Reference> {
    scan(text).into_iter().map(|p| p.reference).collect()
}

/// Every reference embedded anywhere in a JSON document, deduplicated,
/// in order of first appearance.
pub fn collect_references(document: &Value) -> Vec<Reference> {
    let mut references = Vec::new();
    walk(document, &mut |text| {
        for reference in references_in(text) {
            if !references.contains(&reference) {
                references.push(reference);
            }
        }
    });
    references
}

fn walk(value: &Value, visit: &mut dyn FnMut(&str)) {
    match value {
        Value::String(text) => visit(text),
        Value::Array(items) => items.iter().for_each(|item| walk(item, visit)),
        Value::Object(map) => map.values().for_each(|item| walk(item, visit)),
        _ => {}
    }
}

/// Substitute every placeholder in `text`. Returns the first reference the
/// lookup cannot satisfy.
pub fn resolve_text<F>(text: &str, lookup: &F) -> Result<String, Reference>
where
    F: Fn(&Reference) -> Option<String>,
{
    let placeholders = scan(text);
    if placeholders.is_empty() {
        return Ok(text.to_string());
    }

    let mut resolved = String::with_capacity(text.len());
    let mut cursor = 0;
    for placeholder in placeholders {
        let value = lookup(&placeholder.reference).ok_or(placeholder.reference)?;
        resolved.push_str(&text[cursor..placeholder.start]);
        resolved.push_str(&value);
        cursor = placeholder.end;
    }
    resolved.push_str(&text[cursor..]);
    Ok(resolved)
}

/// Produce a copy of `document` with every placeholder substituted.
pub fn resolve_document<F>(document: &Value, lookup: &F) -> Result<Value, Reference>
where
    F: Fn(&Reference) -> Option<String>,
{
    Ok(match document {
        Value::String(text) => Value::String(resolve_text(text, lookup)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| resolve_document(item, lookup))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => {
            let mut resolved = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                resolved.insert(key.clone(), resolve_document(item, lookup)?);
            }
            Value::Object(resolved)
        }
        other => other.clone(),
    })
}
