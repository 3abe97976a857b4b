//! Sensitive-field masking for outbound telemetry payloads.
//!
//! Every `body`, `params`, `requestHeaders`, and `response` payload passes
//! through [`mask_value`] before it is embedded in a log record, so
//! credentials and card data never leave the process in clear text.

use serde_json::Value;
use std::collections::HashSet;

/// Replacement written over the value of any masked field.
pub const MASK_MARKER: &str = "********";

/// Field names masked by every rule set.
///
/// Covers the credentials, card data, and identity numbers that API payloads
/// most commonly leak. Matching is case-insensitive, so both snake_case and
/// camelCase spellings are listed in their folded form.
pub const DEFAULT_MASKED_FIELDS: &[&str] = &[
    "password",
    "pwd",
    "secret",
    "password_confirmation",
    "passwordconfirmation",
    "cc",
    "card_number",
    "cardnumber",
    "ccv",
    "ssn",
    "credit_score",
    "creditscore",
    "api_key",
];

/// Case-folded set of field names whose values are redacted before a record
/// leaves the process.
///
/// Names are lowercased once at construction; lookups match exact key names
/// case-insensitively. There is no substring or path-pattern matching: a key
/// named `oldPassword` is not masked unless literally added to the set.
#[derive(Debug, Clone)]
pub struct MaskRuleSet {
    fields: HashSet<String>,
}

impl Default for MaskRuleSet {
    fn default() -> Self {
        Self::new()
    }
}

impl MaskRuleSet {
    /// Create a rule set containing only [`DEFAULT_MASKED_FIELDS`].
    pub fn new() -> Self {
        Self {
            fields: DEFAULT_MASKED_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Create a rule set from the defaults plus caller-supplied field names.
    pub fn with_fields(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut rules = Self::new();
        rules.extend(fields);
        rules
    }

    /// Add field names to the set, folding each to lowercase.
    pub fn extend(&mut self, fields: impl IntoIterator<Item = impl Into<String>>) {
        for field in fields {
            self.fields.insert(field.into().to_lowercase());
        }
    }

    /// Whether a payload key should be redacted.
    pub fn matches(&self, key: &str) -> bool {
        self.fields.contains(&key.to_lowercase())
    }
}

/// Return a sanitized copy of `value`.
///
/// Scalars are returned unchanged. Arrays are rebuilt element-wise,
/// preserving order and length. Objects are shallow-copied: keys matching
/// `rules` have their value replaced with [`MASK_MARKER`] regardless of the
/// original type or depth, and non-matching nested values are recursed into.
///
/// The input is never mutated. `serde_json::Value` trees are acyclic by
/// construction, so recursion terminates on any input.
pub fn mask_value(value: &Value, rules: &MaskRuleSet) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(|item| mask_value(item, rules)).collect()),
        Value::Object(map) => {
            let mut masked = serde_json::Map::with_capacity(map.len());
            for (key, val) in map {
                if rules.matches(key) {
                    masked.insert(key.clone(), Value::String(MASK_MARKER.to_string()));
                } else if val.is_object() || val.is_array() {
                    masked.insert(key.clone(), mask_value(val, rules));
                } else {
                    masked.insert(key.clone(), val.clone());
                }
            }
            Value::Object(masked)
        }
        scalar => scalar.clone(),
    }
}
