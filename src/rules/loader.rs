use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::{json, Value};

use super::{ContextItem, Direction, TokenPredicate};
use crate::error::{ContextError, Result};

/// Keys a rule object may carry. Anything else fails validation with the
/// full offending key set in the message.
const ALLOWED_KEYS: &[&str] = &[
    "literal",
    "category",
    "rule",
    "pattern",
    "allowed_types",
    "excluded_types",
    "max_targets",
    "max_scope",
    "terminated_by",
    "metadata",
];

/// The on-disk shape of one rule object, before normalization.
#[derive(Debug, Deserialize)]
struct RawRule {
    literal: String,
    category: String,
    #[serde(default)]
    rule: Option<String>,
    #[serde(default)]
    pattern: Option<Vec<TokenPredicate>>,
    #[serde(default)]
    allowed_types: Option<Vec<String>>,
    #[serde(default)]
    excluded_types: Option<Vec<String>>,
    #[serde(default)]
    max_targets: Option<usize>,
    #[serde(default)]
    max_scope: Option<usize>,
    #[serde(default)]
    terminated_by: Option<Vec<String>>,
    #[serde(default)]
    metadata: Option<Value>,
}

/// Load modifier rules from a JSON file shaped `{"item_data": [...]}`.
pub fn load_json(path: &Path) -> Result<Vec<ContextItem>> {
    let content = fs::read_to_string(path).map_err(|source| ContextError::FileRead {
        path: path.into(),
        source,
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|source| ContextError::RuleJson {
        path: path.into(),
        source,
    })?;
    rules_from_json_value(&value)
}

/// Load modifier rules from a YAML file with the same schema as JSON.
pub fn load_yaml(path: &Path) -> Result<Vec<ContextItem>> {
    let content = fs::read_to_string(path).map_err(|source| ContextError::FileRead {
        path: path.into(),
        source,
    })?;
    let value: Value =
        serde_yaml_ng::from_str(&content).map_err(|source| ContextError::RuleYaml {
            path: path.into(),
            source,
        })?;
    rules_from_json_value(&value)
}

/// Write rules to a JSON file in the `{"item_data": [...]}` shape.
pub fn save_json(items: &[ContextItem], path: &Path) -> Result<()> {
    let value = rules_to_json_value(items);
    let content = serde_json::to_string_pretty(&value).map_err(|source| ContextError::RuleJson {
        path: path.into(),
        source,
    })?;
    fs::write(path, content).map_err(|source| ContextError::FileWrite {
        path: path.into(),
        source,
    })
}

/// Convert a parsed rule-file value into validated rules.
pub fn rules_from_json_value(value: &Value) -> Result<Vec<ContextItem>> {
    let items = value
        .get("item_data")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            ContextError::InvalidRule(
                "rule file must contain a top-level 'item_data' array".to_string(),
            )
        })?;
    items.iter().map(rule_from_value).collect()
}

/// Serialize rules back into the rule-file shape.
pub fn rules_to_json_value(items: &[ContextItem]) -> Value {
    json!({ "item_data": items.iter().map(rule_to_value).collect::<Vec<_>>() })
}

/// Build one rule from its dictionary form, rejecting unknown keys.
pub fn rule_from_value(value: &Value) -> Result<ContextItem> {
    let obj = value.as_object().ok_or_else(|| {
        ContextError::InvalidRule("each item_data entry must be an object".to_string())
    })?;

    let mut unknown: Vec<&str> = obj
        .keys()
        .map(String::as_str)
        .filter(|k| !ALLOWED_KEYS.contains(k))
        .collect();
    if !unknown.is_empty() {
        unknown.sort_unstable();
        return Err(ContextError::InvalidRule(format!(
            "rule object contains invalid keys: {{{}}}; must be one of: {{{}}}",
            unknown.join(", "),
            ALLOWED_KEYS.join(", ")
        )));
    }

    let raw: RawRule = serde_json::from_value(value.clone())
        .map_err(|e| ContextError::InvalidRule(e.to_string()))?;

    let direction = Direction::parse(raw.rule.as_deref().unwrap_or("BIDIRECTIONAL"))?;
    let mut item = ContextItem::new(&raw.literal, &raw.category, direction);
    if let Some(pattern) = raw.pattern {
        item = item.with_pattern(pattern);
    }
    if let Some(types) = raw.allowed_types {
        item = item.with_allowed_types(types);
    }
    if let Some(types) = raw.excluded_types {
        item = item.with_excluded_types(types);
    }
    if let Some(n) = raw.max_targets {
        item = item.with_max_targets(n);
    }
    if let Some(n) = raw.max_scope {
        item = item.with_max_scope(n);
    }
    if let Some(categories) = raw.terminated_by {
        item = item.with_terminated_by(categories);
    }
    if let Some(metadata) = raw.metadata {
        item = item.with_metadata(metadata);
    }
    item.validate()?;
    Ok(item)
}

/// Dictionary form of one rule. Every allowed key is present; unset
/// optionals serialize as null so the shape is stable.
pub fn rule_to_value(item: &ContextItem) -> Value {
    json!({
        "literal": item.literal,
        "category": item.category,
        "rule": item.direction.as_str(),
        "pattern": item.pattern,
        "allowed_types": item.allowed_types,
        "excluded_types": item.excluded_types,
        "max_targets": item.max_targets,
        "max_scope": item.max_scope,
        "terminated_by": item.terminated_by,
        "metadata": item.metadata,
    })
}
