mod default_rules;
mod loader;

pub use default_rules::default_rules;
pub use loader::{
    load_json, load_yaml, rule_from_value, rule_to_value, rules_from_json_value,
    rules_to_json_value, save_json,
};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::doc::Token;
use crate::error::{ContextError, Result};

/// The directional action of a modifier: where its scope extends relative
/// to the matched phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
    Bidirectional,
    Terminate,
}

impl Direction {
    /// Parse a direction name case-insensitively. Unknown names are
    /// rejected here, at rule construction time.
    pub fn parse(s: &str) -> Result<Direction> {
        match s.to_uppercase().as_str() {
            "FORWARD" => Ok(Direction::Forward),
            "BACKWARD" => Ok(Direction::Backward),
            "BIDIRECTIONAL" => Ok(Direction::Bidirectional),
            "TERMINATE" => Ok(Direction::Terminate),
            other => Err(ContextError::InvalidRule(format!(
                "direction '{}' not recognized; valid: FORWARD, BACKWARD, BIDIRECTIONAL, TERMINATE",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "FORWARD",
            Direction::Backward => "BACKWARD",
            Direction::Bidirectional => "BIDIRECTIONAL",
            Direction::Terminate => "TERMINATE",
        }
    }
}

/// One value constraint inside a token predicate: an exact string or a
/// membership list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrMatch {
    Exact(String),
    In {
        #[serde(rename = "IN")]
        options: Vec<String>,
    },
}

impl AttrMatch {
    fn matches(&self, value: &str) -> bool {
        match self {
            AttrMatch::Exact(s) => s == value,
            AttrMatch::In { options } => options.iter().any(|o| o == value),
        }
    }
}

/// A constraint on a single token. Every set attribute must hold; a
/// predicate with no attributes matches any token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenPredicate {
    #[serde(rename = "LOWER", default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<AttrMatch>,
    #[serde(rename = "LEMMA", default, skip_serializing_if = "Option::is_none")]
    pub lemma: Option<AttrMatch>,
    #[serde(
        rename = "TEXT",
        alias = "ORTH",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub text: Option<AttrMatch>,
}

impl TokenPredicate {
    pub fn matches(&self, token: &Token) -> bool {
        if let Some(m) = &self.lower {
            if !m.matches(&token.lower) {
                return false;
            }
        }
        if let Some(m) = &self.lemma {
            if !m.matches(&token.lemma) {
                return false;
            }
        }
        if let Some(m) = &self.text {
            if !m.matches(&token.text) {
                return false;
            }
        }
        true
    }
}

/// A declarative modifier definition: the phrase to match, its semantic
/// category, and the direction its scope extends.
///
/// The literal is stored lower-cased; category, type filters, and
/// termination categories are stored upper-cased. When `pattern` is set the
/// literal serves as a display name and matching runs on the pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextItem {
    pub(crate) literal: String,
    pub(crate) category: String,
    pub(crate) direction: Direction,
    pub(crate) pattern: Option<Vec<TokenPredicate>>,
    pub(crate) allowed_types: Option<BTreeSet<String>>,
    pub(crate) excluded_types: Option<BTreeSet<String>>,
    pub(crate) max_targets: Option<usize>,
    pub(crate) max_scope: Option<usize>,
    pub(crate) terminated_by: BTreeSet<String>,
    pub(crate) metadata: Option<serde_json::Value>,
}

impl ContextItem {
    pub fn new(literal: &str, category: &str, direction: Direction) -> ContextItem {
        ContextItem {
            literal: literal.to_lowercase(),
            category: category.to_uppercase(),
            direction,
            pattern: None,
            allowed_types: None,
            excluded_types: None,
            max_targets: None,
            max_scope: None,
            terminated_by: BTreeSet::new(),
            metadata: None,
        }
    }

    pub fn with_pattern(mut self, pattern: Vec<TokenPredicate>) -> ContextItem {
        self.pattern = Some(pattern);
        self
    }

    pub fn with_allowed_types<I, S>(mut self, types: I) -> ContextItem
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_types = Some(
            types
                .into_iter()
                .map(|t| t.as_ref().to_uppercase())
                .collect(),
        );
        self
    }

    pub fn with_excluded_types<I, S>(mut self, types: I) -> ContextItem
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.excluded_types = Some(
            types
                .into_iter()
                .map(|t| t.as_ref().to_uppercase())
                .collect(),
        );
        self
    }

    pub fn with_max_targets(mut self, max_targets: usize) -> ContextItem {
        self.max_targets = Some(max_targets);
        self
    }

    pub fn with_max_scope(mut self, max_scope: usize) -> ContextItem {
        self.max_scope = Some(max_scope);
        self
    }

    pub fn with_terminated_by<I, S>(mut self, categories: I) -> ContextItem
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.terminated_by = categories
            .into_iter()
            .map(|c| c.as_ref().to_uppercase())
            .collect();
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> ContextItem {
        self.metadata = Some(metadata);
        self
    }

    /// Check rule-level invariants. Called by the engine when the rule is
    /// added and by the file loaders.
    pub fn validate(&self) -> Result<()> {
        if self.literal.trim().is_empty() {
            return Err(ContextError::InvalidRule(
                "rule literal cannot be empty".to_string(),
            ));
        }
        if self.allowed_types.is_some() && self.excluded_types.is_some() {
            return Err(ContextError::InvalidRule(format!(
                "rule '{}' sets both allowed_types and excluded_types; only one may be used",
                self.literal
            )));
        }
        if self.max_targets == Some(0) {
            return Err(ContextError::InvalidRule(format!(
                "rule '{}': max_targets must be positive",
                self.literal
            )));
        }
        if self.max_scope == Some(0) {
            return Err(ContextError::InvalidRule(format!(
                "rule '{}': max_scope must be positive",
                self.literal
            )));
        }
        if let Some(pattern) = &self.pattern {
            if pattern.is_empty() {
                return Err(ContextError::InvalidRule(format!(
                    "rule '{}': pattern cannot be empty",
                    self.literal
                )));
            }
        }
        Ok(())
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn pattern(&self) -> Option<&[TokenPredicate]> {
        self.pattern.as_deref()
    }

    pub fn allowed_types(&self) -> Option<&BTreeSet<String>> {
        self.allowed_types.as_ref()
    }

    pub fn excluded_types(&self) -> Option<&BTreeSet<String>> {
        self.excluded_types.as_ref()
    }

    pub fn max_targets(&self) -> Option<usize> {
        self.max_targets
    }

    pub fn max_scope(&self) -> Option<usize> {
        self.max_scope
    }

    pub fn terminated_by(&self) -> &BTreeSet<String> {
        &self.terminated_by
    }

    pub fn metadata(&self) -> Option<&serde_json::Value> {
        self.metadata.as_ref()
    }

    /// True iff the label passes this rule's type filters. A target with no
    /// label passes unless an allow-list is set.
    pub fn allows_label(&self, label: Option<&str>) -> bool {
        let upper = label.map(str::to_uppercase);
        if let Some(allowed) = &self.allowed_types {
            return matches!(&upper, Some(l) if allowed.contains(l));
        }
        if let Some(excluded) = &self.excluded_types {
            return !matches!(&upper, Some(l) if excluded.contains(l));
        }
        true
    }
}
