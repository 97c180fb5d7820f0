use std::collections::HashMap;

use crate::doc::{Doc, TokenAttr};
use crate::rules::TokenPredicate;

/// A raw modifier match: which rule fired and the token span it covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMatch {
    pub rule_id: usize,
    pub start: usize,
    pub end: usize,
}

/// Matches literal rule phrases by token equality on a single attribute
/// (`lower` by default, raw `text` for case-sensitive engines).
///
/// Phrases are tokenized with the same conventions as [`Doc::from_text`] so
/// a literal like "neg for pneumonia." lines up with document tokens. The
/// index is keyed by first phrase token; candidates are verified in full at
/// each position.
#[derive(Debug, Clone)]
pub struct PhraseMatcher {
    attr: TokenAttr,
    index: HashMap<String, Vec<(usize, Vec<String>)>>,
}

impl PhraseMatcher {
    pub fn new(attr: TokenAttr) -> PhraseMatcher {
        PhraseMatcher {
            attr,
            index: HashMap::new(),
        }
    }

    /// Register a literal phrase under `rule_id`. Empty phrases are ignored;
    /// rule validation rejects them before they get here.
    pub fn add(&mut self, rule_id: usize, literal: &str) {
        let phrase: Vec<String> = Doc::from_text(literal)
            .tokens()
            .iter()
            .map(|t| t.attr(self.attr).to_string())
            .collect();
        let Some(first) = phrase.first().cloned() else {
            return;
        };
        self.index.entry(first).or_default().push((rule_id, phrase));
    }

    /// All occurrences of every registered phrase, unordered.
    pub fn scan(&self, doc: &Doc) -> Vec<RawMatch> {
        let mut matches = Vec::new();
        for start in 0..doc.len() {
            let key = doc.token(start).attr(self.attr);
            let Some(candidates) = self.index.get(key) else {
                continue;
            };
            for (rule_id, phrase) in candidates {
                let end = start + phrase.len();
                if end > doc.len() {
                    continue;
                }
                if phrase
                    .iter()
                    .enumerate()
                    .all(|(k, w)| doc.token(start + k).attr(self.attr) == w)
                {
                    matches.push(RawMatch {
                        rule_id: *rule_id,
                        start,
                        end,
                    });
                }
            }
        }
        matches
    }
}

/// Matches token-pattern rules: a sequence of per-token attribute
/// predicates, one predicate per matched token.
#[derive(Debug, Clone, Default)]
pub struct PatternMatcher {
    patterns: Vec<(usize, Vec<TokenPredicate>)>,
}

impl PatternMatcher {
    pub fn new() -> PatternMatcher {
        PatternMatcher::default()
    }

    pub fn add(&mut self, rule_id: usize, pattern: Vec<TokenPredicate>) {
        if !pattern.is_empty() {
            self.patterns.push((rule_id, pattern));
        }
    }

    /// All occurrences of every registered pattern, unordered.
    pub fn scan(&self, doc: &Doc) -> Vec<RawMatch> {
        let mut matches = Vec::new();
        for (rule_id, pattern) in &self.patterns {
            if pattern.len() > doc.len() {
                continue;
            }
            for start in 0..=(doc.len() - pattern.len()) {
                if pattern
                    .iter()
                    .enumerate()
                    .all(|(k, pred)| pred.matches(doc.token(start + k)))
                {
                    matches.push(RawMatch {
                        rule_id: *rule_id,
                        start,
                        end: start + pattern.len(),
                    });
                }
            }
        }
        matches
    }
}
