use std::sync::Arc;

use crate::doc::{Doc, Span, Target};
use crate::error::{ContextError, Result};
use crate::rules::{ContextItem, Direction};

/// A modifier located in a document: the rule that matched, the matched
/// token span, and a mutable scope window over which the modifier can bind
/// targets.
///
/// The match span and containing sentence are fixed at construction; the
/// scope only ever shrinks afterwards, through [`TagObject::limit_scope`].
#[derive(Debug, Clone)]
pub struct TagObject {
    rule: Arc<ContextItem>,
    start: usize,
    end: usize,
    sentence: (usize, usize),
    scope_start: usize,
    scope_end: usize,
    bound_targets: Vec<usize>,
}

impl TagObject {
    /// Locate the containing sentence and derive the initial scope from the
    /// rule's direction. With `context_window` set the sentence is replaced
    /// by a symmetric token window of half-width `max_scope` around the
    /// match, and sentence boundaries are not consulted at all.
    pub fn new(
        rule: Arc<ContextItem>,
        start: usize,
        end: usize,
        doc: &Doc,
        context_window: bool,
    ) -> Result<TagObject> {
        // `bounds` is what the direction logic scopes within: the containing
        // sentence, or a symmetric token window when sentence boundaries are
        // ignored. In window mode the whole document stands in as the
        // sentence so pairwise truncation still applies.
        let (sentence, bounds) = if context_window {
            // Engine validation guarantees every rule carries a max_scope
            // when context windows are enabled.
            let k = rule.max_scope().unwrap_or(doc.len());
            let window = (start.saturating_sub(k), (end + k).min(doc.len()));
            ((0, doc.len()), window)
        } else {
            let sent = doc
                .sentence_containing(start)
                .ok_or(ContextError::MissingSentenceBoundary)?;
            (sent, sent)
        };

        let (mut scope_start, mut scope_end) = match rule.direction() {
            Direction::Forward => (end, bounds.1),
            Direction::Backward => (bounds.0, start),
            Direction::Bidirectional => bounds,
            Direction::Terminate => (start, end),
        };

        // Clip to max_scope, measured from the boundary nearest the match.
        // The context window already has the cap baked in.
        if !context_window {
            if let Some(k) = rule.max_scope() {
                match rule.direction() {
                    Direction::Forward => scope_end = scope_end.min(end + k),
                    Direction::Backward => scope_start = scope_start.max(start.saturating_sub(k)),
                    Direction::Bidirectional => {
                        scope_start = scope_start.max(start.saturating_sub(k));
                        scope_end = scope_end.min(end + k);
                    }
                    Direction::Terminate => {}
                }
            }
        }

        Ok(TagObject {
            rule,
            start,
            end,
            sentence,
            scope_start,
            scope_end,
            bound_targets: Vec::new(),
        })
    }

    pub fn rule(&self) -> &Arc<ContextItem> {
        &self.rule
    }

    pub fn category(&self) -> &str {
        self.rule.category()
    }

    pub fn direction(&self) -> Direction {
        self.rule.direction()
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// The matched token span.
    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }

    /// Current scope window as `(start, end)`.
    pub fn scope(&self) -> (usize, usize) {
        (self.scope_start, self.scope_end)
    }

    /// Target indices this modifier ended up bound to. Filled during edge
    /// assignment.
    pub fn bound_targets(&self) -> &[usize] {
        &self.bound_targets
    }

    pub(crate) fn set_bound_targets(&mut self, targets: Vec<usize>) {
        self.bound_targets = targets;
    }

    fn in_scope(&self, i: usize) -> bool {
        self.scope_start <= i && i < self.scope_end
    }

    /// True iff the two match spans share at least one token.
    pub fn overlaps(&self, other: &TagObject) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True iff this modifier applies to the target: not a terminator, not
    /// the modifier's own span, the target's label passes the rule's type
    /// filters, and either endpoint token of the target lies in scope.
    pub fn modifies(&self, target: &Target) -> bool {
        if self.direction() == Direction::Terminate {
            return false;
        }
        let span = &target.span;
        if span.width() == 0 {
            return false;
        }
        if span.overlaps(&self.span()) {
            return false;
        }
        if !self.rule.allows_label(target.label()) {
            return false;
        }
        self.in_scope(span.start) || self.in_scope(span.end - 1)
    }

    /// Shrink this modifier's scope so it does not extend past `other`.
    /// Returns true iff the scope changed.
    ///
    /// `other` truncates `self` only when both sit in the same sentence and
    /// `other` is a terminator, shares the category, or carries a category
    /// listed in `self`'s terminated_by set.
    pub fn limit_scope(&mut self, other: &TagObject) -> bool {
        if self.sentence != other.sentence {
            return false;
        }
        if self.direction() == Direction::Terminate {
            return false;
        }
        let terminates = other.direction() == Direction::Terminate
            || other.category() == self.category()
            || self.rule.terminated_by().contains(other.category());
        if !terminates {
            return false;
        }

        let orig = (self.scope_start, self.scope_end);
        if matches!(
            self.direction(),
            Direction::Forward | Direction::Bidirectional
        ) && other.start > self.start
        {
            self.scope_end = self.scope_end.min(other.start).max(self.scope_start);
        }
        if matches!(
            self.direction(),
            Direction::Backward | Direction::Bidirectional
        ) && other.start < self.start
        {
            self.scope_start = self.scope_start.max(other.end).min(self.scope_end);
        }
        (self.scope_start, self.scope_end) != orig
    }

    /// Token distance from the match span to `span`: zero on overlap, else
    /// the gap between nearest endpoints.
    pub fn distance_to(&self, span: &Span) -> usize {
        if span.overlaps(&self.span()) {
            0
        } else if span.end <= self.start {
            self.start - span.end
        } else {
            span.start - self.end
        }
    }
}

// Ordering is by match span alone; two modifiers from different rules over
// the same tokens compare equal.
impl PartialEq for TagObject {
    fn eq(&self, other: &TagObject) -> bool {
        (self.start, self.end) == (other.start, other.end)
    }
}

impl Eq for TagObject {}

impl PartialOrd for TagObject {
    fn partial_cmp(&self, other: &TagObject) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TagObject {
    fn cmp(&self, other: &TagObject) -> std::cmp::Ordering {
        (self.start, self.end).cmp(&(other.start, other.end))
    }
}
