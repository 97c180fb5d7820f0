use crate::doc::Target;
use crate::tag::TagObject;

/// The bipartite structure linking targets to the modifiers that apply to
/// them. Built fresh for every document; the engine runs the pipeline in
/// order: prune, update scopes, assign edges.
#[derive(Debug, Clone, Default)]
pub struct ContextGraph {
    targets: Vec<Target>,
    modifiers: Vec<TagObject>,
    /// `(target_index, modifier_index)` pairs, sorted.
    edges: Vec<(usize, usize)>,
}

impl ContextGraph {
    /// Modifiers are kept sorted by match span; ties broken by end.
    pub fn new(targets: Vec<Target>, mut modifiers: Vec<TagObject>) -> ContextGraph {
        modifiers.sort_by_key(|m| (m.start(), m.end()));
        ContextGraph {
            targets,
            modifiers,
            edges: Vec::new(),
        }
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub(crate) fn targets_mut(&mut self) -> &mut [Target] {
        &mut self.targets
    }

    pub fn modifiers(&self) -> &[TagObject] {
        &self.modifiers
    }

    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    /// Modifier indices bound to the target at `target_index`.
    pub fn modifiers_of(&self, target_index: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges
            .iter()
            .filter(move |&&(t, _)| t == target_index)
            .map(|&(_, m)| m)
    }

    /// Drop modifier matches dominated by a longer overlapping match, e.g.
    /// "no history of" eats "history of". Sweeps the sorted list and repeats
    /// until a full pass removes nothing, so cascading prunings settle.
    pub fn prune_modifiers(&mut self) {
        loop {
            let before = self.modifiers.len();
            let swept = Self::sweep(std::mem::take(&mut self.modifiers));
            self.modifiers = swept;
            if self.modifiers.len() == before {
                break;
            }
        }
    }

    fn sweep(modifiers: Vec<TagObject>) -> Vec<TagObject> {
        let mut kept = Vec::with_capacity(modifiers.len());
        let mut iter = modifiers.into_iter();
        let Some(mut current) = iter.next() else {
            return kept;
        };
        for next in iter {
            if current.overlaps(&next) {
                // Keep the wider span; on equal widths the earlier wins.
                if next.span().width() > current.span().width() {
                    current = next;
                }
            } else {
                kept.push(current);
                current = next;
            }
        }
        kept.push(current);
        kept
    }

    /// Drop any modifier whose match span overlaps a target span.
    pub fn remove_overlapping_modifiers(&mut self) {
        let targets = &self.targets;
        self.modifiers
            .retain(|m| !targets.iter().any(|t| t.span.overlaps(&m.span())));
    }

    /// Pairwise scope adjustment. Both directions of every pair are applied
    /// in one pass; the result is order-independent because scopes only
    /// shrink and each adjustment reads only the other's fixed match span.
    pub fn update_scopes(&mut self) {
        let n = self.modifiers.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let (head, tail) = self.modifiers.split_at_mut(j);
                let a = &mut head[i];
                let b = &mut tail[0];
                a.limit_scope(b);
                b.limit_scope(a);
            }
        }
    }

    /// Link every target to every modifier whose scope holds it, then trim
    /// each capped modifier down to its closest targets.
    pub fn apply_modifiers(&mut self) {
        let mut edges = Vec::new();
        for (m_idx, modifier) in self.modifiers.iter_mut().enumerate() {
            let mut bound: Vec<usize> = self
                .targets
                .iter()
                .enumerate()
                .filter(|(_, t)| modifier.modifies(t))
                .map(|(i, _)| i)
                .collect();

            if let Some(k) = modifier.rule().max_targets() {
                if bound.len() > k {
                    // Closest first; equal distances fall back to document
                    // order via the index.
                    bound.sort_by_key(|&t| (modifier.distance_to(&self.targets[t].span), t));
                    bound.truncate(k);
                    bound.sort_unstable();
                }
            }

            edges.extend(bound.iter().map(|&t| (t, m_idx)));
            modifier.set_bound_targets(bound);
        }
        edges.sort_unstable();
        self.edges = edges;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::doc::{Doc, Span};
    use crate::rules::{ContextItem, Direction};

    fn tag(
        literal: &str,
        category: &str,
        direction: Direction,
        start: usize,
        end: usize,
        doc: &Doc,
    ) -> TagObject {
        TagObject::new(
            Arc::new(ContextItem::new(literal, category, direction)),
            start,
            end,
            doc,
            false,
        )
        .unwrap()
    }

    fn capped_tag(
        literal: &str,
        direction: Direction,
        max_targets: usize,
        start: usize,
        end: usize,
        doc: &Doc,
    ) -> TagObject {
        TagObject::new(
            Arc::new(
                ContextItem::new(literal, "POSSIBLE_EXISTENCE", direction)
                    .with_max_targets(max_targets),
            ),
            start,
            end,
            doc,
            false,
        )
        .unwrap()
    }

    #[test]
    fn prune_keeps_longest_of_overlapping_pair() {
        let doc = Doc::from_text("No history of afib.");
        let long = tag("no history of", "HISTORICAL", Direction::Forward, 0, 3, &doc);
        let short = tag("history of", "HISTORICAL", Direction::Forward, 1, 3, &doc);
        let mut graph = ContextGraph::new(vec![], vec![short, long]);
        graph.prune_modifiers();
        assert_eq!(graph.modifiers().len(), 1);
        assert_eq!(graph.modifiers()[0].span(), Span::new(0, 3));
    }

    #[test]
    fn prune_cascades_through_triple() {
        // [0,2) overlaps [1,4) which overlaps [3,5): the middle span wins
        // both contests.
        let doc = Doc::from_text("a b c d e f.");
        let first = tag("a b", "C", Direction::Forward, 0, 2, &doc);
        let middle = tag("b c d", "C", Direction::Forward, 1, 4, &doc);
        let last = tag("d e", "C", Direction::Forward, 3, 5, &doc);
        let mut graph = ContextGraph::new(vec![], vec![first, middle, last]);
        graph.prune_modifiers();
        let spans: Vec<Span> = graph.modifiers().iter().map(|m| m.span()).collect();
        assert_eq!(spans, vec![Span::new(1, 4)]);
    }

    #[test]
    fn prune_equal_widths_keeps_earliest() {
        let doc = Doc::from_text("a b c d.");
        let first = tag("a b", "C", Direction::Forward, 0, 2, &doc);
        let second = tag("b c", "C", Direction::Forward, 1, 3, &doc);
        let mut graph = ContextGraph::new(vec![], vec![first, second]);
        graph.prune_modifiers();
        let spans: Vec<Span> = graph.modifiers().iter().map(|m| m.span()).collect();
        assert_eq!(spans, vec![Span::new(0, 2)]);
    }

    #[test]
    fn prune_leaves_disjoint_modifiers_alone() {
        let doc = Doc::from_text("no evidence of chf but pneumonia.");
        let neg = tag("no evidence of", "NEGATED_EXISTENCE", Direction::Forward, 0, 3, &doc);
        let term = tag("but", "TERMINATE", Direction::Terminate, 4, 5, &doc);
        let mut graph = ContextGraph::new(vec![], vec![neg, term]);
        graph.prune_modifiers();
        assert_eq!(graph.modifiers().len(), 2);
    }

    #[test]
    fn prune_single_and_empty_are_noops() {
        let doc = Doc::from_text("no chf.");
        let only = tag("no", "NEGATED_EXISTENCE", Direction::Forward, 0, 1, &doc);
        let mut graph = ContextGraph::new(vec![], vec![only]);
        graph.prune_modifiers();
        assert_eq!(graph.modifiers().len(), 1);

        let mut empty = ContextGraph::new(vec![], vec![]);
        empty.prune_modifiers();
        assert!(empty.modifiers().is_empty());
    }

    #[test]
    fn remove_overlapping_modifiers_drops_target_collisions() {
        let doc = Doc::from_text("possible pneumonia seen.");
        let modifier = tag("possible pneumonia", "POSSIBLE_EXISTENCE", Direction::Forward, 0, 2, &doc);
        let targets = vec![Target::new(Span::labeled(1, 2, "CONDITION"))];
        let mut graph = ContextGraph::new(targets, vec![modifier]);
        graph.remove_overlapping_modifiers();
        assert!(graph.modifiers().is_empty());
    }

    #[test]
    fn update_scopes_applies_termination() {
        let doc = Doc::from_text("no evidence of chf but she has pneumonia.");
        let neg = tag("no evidence of", "NEGATED_EXISTENCE", Direction::Forward, 0, 3, &doc);
        let term = tag("but", "TERMINATE", Direction::Terminate, 4, 5, &doc);
        let mut graph = ContextGraph::new(vec![], vec![neg, term]);
        graph.update_scopes();
        assert_eq!(graph.modifiers()[0].scope(), (3, 4));
    }

    #[test]
    fn apply_modifiers_links_targets_in_scope() {
        let doc = Doc::from_text("no evidence of chf but she has pneumonia.");
        let neg = tag("no evidence of", "NEGATED_EXISTENCE", Direction::Forward, 0, 3, &doc);
        let term = tag("but", "TERMINATE", Direction::Terminate, 4, 5, &doc);
        let targets = vec![
            Target::new(Span::labeled(3, 4, "CONDITION")),
            Target::new(Span::labeled(7, 8, "CONDITION")),
        ];
        let mut graph = ContextGraph::new(targets, vec![neg, term]);
        graph.update_scopes();
        graph.apply_modifiers();
        assert_eq!(graph.edges(), &[(0, 0)]);
        assert_eq!(graph.modifiers()[0].bound_targets(), &[0]);
    }

    #[test]
    fn max_targets_keeps_closest() {
        let doc = Doc::from_text("Pt with diabetes, pneumonia vs COPD");
        // tokens: Pt with diabetes , pneumonia vs COPD
        let vs = capped_tag("vs", Direction::Bidirectional, 2, 5, 6, &doc);
        let targets = vec![
            Target::new(Span::labeled(2, 3, "CONDITION")),
            Target::new(Span::labeled(4, 5, "CONDITION")),
            Target::new(Span::labeled(6, 7, "CONDITION")),
        ];
        let mut graph = ContextGraph::new(targets, vec![vs]);
        graph.update_scopes();
        graph.apply_modifiers();
        assert_eq!(graph.edges(), &[(1, 0), (2, 0)]);
        assert_eq!(graph.modifiers()[0].bound_targets(), &[1, 2]);
    }

    #[test]
    fn max_targets_tie_broken_by_document_order() {
        let doc = Doc::from_text("chf vs pneumonia");
        let vs = capped_tag("vs", Direction::Bidirectional, 1, 1, 2, &doc);
        let targets = vec![
            Target::new(Span::labeled(0, 1, "CONDITION")),
            Target::new(Span::labeled(2, 3, "CONDITION")),
        ];
        let mut graph = ContextGraph::new(targets, vec![vs]);
        graph.apply_modifiers();
        // Both distances are zero; the earlier target wins.
        assert_eq!(graph.edges(), &[(0, 0)]);
    }

    #[test]
    fn modifiers_sorted_on_construction() {
        let doc = Doc::from_text("denies chf but pneumonia was ruled out.");
        let ruled = tag("ruled out", "NEGATED_EXISTENCE", Direction::Backward, 5, 7, &doc);
        let denies = tag("denies", "NEGATED_EXISTENCE", Direction::Forward, 0, 1, &doc);
        let graph = ContextGraph::new(vec![], vec![ruled, denies]);
        let starts: Vec<usize> = graph.modifiers().iter().map(|m| m.start()).collect();
        assert_eq!(starts, vec![0, 5]);
    }

    // Running the pipeline twice must yield the same edges.
    #[test]
    fn pipeline_is_idempotent() {
        let doc = Doc::from_text("no evidence of chf, neg for pneumonia.");
        let build = || {
            let first = tag("no evidence of", "NEGATED_EXISTENCE", Direction::Forward, 0, 3, &doc);
            let second = tag("neg for", "NEGATED_EXISTENCE", Direction::Forward, 5, 7, &doc);
            let targets = vec![
                Target::new(Span::labeled(3, 4, "CONDITION")),
                Target::new(Span::labeled(7, 8, "CONDITION")),
            ];
            let mut graph = ContextGraph::new(targets, vec![first, second]);
            graph.prune_modifiers();
            graph.update_scopes();
            graph.apply_modifiers();
            graph.edges().to_vec()
        };
        assert_eq!(build(), build());
        assert_eq!(build(), vec![(0, 0), (1, 1)]);
    }
}
