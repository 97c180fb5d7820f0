use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use crate::doc::{Doc, Target, TokenAttr};
use crate::error::{ContextError, Result};
use crate::graph::ContextGraph;
use crate::matcher::{PatternMatcher, PhraseMatcher, RawMatch};
use crate::rules::{self, ContextItem};
use crate::tag::TagObject;

/// Category → attribute assignments applied when `add_attrs` uses the
/// defaults.
const DEFAULT_ATTRS: &[(&str, &str)] = &[
    ("NEGATED_EXISTENCE", "is_negated"),
    ("POSSIBLE_EXISTENCE", "is_uncertain"),
    ("HISTORICAL", "is_historical"),
    ("HYPOTHETICAL", "is_hypothetical"),
    ("FAMILY", "is_family"),
];

/// Where the engine reads target spans from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSource {
    /// The document's standard entity collection.
    Ents,
    /// A named custom span group.
    SpanGroup(String),
}

/// How per-target boolean attributes are written.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeMapping {
    Disabled,
    /// `is_negated`, `is_uncertain`, `is_historical`, `is_hypothetical`,
    /// `is_family`.
    Defaults,
    /// Explicit category → {attribute: value} assignments.
    Custom(BTreeMap<String, BTreeMap<String, bool>>),
}

/// Which rules the engine starts with.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleSource {
    /// The built-in clinical lexicon.
    Default,
    /// No initial rules; add them with [`ConTextComponent::add`].
    None,
    /// An explicit list.
    List(Vec<ContextItem>),
    /// A JSON (`.json`) or YAML (`.yaml`/`.yml`) rule file.
    File(PathBuf),
}

/// Engine configuration. Validated once, at engine construction.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    pub target_source: TargetSource,
    pub add_attrs: AttributeMapping,
    /// Token attribute literal phrases match on: `Lower` (default) or the
    /// case-sensitive `Text`.
    pub phrase_attr: TokenAttr,
    pub rule_source: RuleSource,
    /// Defaults copied onto added rules that set none of their own.
    pub allowed_types: Option<BTreeSet<String>>,
    pub excluded_types: Option<BTreeSet<String>>,
    pub max_scope: Option<usize>,
    pub max_targets: Option<usize>,
    /// Ignore sentence boundaries and scope modifiers inside a symmetric
    /// token window of half-width `max_scope`.
    pub use_context_window: bool,
    /// Category → categories that terminate it, unioned into each added
    /// rule's terminated_by set.
    pub terminations: BTreeMap<String, BTreeSet<String>>,
    pub prune: bool,
    pub remove_overlapping_modifiers: bool,
}

impl Default for ContextConfig {
    fn default() -> ContextConfig {
        ContextConfig {
            target_source: TargetSource::Ents,
            add_attrs: AttributeMapping::Defaults,
            phrase_attr: TokenAttr::Lower,
            rule_source: RuleSource::Default,
            allowed_types: None,
            excluded_types: None,
            max_scope: None,
            max_targets: None,
            use_context_window: false,
            terminations: BTreeMap::new(),
            prune: true,
            remove_overlapping_modifiers: false,
        }
    }
}

impl ContextConfig {
    fn validate(&self) -> Result<()> {
        if self.allowed_types.is_some() && self.excluded_types.is_some() {
            return Err(ContextError::Config(
                "only one of allowed_types and excluded_types may be set".to_string(),
            ));
        }
        if self.max_scope == Some(0) {
            return Err(ContextError::Config("max_scope must be positive".to_string()));
        }
        if self.max_targets == Some(0) {
            return Err(ContextError::Config(
                "max_targets must be positive".to_string(),
            ));
        }
        if self.use_context_window && self.max_scope.is_none() {
            return Err(ContextError::Config(
                "use_context_window requires max_scope".to_string(),
            ));
        }
        if self.phrase_attr == TokenAttr::Lemma {
            return Err(ContextError::Config(
                "phrase matching attribute must be LOWER or TEXT".to_string(),
            ));
        }
        Ok(())
    }

    /// The effective category → {attribute: value} table, or None when
    /// attribute writing is disabled.
    fn attribute_table(&self) -> Option<BTreeMap<String, BTreeMap<String, bool>>> {
        match &self.add_attrs {
            AttributeMapping::Disabled => None,
            AttributeMapping::Defaults => Some(
                DEFAULT_ATTRS
                    .iter()
                    .map(|&(category, attr)| {
                        (
                            category.to_string(),
                            BTreeMap::from([(attr.to_string(), true)]),
                        )
                    })
                    .collect(),
            ),
            AttributeMapping::Custom(map) => Some(
                map.iter()
                    .map(|(category, attrs)| (category.to_uppercase(), attrs.clone()))
                    .collect(),
            ),
        }
    }
}

/// The ConText engine: owns the rule set and compiled matchers, applies the
/// algorithm to one document at a time.
///
/// Rules are fully specified at add time (engine defaults and terminations
/// are copied onto them), so per-document matching never consults engine
/// configuration. The engine itself is immutable during processing and may
/// be shared across threads.
#[derive(Debug)]
pub struct ConTextComponent {
    config: ContextConfig,
    rules: Vec<Arc<ContextItem>>,
    phrase_matcher: PhraseMatcher,
    pattern_matcher: PatternMatcher,
}

impl ConTextComponent {
    pub fn new(mut config: ContextConfig) -> Result<ConTextComponent> {
        config.validate()?;
        // Engine-level type filters and termination lists are copied onto
        // rules, which store them upper-case; normalize here once.
        config.allowed_types = config.allowed_types.map(upper_set);
        config.excluded_types = config.excluded_types.map(upper_set);
        config.terminations = config
            .terminations
            .into_iter()
            .map(|(category, set)| (category.to_uppercase(), upper_set(set)))
            .collect();
        let phrase_matcher = PhraseMatcher::new(config.phrase_attr);
        let mut engine = ConTextComponent {
            config,
            rules: Vec::new(),
            phrase_matcher,
            pattern_matcher: PatternMatcher::new(),
        };
        let initial = match &engine.config.rule_source {
            RuleSource::Default => rules::default_rules(),
            RuleSource::None => Vec::new(),
            RuleSource::List(items) => items.clone(),
            RuleSource::File(path) => match path.extension().and_then(|e| e.to_str()) {
                Some("json") => rules::load_json(path)?,
                Some("yaml") | Some("yml") => rules::load_yaml(path)?,
                _ => {
                    return Err(ContextError::Config(format!(
                        "rule file '{}' must end in .json, .yaml, or .yml",
                        path.display()
                    )))
                }
            },
        };
        engine.add(initial)?;
        Ok(engine)
    }

    /// An engine with the default configuration and built-in rules.
    pub fn with_defaults() -> Result<ConTextComponent> {
        ConTextComponent::new(ContextConfig::default())
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn rules(&self) -> &[Arc<ContextItem>] {
        &self.rules
    }

    /// Validate and register rules, copying engine defaults onto rules that
    /// set none of their own and unioning the terminations map into each
    /// rule's terminated_by set.
    pub fn add(&mut self, items: Vec<ContextItem>) -> Result<()> {
        for mut item in items {
            item.validate()?;
            self.apply_defaults(&mut item);
            let rule_id = self.rules.len();
            match item.pattern() {
                Some(pattern) => self.pattern_matcher.add(rule_id, pattern.to_vec()),
                None => self.phrase_matcher.add(rule_id, item.literal()),
            }
            self.rules.push(Arc::new(item));
        }
        Ok(())
    }

    fn apply_defaults(&self, item: &mut ContextItem) {
        if item.allowed_types.is_none() && item.excluded_types.is_none() {
            item.allowed_types = self.config.allowed_types.clone();
            item.excluded_types = self.config.excluded_types.clone();
        }
        if item.max_scope.is_none() {
            item.max_scope = self.config.max_scope;
        }
        if item.max_targets.is_none() {
            item.max_targets = self.config.max_targets;
        }
        if let Some(categories) = self.config.terminations.get(item.category()) {
            item.terminated_by.extend(categories.iter().cloned());
        }
    }

    /// Apply the ConText algorithm to a document: match modifiers, resolve
    /// scopes, link targets, and write per-target attributes. The populated
    /// graph lands on `doc.context_graph`.
    pub fn process(&self, doc: &mut Doc) -> Result<()> {
        let targets: Vec<Target> = match &self.config.target_source {
            TargetSource::Ents => doc.ents.iter().map(fresh_target).collect(),
            TargetSource::SpanGroup(name) => doc
                .span_groups
                .get(name)
                .ok_or_else(|| ContextError::UnsupportedTargetSource(name.clone()))?
                .iter()
                .map(fresh_target)
                .collect(),
        };

        let mut matches = self.phrase_matcher.scan(doc);
        matches.extend(self.pattern_matcher.scan(doc));
        matches.sort_by_key(|m| (m.start, m.end));

        let mut modifiers = Vec::with_capacity(matches.len());
        for RawMatch {
            rule_id,
            start,
            end,
        } in matches
        {
            modifiers.push(TagObject::new(
                self.rules[rule_id].clone(),
                start,
                end,
                doc,
                self.config.use_context_window,
            )?);
        }

        let mut graph = ContextGraph::new(targets, modifiers);
        if self.config.prune {
            graph.prune_modifiers();
        }
        if self.config.remove_overlapping_modifiers {
            graph.remove_overlapping_modifiers();
        }
        graph.update_scopes();
        graph.apply_modifiers();

        self.annotate(&mut graph);
        match &self.config.target_source {
            TargetSource::Ents => doc.ents = graph.targets().to_vec(),
            TargetSource::SpanGroup(name) => {
                doc.span_groups
                    .insert(name.clone(), graph.targets().to_vec());
            }
        }
        doc.context_graph = Some(graph);
        Ok(())
    }

    /// Write modifier lists and boolean attributes onto the graph's targets.
    /// Every configured attribute key is present on every target, default
    /// false, so hosts can read them unconditionally.
    fn annotate(&self, graph: &mut ContextGraph) {
        let attr_table = self.config.attribute_table();

        let mut per_target: Vec<Vec<usize>> = vec![Vec::new(); graph.targets().len()];
        for &(t, m) in graph.edges() {
            per_target[t].push(m);
        }

        let categories: Vec<Vec<String>> = per_target
            .iter()
            .map(|mods| {
                mods.iter()
                    .map(|&m| graph.modifiers()[m].category().to_string())
                    .collect()
            })
            .collect();

        for ((target, mods), cats) in graph
            .targets_mut()
            .iter_mut()
            .zip(per_target)
            .zip(categories)
        {
            target.modifiers = mods;
            target.attributes.clear();
            if let Some(table) = &attr_table {
                for attrs in table.values() {
                    for attr in attrs.keys() {
                        target.attributes.insert(attr.clone(), false);
                    }
                }
                for category in &cats {
                    if let Some(attrs) = table.get(category) {
                        for (attr, value) in attrs {
                            target.attributes.insert(attr.clone(), *value);
                        }
                    }
                }
            }
        }
    }
}

fn fresh_target(t: &Target) -> Target {
    Target::new(t.span.clone())
}

fn upper_set(set: BTreeSet<String>) -> BTreeSet<String> {
    set.into_iter().map(|s| s.to_uppercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Direction;

    fn engine_with(items: Vec<ContextItem>) -> ConTextComponent {
        ConTextComponent::new(ContextConfig {
            rule_source: RuleSource::List(items),
            ..ContextConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn config_rejects_both_type_filters() {
        let config = ContextConfig {
            allowed_types: Some(BTreeSet::from(["A".to_string()])),
            excluded_types: Some(BTreeSet::from(["B".to_string()])),
            ..ContextConfig::default()
        };
        let err = ConTextComponent::new(config).unwrap_err();
        assert!(matches!(err, ContextError::Config(_)), "got: {err}");
    }

    #[test]
    fn config_rejects_window_without_max_scope() {
        let config = ContextConfig {
            use_context_window: true,
            ..ContextConfig::default()
        };
        let err = ConTextComponent::new(config).unwrap_err();
        assert!(err.to_string().contains("max_scope"), "got: {err}");
    }

    #[test]
    fn config_rejects_zero_caps() {
        let config = ContextConfig {
            max_scope: Some(0),
            ..ContextConfig::default()
        };
        assert!(ConTextComponent::new(config).is_err());
        let config = ContextConfig {
            max_targets: Some(0),
            ..ContextConfig::default()
        };
        assert!(ConTextComponent::new(config).is_err());
    }

    #[test]
    fn config_rejects_lemma_phrase_attr() {
        let config = ContextConfig {
            phrase_attr: TokenAttr::Lemma,
            ..ContextConfig::default()
        };
        assert!(ConTextComponent::new(config).is_err());
    }

    #[test]
    fn defaults_propagate_onto_unset_rules() {
        let engine = ConTextComponent::new(ContextConfig {
            rule_source: RuleSource::List(vec![
                ContextItem::new("no evidence of", "NEGATED_EXISTENCE", Direction::Forward),
                ContextItem::new("denies", "NEGATED_EXISTENCE", Direction::Forward)
                    .with_max_scope(3),
            ]),
            max_scope: Some(10),
            max_targets: Some(4),
            ..ContextConfig::default()
        })
        .unwrap();
        assert_eq!(engine.rules()[0].max_scope(), Some(10));
        assert_eq!(engine.rules()[0].max_targets(), Some(4));
        // Rule-level values win.
        assert_eq!(engine.rules()[1].max_scope(), Some(3));
    }

    #[test]
    fn engine_type_filter_fills_only_unset_rules() {
        let engine = ConTextComponent::new(ContextConfig {
            rule_source: RuleSource::List(vec![
                ContextItem::new("a", "C", Direction::Forward),
                ContextItem::new("b", "C", Direction::Forward).with_excluded_types(["FAMILY"]),
            ]),
            allowed_types: Some(BTreeSet::from(["condition".to_string()])),
            ..ContextConfig::default()
        })
        .unwrap();
        // Engine-level sets are normalized to upper-case before copying.
        assert!(engine.rules()[0]
            .allowed_types()
            .expect("engine default should be copied")
            .contains("CONDITION"));
        assert!(engine.rules()[1].allowed_types().is_none());
        assert!(engine.rules()[1].excluded_types().is_some());
    }

    #[test]
    fn terminations_union_into_terminated_by() {
        let engine = ConTextComponent::new(ContextConfig {
            rule_source: RuleSource::List(vec![ContextItem::new(
                "no evidence of",
                "NEGATED_EXISTENCE",
                Direction::Forward,
            )
            .with_terminated_by(["HYPOTHETICAL"])]),
            terminations: BTreeMap::from([(
                "NEGATED_EXISTENCE".to_string(),
                BTreeSet::from(["POSSIBLE_EXISTENCE".to_string()]),
            )]),
            ..ContextConfig::default()
        })
        .unwrap();
        let terminated_by = engine.rules()[0].terminated_by();
        assert!(terminated_by.contains("HYPOTHETICAL"));
        assert!(terminated_by.contains("POSSIBLE_EXISTENCE"));
    }

    #[test]
    fn invalid_rule_rejected_at_add() {
        let mut engine = engine_with(vec![]);
        let bad = ContextItem::new("x", "C", Direction::Forward).with_max_targets(0);
        assert!(engine.add(vec![bad]).is_err());
    }

    #[test]
    fn unknown_span_group_fails_per_document() {
        let engine = ConTextComponent::new(ContextConfig {
            target_source: TargetSource::SpanGroup("problems".to_string()),
            rule_source: RuleSource::None,
            ..ContextConfig::default()
        })
        .unwrap();
        let mut doc = Doc::from_text("no evidence of chf.");
        let err = engine.process(&mut doc).unwrap_err();
        assert!(matches!(err, ContextError::UnsupportedTargetSource(_)));
    }

    #[test]
    fn span_group_targets_are_annotated() {
        let engine = ConTextComponent::new(ContextConfig {
            target_source: TargetSource::SpanGroup("problems".to_string()),
            rule_source: RuleSource::List(vec![ContextItem::new(
                "no evidence of",
                "NEGATED_EXISTENCE",
                Direction::Forward,
            )]),
            ..ContextConfig::default()
        })
        .unwrap();
        let mut doc = Doc::from_text("no evidence of chf.");
        doc.span_groups.insert(
            "problems".to_string(),
            vec![Target::new(crate::doc::Span::labeled(3, 4, "CONDITION"))],
        );
        engine.process(&mut doc).unwrap();
        let problems = &doc.span_groups["problems"];
        assert_eq!(problems[0].attribute("is_negated"), Some(true));
    }

    #[test]
    fn attrs_disabled_writes_no_attributes() {
        let engine = ConTextComponent::new(ContextConfig {
            add_attrs: AttributeMapping::Disabled,
            rule_source: RuleSource::List(vec![ContextItem::new(
                "no evidence of",
                "NEGATED_EXISTENCE",
                Direction::Forward,
            )]),
            ..ContextConfig::default()
        })
        .unwrap();
        let mut doc = Doc::from_text("no evidence of pneumonia.");
        doc.add_ent("pneumonia", "CONDITION");
        engine.process(&mut doc).unwrap();
        assert!(doc.ents[0].attributes.is_empty());
        assert_eq!(doc.ents[0].modifiers.len(), 1);
    }

    #[test]
    fn custom_attribute_mapping_applies() {
        let engine = ConTextComponent::new(ContextConfig {
            add_attrs: AttributeMapping::Custom(BTreeMap::from([(
                "FAMILY".to_string(),
                BTreeMap::from([("family_experiencer".to_string(), true)]),
            )])),
            rule_source: RuleSource::List(vec![ContextItem::new(
                "family history of",
                "FAMILY",
                Direction::Forward,
            )]),
            ..ContextConfig::default()
        })
        .unwrap();
        let mut doc = Doc::from_text("family history of breast cancer.");
        doc.add_ent("breast cancer", "CONDITION");
        engine.process(&mut doc).unwrap();
        assert_eq!(doc.ents[0].attribute("family_experiencer"), Some(true));
        assert_eq!(doc.ents[0].attribute("is_negated"), None);
    }

    #[test]
    fn default_attributes_present_and_false_without_modifiers() {
        let engine = engine_with(vec![]);
        let mut doc = Doc::from_text("pneumonia is present.");
        doc.add_ent("pneumonia", "CONDITION");
        engine.process(&mut doc).unwrap();
        assert_eq!(doc.ents[0].attribute("is_negated"), Some(false));
        assert_eq!(doc.ents[0].attribute("is_historical"), Some(false));
        assert!(doc.ents[0].modifiers.is_empty());
    }

    #[test]
    fn processing_is_repeatable() {
        let mut engine = engine_with(vec![]);
        engine
            .add(vec![
                ContextItem::new("no evidence of", "NEGATED_EXISTENCE", Direction::Forward),
                ContextItem::new("but", "TERMINATE", Direction::Terminate),
            ])
            .unwrap();
        let run = |engine: &ConTextComponent| {
            let mut doc = Doc::from_text("No evidence of chf but she has pneumonia.");
            doc.add_ent("chf", "CONDITION");
            doc.add_ent("pneumonia", "CONDITION");
            engine.process(&mut doc).unwrap();
            doc.context_graph.as_ref().unwrap().edges().to_vec()
        };
        assert_eq!(run(&engine), run(&engine));
    }

    #[test]
    fn missing_sentences_fails_document() {
        let engine = engine_with(vec![ContextItem::new(
            "no",
            "NEGATED_EXISTENCE",
            Direction::Forward,
        )]);
        let mut doc = Doc::new(vec![crate::doc::Token::new("no")], vec![]);
        let err = engine.process(&mut doc).unwrap_err();
        assert!(matches!(err, ContextError::MissingSentenceBoundary));
    }

    #[test]
    fn rule_file_source_loads_rules() {
        use std::io::Write;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(
            f,
            r#"{{"item_data": [{{"literal": "denies", "category": "NEGATED_EXISTENCE", "rule": "FORWARD"}}]}}"#
        )
        .unwrap();
        let engine = ConTextComponent::new(ContextConfig {
            rule_source: RuleSource::File(path),
            ..ContextConfig::default()
        })
        .unwrap();
        assert_eq!(engine.rules().len(), 1);
        assert_eq!(engine.rules()[0].literal(), "denies");
    }

    #[test]
    fn rule_file_unknown_extension_rejected() {
        let engine = ConTextComponent::new(ContextConfig {
            rule_source: RuleSource::File(PathBuf::from("rules.toml")),
            ..ContextConfig::default()
        });
        assert!(engine.is_err());
    }
}
