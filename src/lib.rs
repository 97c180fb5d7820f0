//! ConText for clinical text: find modifier phrases such as "no evidence
//! of" or "family history of" in a tokenized document and decide which
//! pre-identified target concepts they apply to.
//!
//! The pipeline per document: the matchers turn rules into raw modifier
//! matches, each match becomes a [`TagObject`] with a directional scope,
//! the [`ContextGraph`] prunes overlapping modifiers, shrinks scopes
//! through pairwise interaction, and links targets to modifiers; the
//! engine then writes category-derived booleans (`is_negated`,
//! `is_historical`, ...) onto each target.
//!
//! ```
//! use clincontext::{ConTextComponent, Doc};
//!
//! let engine = ConTextComponent::with_defaults()?;
//! let mut doc = Doc::from_text("No evidence of pneumonia.");
//! doc.add_ent("pneumonia", "CONDITION");
//! engine.process(&mut doc)?;
//! assert_eq!(doc.ents[0].attribute("is_negated"), Some(true));
//! # Ok::<(), clincontext::ContextError>(())
//! ```

pub mod doc;
pub mod engine;
pub mod error;
pub mod graph;
pub mod matcher;
pub mod rules;
pub mod tag;

pub use doc::{Doc, Span, Target, Token, TokenAttr};
pub use engine::{AttributeMapping, ConTextComponent, ContextConfig, RuleSource, TargetSource};
pub use error::{ContextError, Result};
pub use graph::ContextGraph;
pub use matcher::{PatternMatcher, PhraseMatcher, RawMatch};
pub use rules::{
    default_rules, load_json, load_yaml, save_json, AttrMatch, ContextItem, Direction,
    TokenPredicate,
};
pub use tag::TagObject;
