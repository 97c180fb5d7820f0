use std::collections::{BTreeMap, HashMap};

use crate::graph::ContextGraph;

/// A single token of a document, carrying the attributes the matchers
/// compare against.
#[derive(Debug, Clone)]
pub struct Token {
    /// Raw text as produced by the host tokenizer.
    pub text: String,
    /// Lower-cased form of `text`.
    pub lower: String,
    /// Lemma. Falls back to `lower` when the host supplies none.
    pub lemma: String,
}

impl Token {
    pub fn new(text: &str) -> Token {
        let lower = text.to_lowercase();
        Token {
            text: text.to_string(),
            lemma: lower.clone(),
            lower,
        }
    }

    pub fn with_lemma(text: &str, lemma: &str) -> Token {
        Token {
            text: text.to_string(),
            lower: text.to_lowercase(),
            lemma: lemma.to_string(),
        }
    }

    /// The attribute value selected by `attr`.
    pub fn attr(&self, attr: TokenAttr) -> &str {
        match attr {
            TokenAttr::Lower => &self.lower,
            TokenAttr::Text => &self.text,
            TokenAttr::Lemma => &self.lemma,
        }
    }
}

/// Which token attribute a matcher reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAttr {
    Lower,
    Text,
    Lemma,
}

/// A half-open `[start, end)` interval of token indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub label: Option<String>,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Span {
        Span {
            start,
            end,
            label: None,
        }
    }

    pub fn labeled(start: usize, end: usize, label: &str) -> Span {
        Span {
            start,
            end,
            label: Some(label.to_string()),
        }
    }

    /// Width in tokens.
    pub fn width(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// True iff the two spans share at least one token.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A pre-identified entity span that modifiers may apply to.
///
/// `modifiers` and `attributes` start empty and are written by the engine
/// after edge assignment: `modifiers` holds indices into the document's
/// context graph, `attributes` the category-derived booleans such as
/// `is_negated`.
#[derive(Debug, Clone)]
pub struct Target {
    pub span: Span,
    pub modifiers: Vec<usize>,
    pub attributes: BTreeMap<String, bool>,
}

impl Target {
    pub fn new(span: Span) -> Target {
        Target {
            span,
            modifiers: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.span.label.as_deref()
    }

    /// Look up a boolean attribute written by the engine, e.g. `is_negated`.
    pub fn attribute(&self, name: &str) -> Option<bool> {
        self.attributes.get(name).copied()
    }
}

/// A tokenized, sentence-segmented document.
///
/// The crate does not tokenize or segment; hosts build a `Doc` from their
/// own pipeline and attach targets either to `ents` or to a named span
/// group. [`Doc::from_text`] covers tests and simple hosts with whitespace
/// tokenization and sentence boundaries at `.` / `!` / `?`.
#[derive(Debug, Clone, Default)]
pub struct Doc {
    tokens: Vec<Token>,
    sentences: Vec<(usize, usize)>,
    /// Standard entity collection, the default target source.
    pub ents: Vec<Target>,
    /// Named custom target sources.
    pub span_groups: HashMap<String, Vec<Target>>,
    /// Populated by the engine after processing.
    pub context_graph: Option<ContextGraph>,
}

impl Doc {
    /// Build a document from host-supplied tokens and sentence spans.
    /// Sentence spans must be sorted, non-overlapping, and within bounds.
    pub fn new(tokens: Vec<Token>, sentences: Vec<(usize, usize)>) -> Doc {
        debug_assert!(sentences.windows(2).all(|w| w[0].1 <= w[1].0));
        debug_assert!(sentences.iter().all(|&(s, e)| s <= e && e <= tokens.len()));
        Doc {
            tokens,
            sentences,
            ents: Vec::new(),
            span_groups: HashMap::new(),
            context_graph: None,
        }
    }

    /// Whitespace tokenization with trailing punctuation split into its own
    /// token; a sentence ends after each `.`, `!`, or `?` token.
    pub fn from_text(text: &str) -> Doc {
        let mut tokens = Vec::new();
        for chunk in text.split_whitespace() {
            let mut word = chunk;
            let mut trailing = Vec::new();
            while word.len() > 1 {
                match word.chars().last() {
                    Some(c @ ('.' | ',' | ';' | ':' | '!' | '?')) => {
                        word = &word[..word.len() - c.len_utf8()];
                        trailing.push(c);
                    }
                    _ => break,
                }
            }
            if !word.is_empty() {
                tokens.push(Token::new(word));
            }
            for c in trailing.into_iter().rev() {
                tokens.push(Token::new(&c.to_string()));
            }
        }

        let mut sentences = Vec::new();
        let mut sent_start = 0;
        for (i, token) in tokens.iter().enumerate() {
            if matches!(token.text.as_str(), "." | "!" | "?") {
                sentences.push((sent_start, i + 1));
                sent_start = i + 1;
            }
        }
        if sent_start < tokens.len() {
            sentences.push((sent_start, tokens.len()));
        }

        Doc::new(tokens, sentences)
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, i: usize) -> &Token {
        &self.tokens[i]
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn sentences(&self) -> &[(usize, usize)] {
        &self.sentences
    }

    pub fn has_sentences(&self) -> bool {
        !self.sentences.is_empty()
    }

    /// The sentence span containing token `i`, if any.
    pub fn sentence_containing(&self, i: usize) -> Option<(usize, usize)> {
        self.sentences
            .iter()
            .copied()
            .find(|&(start, end)| start <= i && i < end)
    }

    /// Locate the first occurrence of a lower-case token phrase. Convenience
    /// for building targets without hand-counting indices.
    pub fn token_span(&self, phrase: &str) -> Option<Span> {
        let words: Vec<String> = phrase.split_whitespace().map(str::to_lowercase).collect();
        if words.is_empty() || words.len() > self.tokens.len() {
            return None;
        }
        for start in 0..=(self.tokens.len() - words.len()) {
            if words
                .iter()
                .enumerate()
                .all(|(k, w)| self.tokens[start + k].lower == *w)
            {
                return Some(Span::new(start, start + words.len()));
            }
        }
        None
    }

    /// Add a labeled target to the standard entity collection by phrase.
    /// Panics in tests if the phrase is absent; use `token_span` directly
    /// when absence is expected.
    pub fn add_ent(&mut self, phrase: &str, label: &str) {
        let span = self
            .token_span(phrase)
            .unwrap_or_else(|| panic!("phrase '{}' not found in document", phrase));
        self.ents
            .push(Target::new(Span::labeled(span.start, span.end, label)));
    }
}
