use super::{ContextItem, Direction};

struct DefaultRule {
    /// Must be lowercase. Phrase matching runs on the lower-case token
    /// attribute by default.
    literal: &'static str,
    category: &'static str,
    direction: Direction,
}

const DEFAULT_RULES: &[DefaultRule] = &[
    // === Negated existence ===
    DefaultRule { literal: "no evidence of", category: "NEGATED_EXISTENCE", direction: Direction::Forward },
    DefaultRule { literal: "no sign of", category: "NEGATED_EXISTENCE", direction: Direction::Forward },
    DefaultRule { literal: "no signs of", category: "NEGATED_EXISTENCE", direction: Direction::Forward },
    DefaultRule { literal: "no history of", category: "NEGATED_EXISTENCE", direction: Direction::Forward },
    DefaultRule { literal: "absence of", category: "NEGATED_EXISTENCE", direction: Direction::Forward },
    DefaultRule { literal: "negative for", category: "NEGATED_EXISTENCE", direction: Direction::Forward },
    DefaultRule { literal: "neg for", category: "NEGATED_EXISTENCE", direction: Direction::Forward },
    DefaultRule { literal: "denies", category: "NEGATED_EXISTENCE", direction: Direction::Forward },
    DefaultRule { literal: "denied", category: "NEGATED_EXISTENCE", direction: Direction::Forward },
    DefaultRule { literal: "without", category: "NEGATED_EXISTENCE", direction: Direction::Forward },
    DefaultRule { literal: "not", category: "NEGATED_EXISTENCE", direction: Direction::Forward },
    DefaultRule { literal: "free of", category: "NEGATED_EXISTENCE", direction: Direction::Forward },
    // "Pulmonary embolism has been ruled out." scopes back over the sentence.
    DefaultRule { literal: "ruled out", category: "NEGATED_EXISTENCE", direction: Direction::Backward },
    DefaultRule { literal: "is ruled out", category: "NEGATED_EXISTENCE", direction: Direction::Backward },
    DefaultRule { literal: "unlikely", category: "NEGATED_EXISTENCE", direction: Direction::Backward },
    // === Possible existence / uncertainty ===
    DefaultRule { literal: "possible", category: "POSSIBLE_EXISTENCE", direction: Direction::Forward },
    DefaultRule { literal: "probable", category: "POSSIBLE_EXISTENCE", direction: Direction::Forward },
    DefaultRule { literal: "questionable", category: "POSSIBLE_EXISTENCE", direction: Direction::Forward },
    DefaultRule { literal: "suspicious for", category: "POSSIBLE_EXISTENCE", direction: Direction::Forward },
    DefaultRule { literal: "concern for", category: "POSSIBLE_EXISTENCE", direction: Direction::Forward },
    DefaultRule { literal: "concerning for", category: "POSSIBLE_EXISTENCE", direction: Direction::Forward },
    DefaultRule { literal: "rule out", category: "POSSIBLE_EXISTENCE", direction: Direction::Forward },
    DefaultRule { literal: "r/o", category: "POSSIBLE_EXISTENCE", direction: Direction::Forward },
    DefaultRule { literal: "may be", category: "POSSIBLE_EXISTENCE", direction: Direction::Forward },
    DefaultRule { literal: "might be", category: "POSSIBLE_EXISTENCE", direction: Direction::Forward },
    DefaultRule { literal: "vs", category: "POSSIBLE_EXISTENCE", direction: Direction::Bidirectional },
    DefaultRule { literal: "versus", category: "POSSIBLE_EXISTENCE", direction: Direction::Bidirectional },
    // === Historical ===
    DefaultRule { literal: "history of", category: "HISTORICAL", direction: Direction::Forward },
    DefaultRule { literal: "hx of", category: "HISTORICAL", direction: Direction::Forward },
    DefaultRule { literal: "h/o", category: "HISTORICAL", direction: Direction::Forward },
    DefaultRule { literal: "past medical history", category: "HISTORICAL", direction: Direction::Forward },
    DefaultRule { literal: "previous", category: "HISTORICAL", direction: Direction::Forward },
    DefaultRule { literal: "in the past", category: "HISTORICAL", direction: Direction::Backward },
    // === Hypothetical ===
    DefaultRule { literal: "if", category: "HYPOTHETICAL", direction: Direction::Forward },
    DefaultRule { literal: "in case", category: "HYPOTHETICAL", direction: Direction::Forward },
    DefaultRule { literal: "as needed", category: "HYPOTHETICAL", direction: Direction::Backward },
    DefaultRule { literal: "should", category: "HYPOTHETICAL", direction: Direction::Forward },
    DefaultRule { literal: "return if", category: "HYPOTHETICAL", direction: Direction::Forward },
    // === Family ===
    DefaultRule { literal: "family history of", category: "FAMILY", direction: Direction::Forward },
    DefaultRule { literal: "fh of", category: "FAMILY", direction: Direction::Forward },
    DefaultRule { literal: "family history", category: "FAMILY", direction: Direction::Forward },
    DefaultRule { literal: "mother has", category: "FAMILY", direction: Direction::Forward },
    DefaultRule { literal: "father has", category: "FAMILY", direction: Direction::Forward },
    // === Terminators ===
    DefaultRule { literal: "but", category: "TERMINATE", direction: Direction::Terminate },
    DefaultRule { literal: "however", category: "TERMINATE", direction: Direction::Terminate },
    DefaultRule { literal: "although", category: "TERMINATE", direction: Direction::Terminate },
    DefaultRule { literal: "though", category: "TERMINATE", direction: Direction::Terminate },
    DefaultRule { literal: "aside from", category: "TERMINATE", direction: Direction::Terminate },
    DefaultRule { literal: "apart from", category: "TERMINATE", direction: Direction::Terminate },
    DefaultRule { literal: "which", category: "TERMINATE", direction: Direction::Terminate },
    DefaultRule { literal: "who", category: "TERMINATE", direction: Direction::Terminate },
];

/// The built-in clinical modifier lexicon.
pub fn default_rules() -> Vec<ContextItem> {
    DEFAULT_RULES
        .iter()
        .map(|r| ContextItem::new(r.literal, r.category, r.direction))
        .collect()
}
