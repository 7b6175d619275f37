//! Memo classification.
//!
//! The gateway memo is the only record of what a payment bought. The
//! classifier holds an ordered rule table; the first rule whose pattern
//! matches and yields a usable title wins. Classification is total: an
//! empty memo is `unknown`, anything unrecognised is `other`.

use std::sync::OnceLock;

use marquee_types::{Category, ClassifiedTransaction, RawPayment};
use regex::Regex;
use serde::Serialize;
use tracing::{trace, warn};

/// How a rule derives the entity key from its match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Extract {
    /// Capture group 1 is the title.
    Title,
    /// Festival-wide purchase with no entity.
    Nothing,
}

/// Rule table in priority order: donations, tickets, passes, blocks, movies.
const RULES: &[(&str, Category, Extract)] = &[
    (r#"(?i)^\s*support for film:\s*(.*)$"#, Category::Donation, Extract::Title),
    (r#"(?i)^\s*support for\s+(".*")\s*$"#, Category::Donation, Extract::Title),
    (r"(?i)^\s*donation for film:\s*(.*)$", Category::Donation, Extract::Title),
    (r"(?i)^\s*donation to\s+(.*)$", Category::Donation, Extract::Title),
    (r"(?i)^\s*pledge for\s+(.*)$", Category::Donation, Extract::Title),
    (r"(?i)^\s*watch party ticket:\s*(.*)$", Category::Ticket, Extract::Title),
    (r"(?i)^\s*live screening ticket:\s*(.*)$", Category::Ticket, Extract::Title),
    (r"(?i)^\s*watch party:\s*(.*)$", Category::Ticket, Extract::Title),
    (r"(?i)festival pass", Category::FestivalPass, Extract::Nothing),
    (r"(?i)all[- ]access pass|subscription", Category::Pass, Extract::Nothing),
    (r"(?i)^\s*unlock block:\s*(.*)$", Category::Block, Extract::Title),
    (r"(?i)^\s*block unlock:\s*(.*)$", Category::Block, Extract::Title),
    (r"(?i)^\s*block pass:\s*(.*)$", Category::Block, Extract::Title),
    (r"(?i)^\s*movie purchase:\s*(.*)$", Category::Movie, Extract::Title),
    (r"(?i)^\s*movie rental:\s*(.*)$", Category::Movie, Extract::Title),
    (r"(?i)^\s*purchase:\s*(.*)$", Category::Movie, Extract::Title),
    (r"(?i)^\s*rental:\s*(.*)$", Category::Movie, Extract::Title),
    (r"(?i)^\s*rent:\s*(.*)$", Category::Movie, Extract::Title),
    (r"(?i)^\s*buy:\s*(.*)$", Category::Movie, Extract::Title),
];

/// Category and entity key for one memo.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub category: Category,
    pub entity_key: Option<String>,
}

impl Classification {
    fn bare(category: Category) -> Self {
        Self {
            category,
            entity_key: None,
        }
    }
}

struct Rule {
    pattern: Regex,
    category: Category,
    extract: Extract,
}

/// Ordered first-match-wins memo classifier.
pub struct NoteClassifier {
    rules: Vec<Rule>,
}

impl Default for NoteClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteClassifier {
    /// Compile the built-in rule table.
    pub fn new() -> Self {
        let mut rules = Vec::with_capacity(RULES.len());
        for (pattern, category, extract) in RULES {
            match Regex::new(pattern) {
                Ok(pattern) => rules.push(Rule {
                    pattern,
                    category: *category,
                    extract: *extract,
                }),
                Err(e) => warn!(pattern, error = %e, "skipping invalid classifier rule"),
            }
        }
        Self { rules }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Classify a memo. Never fails.
    pub fn classify(&self, memo: &str) -> Classification {
        if memo.trim().is_empty() {
            return Classification::bare(Category::Unknown);
        }

        for rule in &self.rules {
            let Some(caps) = rule.pattern.captures(memo) else {
                continue;
            };
            match rule.extract {
                Extract::Nothing => {
                    trace!(memo, category = %rule.category, "memo classified");
                    return Classification::bare(rule.category);
                }
                Extract::Title => {
                    let key = caps.get(1).map(|m| clean_title(m.as_str())).unwrap_or("");
                    if key.is_empty() {
                        // Empty title: let a later rule have it.
                        continue;
                    }
                    trace!(memo, category = %rule.category, key, "memo classified");
                    return Classification {
                        category: rule.category,
                        entity_key: Some(key.to_string()),
                    };
                }
            }
        }

        trace!(memo, "memo unrecognised");
        Classification::bare(Category::Other)
    }

    /// Classify one gateway payment.
    pub fn classify_payment(&self, payment: &RawPayment) -> ClassifiedTransaction {
        let Classification {
            category,
            entity_key,
        } = self.classify(&payment.memo);
        ClassifiedTransaction {
            category,
            entity_key,
            amount: payment.amount,
        }
    }
}

/// Trim whitespace and surrounding quotes.
fn clean_title(raw: &str) -> &str {
    raw.trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '\u{201c}' | '\u{201d}'))
        .trim()
}

/// Process-wide classifier built on first use.
pub fn default_classifier() -> &'static NoteClassifier {
    static CLASSIFIER: OnceLock<NoteClassifier> = OnceLock::new();
    CLASSIFIER.get_or_init(NoteClassifier::new)
}

/// Classify with the default classifier.
pub fn classify(memo: &str) -> Classification {
    default_classifier().classify(memo)
}
