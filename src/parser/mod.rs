//! Rule-based classification of exchange offers in chat messages.
//!
//! A message is checked against keyword tiers in a fixed order:
//! 1. counterparty sells currency A (GBP)
//! 2. counterparty buys currency B (RUB)
//! 3. a tier that matched without its primary amount is demoted
//! 4. both currencies co-mentioned: low confidence
//! 5. currency A offered with B only implied: medium confidence
//!
//! Anything else is "no offer", which is a normal outcome.

pub mod amount;
pub mod diagnostics;
pub mod patterns;

use std::panic::{self, AssertUnwindSafe};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::config::ClassifierConfig;
use amount::{AmountExtractor, CurrencyMatcher};
use diagnostics::{Diagnostic, DiagnosticSink, TracingSink};

const PREVIEW_CHARS: usize = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferType {
    SellsCurrencyA,
    BuysCurrencyB,
    PotentialMention,
}

impl std::fmt::Display for OfferType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OfferType::SellsCurrencyA => write!(f, "sells_currency_a"),
            OfferType::BuysCurrencyB => write!(f, "buys_currency_b"),
            OfferType::PotentialMention => write!(f, "potential_mention"),
        }
    }
}

/// Ordered so that `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::Low => write!(f, "low"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::High => write!(f, "high"),
        }
    }
}

/// Outcome of classifying one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub offer_type: OfferType,
    pub amount_a: Option<f64>,
    pub amount_b: Option<f64>,
    pub confidence: Confidence,
    pub original_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    A,
    B,
}

/// One keyword tier: any pattern matching yields `offer_type`, and the
/// amount on the `primary` side must be found for a high-confidence result.
#[derive(Debug, Clone)]
struct KeywordTier {
    offer_type: OfferType,
    primary: Side,
    patterns: &'static [Regex],
}

impl KeywordTier {
    fn first_match(&self, text: &str) -> Option<&'static Regex> {
        self.patterns.iter().find(|p| p.is_match(text))
    }
}

/// Stateless classifier; safe to share across threads and call concurrently.
#[derive(Debug, Clone)]
pub struct OfferClassifier {
    extractor: AmountExtractor,
    currency_a: &'static CurrencyMatcher,
    currency_b: &'static CurrencyMatcher,
    tiers: Vec<KeywordTier>,
    implied_sell: &'static [Regex],
}

impl Default for OfferClassifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}

impl OfferClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            extractor: AmountExtractor::new(config),
            currency_a: &patterns::GBP,
            currency_b: &patterns::RUB,
            tiers: vec![
                KeywordTier {
                    offer_type: OfferType::SellsCurrencyA,
                    primary: Side::A,
                    patterns: patterns::SELLS_GBP.as_slice(),
                },
                KeywordTier {
                    offer_type: OfferType::BuysCurrencyB,
                    primary: Side::B,
                    patterns: patterns::BUYS_RUB.as_slice(),
                },
            ],
            implied_sell: patterns::IMPLIED_SELL_GBP.as_slice(),
        }
    }

    /// Labels of currency A and currency B, e.g. `("GBP", "RUB")`.
    pub fn currency_labels(&self) -> (&'static str, &'static str) {
        (self.currency_a.label, self.currency_b.label)
    }

    /// Classify with diagnostics sent to `tracing`.
    pub fn classify(&self, text: &str) -> Option<ClassificationResult> {
        self.classify_with(text, &TracingSink)
    }

    /// Classify with diagnostics sent to `sink`. A panic inside the rule
    /// evaluation is reported to the sink and yields `None`.
    pub fn classify_with(
        &self,
        text: &str,
        sink: &dyn DiagnosticSink,
    ) -> Option<ClassificationResult> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.evaluate(text, sink))) {
            Ok(result) => result,
            Err(_) => {
                sink.emit(Diagnostic::InternalFailure {
                    preview: preview(text),
                });
                None
            }
        }
    }

    fn evaluate(&self, text: &str, sink: &dyn DiagnosticSink) -> Option<ClassificationResult> {
        let lower = text.to_lowercase();
        let preview = preview(text);
        let mentions_a = self.currency_a.is_mentioned(&lower);
        let mentions_b = self.currency_b.is_mentioned(&lower);

        let mut candidate = None;
        let mut amount_a = None;
        let mut amount_b = None;

        for tier in &self.tiers {
            let Some(pattern) = tier.first_match(&lower) else {
                continue;
            };
            sink.emit(Diagnostic::KeywordMatched {
                offer_type: tier.offer_type,
                pattern: pattern.as_str(),
                preview,
            });

            match tier.primary {
                Side::A => {
                    amount_a = self.amount(&lower, Side::A, sink);
                    if mentions_b {
                        amount_b = self.amount(&lower, Side::B, sink);
                    }
                }
                Side::B => {
                    amount_b = self.amount(&lower, Side::B, sink);
                    if mentions_a {
                        amount_a = self.amount(&lower, Side::A, sink);
                    }
                }
            }

            let primary = match tier.primary {
                Side::A => amount_a,
                Side::B => amount_b,
            };
            if primary.is_some() {
                return Some(ClassificationResult {
                    offer_type: tier.offer_type,
                    amount_a,
                    amount_b,
                    confidence: Confidence::High,
                    original_text: text.to_string(),
                });
            }

            sink.emit(Diagnostic::PrimaryAmountMissing {
                offer_type: tier.offer_type,
            });
            candidate = Some(tier.offer_type);
            break;
        }

        if mentions_a && mentions_b {
            sink.emit(Diagnostic::PotentialMention { preview });
            let amount_a = amount_a.or_else(|| self.amount(&lower, Side::A, sink));
            let amount_b = amount_b.or_else(|| self.amount(&lower, Side::B, sink));
            return Some(ClassificationResult {
                offer_type: candidate.unwrap_or(OfferType::PotentialMention),
                amount_a,
                amount_b,
                confidence: Confidence::Low,
                original_text: text.to_string(),
            });
        }

        if candidate.is_none()
            && mentions_a
            && self.implied_sell.iter().any(|p| p.is_match(&lower))
        {
            if let Some(amount) = self.amount(&lower, Side::A, sink) {
                sink.emit(Diagnostic::ImpliedSell { preview });
                return Some(ClassificationResult {
                    offer_type: OfferType::SellsCurrencyA,
                    amount_a: Some(amount),
                    amount_b: None,
                    confidence: Confidence::Medium,
                    original_text: text.to_string(),
                });
            }
        }

        sink.emit(Diagnostic::NoOffer { preview });
        None
    }

    fn amount(&self, lower: &str, side: Side, sink: &dyn DiagnosticSink) -> Option<f64> {
        let currency = match side {
            Side::A => self.currency_a,
            Side::B => self.currency_b,
        };
        self.extractor.extract(lower, currency, sink)
    }
}

static DEFAULT_CLASSIFIER: Lazy<OfferClassifier> = Lazy::new(OfferClassifier::default);

/// Classify `text` with the default tunables.
pub fn classify(text: &str) -> Option<ClassificationResult> {
    DEFAULT_CLASSIFIER.classify(text)
}

/// The first few characters of a message, for log lines.
fn preview(text: &str) -> &str {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
