use tracing::{debug, info, warn};

use super::OfferType;

/// Structured events raised while classifying a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic<'a> {
    KeywordMatched {
        offer_type: OfferType,
        pattern: &'a str,
        preview: &'a str,
    },
    /// A keyword tier matched but its primary currency had no amount nearby.
    PrimaryAmountMissing { offer_type: OfferType },
    PotentialMention { preview: &'a str },
    ImpliedSell { preview: &'a str },
    MalformedAmount { token: &'a str },
    NoOffer { preview: &'a str },
    InternalFailure { preview: &'a str },
}

/// Receiver for classifier diagnostics.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: Diagnostic<'_>);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: Diagnostic<'_>) {
        match diagnostic {
            Diagnostic::KeywordMatched {
                offer_type,
                pattern,
                preview,
            } => info!(
                "{} keyword match on pattern '{}' for text: '{}'",
                offer_type, pattern, preview
            ),
            Diagnostic::PrimaryAmountMissing { offer_type } => info!(
                "Offer type '{}' matched but the primary amount is missing, re-evaluating as potential mention",
                offer_type
            ),
            Diagnostic::PotentialMention { preview } => {
                info!("Both currencies mentioned without a firm offer: '{}'", preview)
            }
            Diagnostic::ImpliedSell { preview } => {
                info!("Single-currency sell with implied counter-currency: '{}'", preview)
            }
            Diagnostic::MalformedAmount { token } => {
                warn!("Skipping malformed amount token '{}'", token)
            }
            Diagnostic::NoOffer { preview } => debug!("No offer found in text: '{}'", preview),
            Diagnostic::InternalFailure { preview } => {
                warn!("Classifier failed internally, treating as no offer: '{}'", preview)
            }
        }
    }
}

/// Discards every diagnostic.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&self, _diagnostic: Diagnostic<'_>) {}
}
