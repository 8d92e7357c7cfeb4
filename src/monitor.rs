use teloxide::utils::html;
use tracing::{debug, info};

use crate::config::{AutoReplyConfig, Config};
use crate::parser::{ClassificationResult, Confidence, OfferClassifier, OfferType};
use crate::platform::IncomingMessage;

const RULE: &str = "-------------------------------------";

/// Why a message was skipped before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    OtherChat,
    /// Not posted inside any forum topic
    NoTopic,
    OtherTopic(i32),
}

/// Where an offer should be delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Message the counterparty directly
    AutoReply { user_id: u64, text: String },
    /// Alert the operator
    Notify { user_id: u64, text: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Ignored(IgnoreReason),
    NoOffer,
    Offer {
        result: ClassificationResult,
        delivery: Delivery,
    },
}

/// Watches one group (and optionally one forum topic) for exchange offers.
/// Platform-agnostic: receives an `IncomingMessage`, returns what to do.
pub struct Monitor {
    classifier: OfferClassifier,
    target_group_id: i64,
    target_topic_id: Option<i32>,
    notify_user_id: u64,
    auto_reply: AutoReplyConfig,
}

impl Monitor {
    pub fn new(config: &Config) -> Self {
        Self {
            classifier: OfferClassifier::new(&config.classifier),
            target_group_id: config.telegram.target_group_id,
            target_topic_id: config.telegram.target_topic_id,
            notify_user_id: config.telegram.notify_user_id,
            auto_reply: config.auto_reply.clone(),
        }
    }

    pub fn target_group_id(&self) -> i64 {
        self.target_group_id
    }

    pub fn notify_user_id(&self) -> u64 {
        self.notify_user_id
    }

    pub fn process_message(&self, incoming: &IncomingMessage) -> Verdict {
        if let Some(reason) = self.ignore_reason(incoming) {
            debug!(
                "Ignoring message {} ({:?}): {}",
                incoming.message_id,
                reason,
                incoming.text.chars().take(60).collect::<String>()
            );
            return Verdict::Ignored(reason);
        }

        info!("Target message from {}: {}", incoming.sender_name, incoming.text);

        let Some(result) = self.classifier.classify(&incoming.text) else {
            info!("No relevant offer identified");
            return Verdict::NoOffer;
        };

        info!(
            "Parsed offer: {} ({} confidence)",
            result.offer_type, result.confidence
        );

        let delivery = match incoming.sender_id {
            Some(user_id) if self.should_auto_reply(&result) => Delivery::AutoReply {
                user_id,
                text: self.auto_reply.text.clone(),
            },
            _ => Delivery::Notify {
                user_id: self.notify_user_id,
                text: self.notification(incoming, &result),
            },
        };

        Verdict::Offer { result, delivery }
    }

    fn ignore_reason(&self, incoming: &IncomingMessage) -> Option<IgnoreReason> {
        if incoming.chat_id != self.target_group_id {
            return Some(IgnoreReason::OtherChat);
        }
        let target = self.target_topic_id?;
        match incoming.topic_id {
            None => Some(IgnoreReason::NoTopic),
            Some(topic) if topic != target => Some(IgnoreReason::OtherTopic(topic)),
            Some(_) => None,
        }
    }

    /// Counterparties buying roubles get a direct reply; everything else
    /// goes to the operator.
    fn should_auto_reply(&self, result: &ClassificationResult) -> bool {
        self.auto_reply.enabled
            && result.offer_type == OfferType::BuysCurrencyB
            && result.confidence >= Confidence::Medium
    }

    /// Operator alert as Telegram HTML.
    pub fn notification(&self, incoming: &IncomingMessage, result: &ClassificationResult) -> String {
        let (label_a, label_b) = self.classifier.currency_labels();
        let offer = match result.offer_type {
            OfferType::SellsCurrencyA => format!("Counterparty sells {}", label_a),
            OfferType::BuysCurrencyB => format!("Counterparty buys {}", label_b),
            OfferType::PotentialMention => "Potential mention".to_string(),
        };

        [
            "🔔 <b>New Exchange Offer Alert!</b> 🔔".to_string(),
            RULE.to_string(),
            format!("<b>Type</b>: {}", offer),
            format!("<b>Confidence</b>: {}", capitalize(&result.confidence.to_string())),
            format!("<b>{} Amount</b>: {}", label_a, format_amount(result.amount_a)),
            format!("<b>{} Amount</b>: {}", label_b, format_amount(result.amount_b)),
            RULE.to_string(),
            format!(
                "<b>Original Message (from {})</b>:",
                html::escape(&incoming.sender_name)
            ),
            format!("<blockquote>{}</blockquote>", html::escape(&result.original_text)),
            RULE.to_string(),
            format!("Link to message: {}", incoming.link()),
        ]
        .join("\n")
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn format_amount(amount: Option<f64>) -> String {
    match amount {
        Some(v) if v.fract() == 0.0 => format!("{:.0}", v),
        Some(v) => format!("{}", v),
        None => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClassifierConfig, TelegramConfig};

    const GROUP: i64 = -1001234567890;

    fn config(topic: Option<i32>, auto_reply: bool) -> Config {
        Config {
            telegram: TelegramConfig {
                bot_token: "123:abc".to_string(),
                target_group_id: GROUP,
                target_topic_id: topic,
                notify_user_id: 999,
            },
            auto_reply: AutoReplyConfig {
                enabled: auto_reply,
                text: "Привет, рубли ещё нужны?".to_string(),
            },
            classifier: ClassifierConfig::default(),
        }
    }

    fn incoming(text: &str, topic: Option<i32>, sender_id: Option<u64>) -> IncomingMessage {
        IncomingMessage {
            chat_id: GROUP,
            chat_username: None,
            message_id: 10,
            topic_id: topic,
            sender_id,
            sender_name: "Anna <admin>".to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_ignores_other_chat() {
        let monitor = Monitor::new(&config(None, true));
        let mut msg = incoming("Продам 200 фунтов", None, Some(1));
        msg.chat_id = -100555;
        assert_eq!(
            monitor.process_message(&msg),
            Verdict::Ignored(IgnoreReason::OtherChat)
        );
    }

    #[test]
    fn test_topic_filter() {
        let monitor = Monitor::new(&config(Some(5), true));
        assert_eq!(
            monitor.process_message(&incoming("Продам 200 фунтов", None, Some(1))),
            Verdict::Ignored(IgnoreReason::NoTopic)
        );
        assert_eq!(
            monitor.process_message(&incoming("Продам 200 фунтов", Some(6), Some(1))),
            Verdict::Ignored(IgnoreReason::OtherTopic(6))
        );
        assert!(matches!(
            monitor.process_message(&incoming("Продам 200 фунтов", Some(5), Some(1))),
            Verdict::Offer { .. }
        ));
    }

    #[test]
    fn test_no_topic_configured_reads_whole_group() {
        let monitor = Monitor::new(&config(None, true));
        assert!(matches!(
            monitor.process_message(&incoming("Продам 200 фунтов", None, Some(1))),
            Verdict::Offer { .. }
        ));
    }

    #[test]
    fn test_no_offer() {
        let monitor = Monitor::new(&config(None, true));
        assert_eq!(
            monitor.process_message(&incoming("Всем привет", None, Some(1))),
            Verdict::NoOffer
        );
    }

    #[test]
    fn test_rouble_buyer_gets_auto_reply() {
        let monitor = Monitor::new(&config(None, true));
        match monitor.process_message(&incoming("Куплю рубли на 50000.", None, Some(42))) {
            Verdict::Offer {
                delivery: Delivery::AutoReply { user_id, text },
                ..
            } => {
                assert_eq!(user_id, 42);
                assert_eq!(text, "Привет, рубли ещё нужны?");
            }
            other => panic!("expected auto reply, got {:?}", other),
        }
    }

    #[test]
    fn test_auto_reply_needs_sender_and_switch() {
        let monitor = Monitor::new(&config(None, true));
        assert!(matches!(
            monitor.process_message(&incoming("Куплю рубли на 50000.", None, None)),
            Verdict::Offer {
                delivery: Delivery::Notify { user_id: 999, .. },
                ..
            }
        ));

        let monitor = Monitor::new(&config(None, false));
        assert!(matches!(
            monitor.process_message(&incoming("Куплю рубли на 50000.", None, Some(42))),
            Verdict::Offer {
                delivery: Delivery::Notify { user_id: 999, .. },
                ..
            }
        ));
    }

    #[test]
    fn test_low_confidence_buy_goes_to_operator() {
        let monitor = Monitor::new(&config(None, true));
        // Keyword match without an amount is demoted to low confidence
        match monitor.process_message(&incoming("Куплю рубли за фунты", None, Some(42))) {
            Verdict::Offer { result, delivery } => {
                assert_eq!(result.offer_type, OfferType::BuysCurrencyB);
                assert_eq!(result.confidence, Confidence::Low);
                assert!(matches!(delivery, Delivery::Notify { .. }));
            }
            other => panic!("expected offer, got {:?}", other),
        }
    }

    #[test]
    fn test_seller_goes_to_operator() {
        let monitor = Monitor::new(&config(None, true));
        match monitor.process_message(&incoming("Продам 200 фунтов за рубли", None, Some(42))) {
            Verdict::Offer {
                delivery: Delivery::Notify { user_id, text },
                ..
            } => {
                assert_eq!(user_id, 999);
                assert!(text.contains("<b>Type</b>: Counterparty sells GBP"));
                assert!(text.contains("<b>Confidence</b>: High"));
                assert!(text.contains("<b>GBP Amount</b>: 200"));
                assert!(text.contains("<b>RUB Amount</b>: n/a"));
                assert!(text.contains("from Anna &lt;admin&gt;"));
                assert!(text.contains("https://t.me/c/1234567890/10"));
            }
            other => panic!("expected notification, got {:?}", other),
        }
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Some(120_000.0)), "120000");
        assert_eq!(format_amount(Some(1.5)), "1.5");
        assert_eq!(format_amount(None), "n/a");
    }
}
