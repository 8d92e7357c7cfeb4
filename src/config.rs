use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub auto_reply: AutoReplyConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Group (supergroup) to watch
    pub target_group_id: i64,
    /// Forum topic inside the group; when unset every message in the group is read
    #[serde(default)]
    pub target_topic_id: Option<i32>,
    /// Operator who receives offer alerts
    pub notify_user_id: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AutoReplyConfig {
    #[serde(default = "default_auto_reply_enabled")]
    pub enabled: bool,
    #[serde(default = "default_auto_reply_text")]
    pub text: String,
}

impl Default for AutoReplyConfig {
    fn default() -> Self {
        Self {
            enabled: default_auto_reply_enabled(),
            text: default_auto_reply_text(),
        }
    }
}

/// Heuristic tunables of the offer classifier.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Maximum character gap between a number and a currency mention
    #[serde(default = "default_proximity_window")]
    pub proximity_window: usize,
    /// Factor applied to amounts carrying a `k`/`к`/`тыс` suffix
    #[serde(default = "default_thousands_multiplier")]
    pub thousands_multiplier: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            proximity_window: default_proximity_window(),
            thousands_multiplier: default_thousands_multiplier(),
        }
    }
}

fn default_auto_reply_enabled() -> bool {
    true
}

fn default_auto_reply_text() -> String {
    "Привет, если рубли еще нужны, скажи пожалуйста куда перевести, в течении часа переведу"
        .to_string()
}

fn default_proximity_window() -> usize {
    10
}

fn default_thousands_multiplier() -> f64 {
    1000.0
}

impl Config {
    /// Load from environment variables when `TELEGRAM_BOT_TOKEN` is set,
    /// otherwise from the TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let config = match Self::from_lookup(|key| std::env::var(key).ok())? {
            Some(config) => {
                tracing::info!("Configuration loaded from environment variables");
                config
            }
            None => Self::from_file(path)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Build a config from `lookup` (normally the process environment).
    /// Returns `None` when no bot token is provided that way.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        let Some(bot_token) = lookup("TELEGRAM_BOT_TOKEN") else {
            return Ok(None);
        };

        let required = |key: &str| {
            lookup(key).with_context(|| format!("Missing environment variable {}", key))
        };

        let target_group_id = required("TARGET_GROUP_ID")?
            .trim()
            .parse::<i64>()
            .context("TARGET_GROUP_ID must be an integer")?;
        let notify_user_id = required("NOTIFY_USER_ID")?
            .trim()
            .parse::<u64>()
            .context("NOTIFY_USER_ID must be a positive integer")?;
        let target_topic_id = lookup("TARGET_TOPIC_ID")
            .map(|v| v.trim().parse::<i32>())
            .transpose()
            .context("TARGET_TOPIC_ID must be an integer")?;

        let mut auto_reply = AutoReplyConfig::default();
        if let Some(enabled) = lookup("AUTO_REPLY_ENABLED") {
            auto_reply.enabled = enabled
                .trim()
                .parse::<bool>()
                .context("AUTO_REPLY_ENABLED must be true or false")?;
        }
        if let Some(text) = lookup("AUTO_REPLY_TEXT") {
            auto_reply.text = text;
        }

        let mut classifier = ClassifierConfig::default();
        if let Some(window) = lookup("PROXIMITY_WINDOW") {
            classifier.proximity_window = window
                .trim()
                .parse::<usize>()
                .context("PROXIMITY_WINDOW must be a non-negative integer")?;
        }

        Ok(Some(Config {
            telegram: TelegramConfig {
                bot_token,
                target_group_id,
                target_topic_id,
                notify_user_id,
            },
            auto_reply,
            classifier,
        }))
    }

    /// Reject configs still carrying the example placeholders.
    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty()
            || self.telegram.bot_token.contains("YOUR_")
        {
            bail!("telegram.bot_token is not set; replace the placeholder value");
        }
        if self.telegram.target_group_id == 0 {
            bail!("telegram.target_group_id is not set");
        }
        if self.telegram.notify_user_id == 0 {
            bail!("telegram.notify_user_id is not set");
        }
        let multiplier = self.classifier.thousands_multiplier;
        if !(multiplier.is_finite() && multiplier > 0.0) {
            bail!("classifier.thousands_multiplier must be a positive finite number");
        }
        Ok(())
    }
}
