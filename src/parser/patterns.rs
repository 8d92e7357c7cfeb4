use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use super::amount::CurrencyMatcher;

// Stems used inside keyword tiers. They match the start of any inflection,
// so "фунт" covers "фунтов", "фунты", "фунтами" and so on.
const GBP_STEM: &str = r"(?:фунт|гбп|gbp|£|pound|quid)";
const RUB_STEM: &str = r"(?:руб|rub|rur|roubl|₽|(?:\b|\d)р\b)";

const SELL_VERBS: &str = r"\b(?:продам|продаю|предлагаю|отдам|sell|selling|offering)\b";
const EXCHANGE_VERBS: &str =
    r"\b(?:меняю|обменяю|поменяю|поменять|обменять|exchange|exchanging|swap)\b";
const BUY_VERBS: &str = r"\b(?:куплю|покупаю|купить|ищу|buy|buying|looking for)\b";
const NEED_VERBS: &str = r"\b(?:нужны|нужно|нужен|надо|возьму|need)\b";
const HAVE_WORDS: &str = r"\b(?:есть|имеется|have)\b";
const AVAILABLE_WORDS: &str = r"\b(?:в наличии|available)\b";

/// Compile a case-insensitive pattern whose `.` also spans line breaks.
fn compile(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .expect("valid regex")
}

fn compile_all(patterns: Vec<String>) -> Vec<Regex> {
    patterns.iter().map(|p| compile(p)).collect()
}

pub static GBP: Lazy<CurrencyMatcher> = Lazy::new(|| {
    CurrencyMatcher::new(
        "GBP",
        compile(r"(?:\b|\d)(?:gbp|гбп|фунт(?:ов|а|ы|ами|ах|ом|у)?|pounds?|quid)\b|£"),
        Some('£'),
    )
});

pub static RUB: Lazy<CurrencyMatcher> = Lazy::new(|| {
    CurrencyMatcher::new(
        "RUB",
        compile(
            r"(?:\b|\d)(?:rub|rur|руб(?:л(?:ей|и|я|ь|ями|ях|ю|ём|ем))?|r[o]?ubles?|р)\b|₽",
        ),
        Some('₽'),
    )
});

/// "Counterparty sells GBP", in priority order.
pub static SELLS_GBP: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(vec![
        format!("{SELL_VERBS}.*{GBP_STEM}"),
        format!(r"{EXCHANGE_VERBS}.*{GBP_STEM}.*\b(?:на|for)\b.*{RUB_STEM}"),
        format!(r"{GBP_STEM}.*\b(?:на|for)\b.*{RUB_STEM}"),
        format!("{HAVE_WORDS}.*{GBP_STEM}.*{NEED_VERBS}.*{RUB_STEM}"),
        format!("{GBP_STEM}.*{AVAILABLE_WORDS}.*{NEED_VERBS}.*{RUB_STEM}"),
    ])
});

/// "Counterparty buys RUB", in priority order.
pub static BUYS_RUB: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(vec![
        format!("{BUY_VERBS}.*{RUB_STEM}"),
        format!(r"{NEED_VERBS}.*{RUB_STEM}.*\b(?:за|есть|have|for)\b.*{GBP_STEM}"),
    ])
});

/// GBP offered with no rouble side stated. A bare "есть" is left out: it
/// is as likely to be a question ("у кого есть фунты?") as an offer.
pub static IMPLIED_SELL_GBP: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(vec![
        format!("{SELL_VERBS}.*{GBP_STEM}"),
        format!("{AVAILABLE_WORDS}.*{GBP_STEM}"),
        format!("{GBP_STEM}.*{AVAILABLE_WORDS}"),
    ])
});
