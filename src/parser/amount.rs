use once_cell::sync::Lazy;
use regex::Regex;

use super::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::config::ClassifierConfig;

/// A run of digits with optional grouping separators, then an optional
/// thousands marker that has to end the word ("120к", "5 тысяч", not "200 котов").
/// A period or comma only groups when a digit follows it directly, and spaces
/// never cross a line break, so "50000. 2 дня" stays two numbers.
static NUMBER_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?P<num>\d(?:\d|[^\S\r\n]+\d|[.,]\d)*)\s*(?:(?P<k>[kк]|тыс(?:яч[иау]?)?)\b)?",
    )
    .expect("valid regex")
});

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s.,]").expect("valid regex"));

/// Identifies mentions of one currency in lower-cased text.
#[derive(Debug, Clone)]
pub struct CurrencyMatcher {
    /// Short label used in notifications, e.g. "GBP"
    pub label: &'static str,
    pattern: Regex,
    symbol: Option<char>,
}

impl CurrencyMatcher {
    pub fn new(label: &'static str, pattern: Regex, symbol: Option<char>) -> Self {
        Self {
            label,
            pattern,
            symbol,
        }
    }

    pub fn is_mentioned(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Character spans of every mention, plus whether the mention is the
    /// currency glyph. Patterns may match a digit glued to the currency
    /// ("500руб"); that digit is not part of the span.
    fn mentions(&self, text: &str) -> Vec<Span> {
        self.pattern
            .find_iter(text)
            .map(|m| {
                let name = m.as_str().trim_start_matches(|c: char| c.is_ascii_digit());
                let start = m.end() - name.len();
                Span {
                    start: char_offset(text, start),
                    end: char_offset(text, m.end()),
                    is_symbol: self.symbol.is_some_and(|s| name.starts_with(s)),
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
    is_symbol: bool,
}

#[derive(Debug, Clone, Copy)]
struct NumberToken {
    start: usize,
    end: usize,
    value: f64,
}

/// Proximity matcher binding a number to a nearby currency mention.
#[derive(Debug, Clone)]
pub struct AmountExtractor {
    proximity_window: usize,
    thousands_multiplier: f64,
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}

impl AmountExtractor {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            proximity_window: config.proximity_window,
            thousands_multiplier: config.thousands_multiplier,
        }
    }

    /// Return the first number (in reading order) that sits within the
    /// proximity window of any mention of `currency`.
    pub fn extract(
        &self,
        text: &str,
        currency: &CurrencyMatcher,
        sink: &dyn DiagnosticSink,
    ) -> Option<f64> {
        let numbers = self.numbers(text, sink);
        if numbers.is_empty() {
            return None;
        }

        let mentions = currency.mentions(text);
        if mentions.is_empty() {
            return None;
        }

        numbers
            .iter()
            .find(|number| mentions.iter().any(|span| self.is_near(number, span)))
            .map(|number| number.value)
    }

    fn is_near(&self, number: &NumberToken, span: &Span) -> bool {
        number.start.abs_diff(span.end) < self.proximity_window
            || span.start.abs_diff(number.end) < self.proximity_window
            || (span.is_symbol && number.start == span.end)
    }

    fn numbers(&self, text: &str, sink: &dyn DiagnosticSink) -> Vec<NumberToken> {
        let mut tokens = Vec::new();
        for caps in NUMBER_TOKEN.captures_iter(text) {
            let Some(num) = caps.name("num") else {
                continue;
            };
            let digits = SEPARATORS.replace_all(num.as_str(), "");
            let value = match digits.parse::<f64>() {
                Ok(v) if v.is_finite() => v,
                _ => {
                    sink.emit(Diagnostic::MalformedAmount {
                        token: num.as_str(),
                    });
                    continue;
                }
            };
            let multiplier = if caps.name("k").is_some() {
                self.thousands_multiplier
            } else {
                1.0
            };
            tokens.push(NumberToken {
                start: char_offset(text, num.start()),
                end: char_offset(text, num.end()),
                value: value * multiplier,
            });
        }
        tokens
    }
}

/// Convert a byte offset into a character offset.
fn char_offset(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

/// Extract an amount for `currency` with the default tunables, logging
/// through `tracing`.
pub fn extract_amount(text: &str, currency: &CurrencyMatcher) -> Option<f64> {
    AmountExtractor::default().extract(text, currency, &TracingSink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::diagnostics::NullSink;
    use crate::parser::patterns::{GBP, RUB};

    #[test]
    fn test_no_numbers_is_absent() {
        assert_eq!(extract_amount("продам фунты", &GBP), None);
        assert_eq!(extract_amount("куплю рубли", &RUB), None);
        assert_eq!(extract_amount("", &GBP), None);
    }

    #[test]
    fn test_no_currency_mention_is_absent() {
        assert_eq!(extract_amount("продам 200 баксов", &GBP), None);
    }

    #[test]
    fn test_symbol_adjacent() {
        assert_eq!(extract_amount("тест сбщ: продаю £50.", &GBP), Some(50.0));
        assert_eq!(extract_amount("£1234", &GBP), Some(1234.0));
    }

    #[test]
    fn test_thousands_suffix() {
        assert_eq!(extract_amount("нужно 120к рублей", &RUB), Some(120_000.0));
        assert_eq!(extract_amount("нужно 120k рублей", &RUB), Some(120_000.0));
        assert_eq!(extract_amount("есть 5 тыс рублей", &RUB), Some(5_000.0));
        assert_eq!(extract_amount("есть 5 тысяч рублей", &RUB), Some(5_000.0));
        assert_eq!(extract_amount("нужно 2 тысячи рублей", &RUB), Some(2_000.0));
        assert_eq!(extract_amount("отдам за 3 тыс. рублей", &RUB), Some(3_000.0));
    }

    #[test]
    fn test_suffix_must_end_word() {
        assert_eq!(extract_amount("200 котов за рубли", &RUB), None);
        assert_eq!(extract_amount("рубли 20 котов", &RUB), Some(20.0));
    }

    #[test]
    fn test_grouping_separators() {
        assert_eq!(extract_amount("куплю 50 000 рублей", &RUB), Some(50_000.0));
        assert_eq!(extract_amount("куплю 50,000 руб", &RUB), Some(50_000.0));
    }

    #[test]
    fn test_sentence_period_splits_numbers() {
        assert_eq!(
            extract_amount("куплю рубли на 50000. 2 дня жду", &RUB),
            Some(50_000.0)
        );
        assert_eq!(extract_amount("куплю 1.000.000 руб", &RUB), Some(1_000_000.0));
    }

    #[test]
    fn test_line_break_splits_numbers() {
        assert_eq!(extract_amount("рубли 500\n2 дня", &RUB), Some(500.0));
    }

    #[test]
    fn test_currency_glued_to_digits() {
        assert_eq!(extract_amount("куплю 50000р", &RUB), Some(50_000.0));
        assert_eq!(extract_amount("есть 500руб", &RUB), Some(500.0));
        assert_eq!(extract_amount("отдам 300gbp", &GBP), Some(300.0));
    }

    #[test]
    fn test_number_after_currency() {
        assert_eq!(extract_amount("продаю gbp 350, хочу рубли.", &GBP), Some(350.0));
    }

    #[test]
    fn test_distant_number_ignored() {
        assert_eq!(
            extract_amount("продам 200 фунтов за рубли", &RUB),
            None,
            "200 is eleven characters away from the rouble mention"
        );
    }

    #[test]
    fn test_first_near_token_wins() {
        assert_eq!(extract_amount("100 фунтов или 200 фунтов", &GBP), Some(100.0));
    }

    #[test]
    fn test_cyrillic_offsets_are_characters() {
        // Every letter here is two bytes; a byte-based window would miss it.
        assert_eq!(extract_amount("фунтов около 500", &GBP), Some(500.0));
        assert_eq!(extract_amount("фунтов много тут 500", &GBP), None);
    }

    #[test]
    fn test_custom_window() {
        let config = ClassifierConfig {
            proximity_window: 30,
            ..ClassifierConfig::default()
        };
        let extractor = AmountExtractor::new(&config);
        assert_eq!(
            extractor.extract("продам 200 фунтов за рубли", &RUB, &NullSink),
            Some(200.0)
        );
    }

    #[test]
    fn test_symbol_adjacency_with_zero_window() {
        let config = ClassifierConfig {
            proximity_window: 0,
            ..ClassifierConfig::default()
        };
        let extractor = AmountExtractor::new(&config);
        assert_eq!(extractor.extract("£75", &GBP, &NullSink), Some(75.0));
        assert_eq!(extractor.extract("75 gbp", &GBP, &NullSink), None);
    }

    #[test]
    fn test_malformed_token_skipped() {
        let huge = "9".repeat(400);
        let text = format!("{} фунтов и 20 фунтов", huge);
        assert_eq!(extract_amount(&text, &GBP), Some(20.0));
    }
}
