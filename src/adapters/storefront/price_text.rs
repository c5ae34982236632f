//! Parse storefront price strings ("₺129,99", "NGN 1,500.00", "9,99 €") into
//! a currency guess and an amount.

use super::extractor::ParseError;
use crate::domain::regions;
use regex::Regex;
use std::sync::LazyLock;

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d(?:[\d.,'\s\u{a0}\u{202f}]*\d)?").expect("valid amount regex")
});
static ISO_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{3}\b").expect("valid currency code regex"));

/// Currency symbols, longest first so "HK$" wins over "$".
const SYMBOLS: &[(&str, &str)] = &[
    ("HK$", "HKD"),
    ("NT$", "TWD"),
    ("US$", "USD"),
    ("CA$", "CAD"),
    ("NZ$", "NZD"),
    ("A$", "AUD"),
    ("C$", "CAD"),
    ("S$", "SGD"),
    ("R$", "BRL"),
    ("RM", "MYR"),
    ("Rp", "IDR"),
    ("zł", "PLN"),
    ("Kč", "CZK"),
    ("Ft", "HUF"),
    ("₺", "TRY"),
    ("₦", "NGN"),
    ("₹", "INR"),
    ("€", "EUR"),
    ("£", "GBP"),
    ("₩", "KRW"),
    ("₽", "RUB"),
    ("₴", "UAH"),
    ("₱", "PHP"),
    ("฿", "THB"),
    ("₫", "VND"),
    ("₪", "ILS"),
    ("¥", "JPY"),
    ("$", "USD"),
];

/// Currency guess and amount of a price text.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPrice {
    pub currency: String,
    pub amount: f64,
}

/// Parse `text` shown in `region`.
///
/// Currency: an explicit ISO code in the text, else the region's local
/// currency, else a symbol lookup. Callers holding the page's authoritative
/// currency replace this guess.
pub fn parse_price_text(text: &str, region: &str) -> Result<ParsedPrice, ParseError> {
    let amount = parse_amount(text).ok_or_else(|| ParseError::NoAmount(text.to_string()))?;
    let currency = explicit_code(text)
        .or_else(|| regions::local_currency(region))
        .or_else(|| symbol_currency(text))
        .ok_or_else(|| ParseError::UnknownCurrency(text.to_string()))?;
    Ok(ParsedPrice {
        currency: currency.to_string(),
        amount,
    })
}

fn explicit_code(text: &str) -> Option<&'static str> {
    ISO_CODE_RE.find_iter(text).find_map(|m| {
        regions::REGIONS
            .iter()
            .map(|r| r.currency)
            .find(|c| *c == m.as_str())
    })
}

fn symbol_currency(text: &str) -> Option<&'static str> {
    SYMBOLS
        .iter()
        .find(|(symbol, _)| text.contains(symbol))
        .map(|(_, code)| *code)
}

/// First number in `text`, with thousands/decimal separators disambiguated.
pub fn parse_amount(text: &str) -> Option<f64> {
    let raw = AMOUNT_RE.find(text)?.as_str();
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\'' && *c != '\u{202f}')
        .collect();

    let last_dot = compact.rfind('.');
    let last_comma = compact.rfind(',');
    let normalized = match (last_dot, last_comma) {
        (Some(d), Some(c)) => {
            // Whichever separator comes last is the decimal point.
            let (decimal, thousands) = if d > c { ('.', ',') } else { (',', '.') };
            compact
                .replace(thousands, "")
                .replace(decimal, ".")
        }
        (Some(_), None) => single_separator(&compact, '.'),
        (None, Some(_)) => single_separator(&compact, ','),
        (None, None) => compact,
    };
    normalized.parse::<f64>().ok()
}

/// One kind of separator: repeated or followed by exactly three digits means
/// thousands, otherwise decimal.
fn single_separator(s: &str, sep: char) -> String {
    let count = s.matches(sep).count();
    let tail_len = s.rsplit(sep).next().map(str::len).unwrap_or(0);
    if count > 1 || tail_len == 3 {
        s.replace(sep, "")
    } else {
        s.replace(sep, ".")
    }
}
