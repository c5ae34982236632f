//! Detail-page price extraction.
//!
//! Reads the embedded `application/ld+json` offer for the base price and the
//! numbered in-app purchase list for IAP rows. Each block and row is parsed
//! on its own; a failure is recorded in `warnings` and extraction continues
//! with whatever else the page yields.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

static LD_JSON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script\b[^>]*\btype\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("valid ld+json regex")
});
static IAP_ROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<li\b[^>]*\bclass\s*=\s*"[^"]*\blist-with-numbers__item\b[^"]*"[^>]*>(.*?)</li>"#)
        .expect("valid IAP row regex")
});
static IAP_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<span\b[^>]*\bclass\s*=\s*"[^"]*\btruncate-single-line--block\b[^"]*"[^>]*>(.*?)</span>"#)
        .expect("valid IAP name regex")
});
static IAP_PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<span\b[^>]*\bclass\s*=\s*"[^"]*\blist-with-numbers__item__price\b[^"]*"[^>]*>(.*?)</span>"#)
        .expect("valid IAP price regex")
});
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("valid entity regex")
});

const SOFTWARE_APPLICATION: &str = "SoftwareApplication";

/// A single extraction step that could not be completed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("structured data block {index}: {reason}")]
    Json { index: usize, reason: String },

    #[error("structured data block {index}: offer has no usable {field}")]
    MissingField { index: usize, field: &'static str },

    #[error("in-app purchase row {index} has no {field}")]
    IncompleteRow { index: usize, field: &'static str },

    #[error("no amount in price text '{0}'")]
    NoAmount(String),

    #[error("cannot tell the currency of '{0}'")]
    UnknownCurrency(String),
}

/// Base-price offer from the structured data block.
#[derive(Debug, Clone, PartialEq)]
pub struct Offer {
    pub price: f64,
    /// Authoritative currency of the page, when declared.
    pub currency: Option<String>,
    pub is_free: bool,
}

/// An IAP row as printed on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInAppPurchase {
    pub name: String,
    pub price_text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageExtraction {
    pub offer: Option<Offer>,
    /// Deduplicated by `(name, price_text)`, first occurrence kept.
    pub in_app_purchases: Vec<RawInAppPurchase>,
    /// Steps that failed and were skipped.
    pub warnings: Vec<ParseError>,
}

impl PageExtraction {
    pub fn authoritative_currency(&self) -> Option<&str> {
        self.offer.as_ref().and_then(|o| o.currency.as_deref())
    }

    /// Pages without an offer block are treated as free.
    pub fn is_free(&self) -> bool {
        self.offer.as_ref().is_none_or(|o| o.is_free)
    }
}

/// Extract offer and IAP rows from a detail page. Never fails.
pub fn extract(html: &str) -> PageExtraction {
    let mut out = PageExtraction::default();

    for (index, cap) in LD_JSON_RE.captures_iter(html).enumerate() {
        let body = cap.get(1).map(|m| m.as_str()).unwrap_or("");
        match parse_offer_block(index, body) {
            Ok(Some(offer)) => {
                out.offer = Some(offer);
                break;
            }
            Ok(None) => {}
            Err(e) => out.warnings.push(e),
        }
    }

    for (index, cap) in IAP_ROW_RE.captures_iter(html).enumerate() {
        let row = cap.get(1).map(|m| m.as_str()).unwrap_or("");
        match parse_iap_row(index, row) {
            Ok(iap) => {
                if !out.in_app_purchases.contains(&iap) {
                    out.in_app_purchases.push(iap);
                }
            }
            Err(e) => out.warnings.push(e),
        }
    }

    out
}

/// `Ok(None)` when the block is valid JSON but not an application offer.
fn parse_offer_block(index: usize, body: &str) -> Result<Option<Offer>, ParseError> {
    let json: Value = serde_json::from_str(body.trim()).map_err(|e| ParseError::Json {
        index,
        reason: e.to_string(),
    })?;
    if !declares_software_application(&json) {
        return Ok(None);
    }
    let offers = match json.get("offers") {
        Some(Value::Array(list)) => list.first(),
        Some(v @ Value::Object(_)) => Some(v),
        _ => None,
    };
    let Some(offers) = offers.filter(|o| o.as_object().is_some_and(|m| !m.is_empty())) else {
        return Ok(None);
    };

    let price = match offers.get("price") {
        None | Some(Value::Null) => 0.0,
        Some(Value::Number(n)) => n.as_f64().ok_or(ParseError::MissingField {
            index,
            field: "price",
        })?,
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| ParseError::MissingField {
            index,
            field: "price",
        })?,
        Some(_) => {
            return Err(ParseError::MissingField {
                index,
                field: "price",
            });
        }
    };
    let currency = offers
        .get("priceCurrency")
        .and_then(Value::as_str)
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty());
    let category_free = offers
        .get("category")
        .and_then(Value::as_str)
        .is_some_and(|c| c.eq_ignore_ascii_case("free"));

    Ok(Some(Offer {
        price,
        currency,
        is_free: category_free || price <= 0.0,
    }))
}

fn declares_software_application(json: &Value) -> bool {
    match json.get("@type") {
        Some(Value::String(t)) => t == SOFTWARE_APPLICATION,
        Some(Value::Array(types)) => types
            .iter()
            .any(|t| t.as_str() == Some(SOFTWARE_APPLICATION)),
        _ => false,
    }
}

fn parse_iap_row(index: usize, row: &str) -> Result<RawInAppPurchase, ParseError> {
    let name = IAP_NAME_RE
        .captures(row)
        .and_then(|c| c.get(1))
        .map(|m| clean_text(m.as_str()))
        .filter(|s| !s.is_empty())
        .ok_or(ParseError::IncompleteRow {
            index,
            field: "name",
        })?;
    let price_text = IAP_PRICE_RE
        .captures(row)
        .and_then(|c| c.get(1))
        .map(|m| clean_text(m.as_str()))
        .filter(|s| !s.is_empty())
        .ok_or(ParseError::IncompleteRow {
            index,
            field: "price",
        })?;
    Ok(RawInAppPurchase { name, price_text })
}

/// Strip tags, decode entities, collapse whitespace.
fn clean_text(fragment: &str) -> String {
    let text = TAG_RE.replace_all(fragment, "");
    let text = decode_entities(&text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    _ => None,
                }
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iap_row(name: &str, price: &str) -> String {
        format!(
            r#"<li class="list-with-numbers__item">
                 <span class="truncate-single-line truncate-single-line--block">{}</span>
                 <span class="list-with-numbers__item__price medium-show-tablecell">{}</span>
               </li>"#,
            name, price
        )
    }

    fn ld_json(body: &str) -> String {
        format!(r#"<script type="application/ld+json">{}</script>"#, body)
    }

    #[test]
    fn test_paid_offer_and_iaps() {
        let html = format!(
            "<html>{}{}{}{}</html>",
            ld_json(r#"{"@type":"SoftwareApplication","offers":{"price":4.99,"priceCurrency":"USD","category":"paid"}}"#),
            iap_row("Pro Monthly", "$9.99"),
            iap_row("Pro Monthly", "$9.99"),
            iap_row("Pro Yearly", "$59.99"),
        );
        let page = extract(&html);
        assert_eq!(
            page.offer,
            Some(Offer {
                price: 4.99,
                currency: Some("USD".into()),
                is_free: false
            })
        );
        assert_eq!(page.in_app_purchases.len(), 2);
        assert_eq!(page.in_app_purchases[1].name, "Pro Yearly");
        assert!(page.warnings.is_empty());
    }

    #[test]
    fn test_free_by_category_or_zero_price() {
        let page = extract(&ld_json(
            r#"{"@type":"SoftwareApplication","offers":{"price":"1.99","priceCurrency":"try","category":"free"}}"#,
        ));
        assert!(page.is_free());
        assert_eq!(page.authoritative_currency(), Some("TRY"));

        let page = extract(&ld_json(
            r#"{"@type":"SoftwareApplication","offers":{"price":0,"priceCurrency":"NGN"}}"#,
        ));
        assert!(page.is_free());
    }

    #[test]
    fn test_first_matching_block_wins_and_bad_blocks_are_skipped() {
        let html = format!(
            "{}{}{}{}",
            ld_json("{not json"),
            ld_json(r#"{"@type":"Organization","name":"x"}"#),
            ld_json(r#"{"@type":"SoftwareApplication","offers":{"price":2,"priceCurrency":"INR"}}"#),
            ld_json(r#"{"@type":"SoftwareApplication","offers":{"price":3,"priceCurrency":"USD"}}"#),
        );
        let page = extract(&html);
        assert_eq!(page.authoritative_currency(), Some("INR"));
        assert_eq!(page.warnings.len(), 1);
        assert!(matches!(page.warnings[0], ParseError::Json { index: 0, .. }));
    }

    #[test]
    fn test_incomplete_rows_dropped_and_entities_decoded() {
        let html = format!(
            "{}{}",
            r#"<li class="list-with-numbers__item"><span class="truncate-single-line truncate-single-line--block">Orphan</span></li>"#,
            iap_row("Tips &amp; Tricks <b>Pack</b>", "9,99&nbsp;€"),
        );
        let page = extract(&html);
        assert_eq!(page.in_app_purchases.len(), 1);
        assert_eq!(page.in_app_purchases[0].name, "Tips & Tricks Pack");
        assert_eq!(page.in_app_purchases[0].price_text, "9,99 €");
        assert_eq!(
            page.warnings,
            vec![ParseError::IncompleteRow {
                index: 0,
                field: "price"
            }]
        );
    }

    #[test]
    fn test_page_without_structured_data() {
        let page = extract("<html><body>nothing here</body></html>");
        assert!(page.offer.is_none());
        assert!(page.is_free());
        assert!(page.in_app_purchases.is_empty());
    }
}
