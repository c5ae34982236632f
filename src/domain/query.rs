//! Parse the user's price query: `<app name> [regions...] [-mac|-ipad]` or
//! `id<digits> [regions...]`.

use crate::domain::entities::StoreId;
use crate::domain::errors::DomainError;
use crate::domain::platform::PlatformFilter;
use crate::domain::regions;

const ID_PREFIX: &str = "id";
const QUOTES: &[char] = &['"', '＂', '“', '”'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedQuery {
    /// Direct lookup of a known store id.
    ById {
        store_id: StoreId,
        regions: Option<Vec<String>>,
    },
    /// Free-text search.
    Search {
        term: String,
        platform: PlatformFilter,
        regions: Option<Vec<String>>,
    },
}

impl ParsedQuery {
    pub fn regions(&self) -> Option<&[String]> {
        match self {
            ParsedQuery::ById { regions, .. } | ParsedQuery::Search { regions, .. } => {
                regions.as_deref()
            }
        }
    }
}

pub fn parse_query(input: &str) -> Result<ParsedQuery, DomainError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(DomainError::Validation(
            "enter an app name or an id like id284882215".into(),
        ));
    }

    if let Some(store_id) = parse_store_id(&tokens[0]) {
        return Ok(ParsedQuery::ById {
            store_id,
            regions: resolve_regions(&tokens[1..]),
        });
    }

    let mut platform = None;
    let mut words = Vec::with_capacity(tokens.len());
    for token in tokens {
        match PlatformFilter::from_flag(&token) {
            Some(p) => {
                platform.get_or_insert(p);
            }
            None => words.push(token),
        }
    }

    let split = words
        .iter()
        .position(|w| regions::resolve_token(w).is_some())
        .unwrap_or(words.len());
    let (name_parts, region_parts) = words.split_at(split);
    if name_parts.is_empty() {
        return Err(DomainError::Validation(
            "could not find an app name in the query".into(),
        ));
    }

    Ok(ParsedQuery::Search {
        term: name_parts.join(" "),
        platform: platform.unwrap_or_default(),
        regions: resolve_regions(region_parts),
    })
}

/// `id<digits>` → store id.
fn parse_store_id(token: &str) -> Option<StoreId> {
    let digits = token.strip_prefix(ID_PREFIX)?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Resolve region tokens through the alias table, dropping unknown ones and
/// duplicates. `None` when nothing usable remains.
fn resolve_regions(tokens: &[String]) -> Option<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    for code in tokens.iter().filter_map(|t| regions::resolve_token(t)) {
        if !out.iter().any(|c| c == code) {
            out.push(code.to_string());
        }
    }
    if out.is_empty() { None } else { Some(out) }
}

/// Whitespace tokenizer with double-quote grouping.
fn tokenize(input: &str) -> Result<Vec<String>, DomainError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in input.chars() {
        if QUOTES.contains(&c) {
            in_quotes = !in_quotes;
            has_token = true;
        } else if c.is_whitespace() && !in_quotes {
            if has_token && !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            has_token = false;
        } else {
            current.push(c);
            has_token = true;
        }
    }
    if in_quotes {
        return Err(DomainError::Validation("unbalanced quotes in query".into()));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_search_defaults() {
        let q = parse_query("WhatsApp").unwrap();
        assert_eq!(
            q,
            ParsedQuery::Search {
                term: "WhatsApp".into(),
                platform: PlatformFilter::Default,
                regions: None,
            }
        );
    }

    #[test]
    fn test_search_with_regions_and_flag() {
        let q = parse_query("Final Cut Pro us Turkey xx us -mac").unwrap();
        assert_eq!(
            q,
            ParsedQuery::Search {
                term: "Final Cut Pro".into(),
                platform: PlatformFilter::Mac,
                regions: Some(vec!["US".into(), "TR".into()]),
            }
        );
    }

    #[test]
    fn test_quoted_name_keeps_region_words() {
        let q = parse_query("\"Japan Travel\" -ipad JP").unwrap();
        match q {
            ParsedQuery::Search {
                term,
                platform,
                regions,
            } => {
                assert_eq!(term, "Japan Travel");
                assert_eq!(platform, PlatformFilter::Tablet);
                assert_eq!(regions, Some(vec!["JP".into()]));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_direct_id_with_region_overrides() {
        let q = parse_query("id1643375332 ng 印度").unwrap();
        assert_eq!(
            q,
            ParsedQuery::ById {
                store_id: 1643375332,
                regions: Some(vec!["NG".into(), "IN".into()]),
            }
        );
        assert!(matches!(
            parse_query("idea").unwrap(),
            ParsedQuery::Search { .. }
        ));
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(parse_query("   "), Err(DomainError::Validation(_))));
        assert!(matches!(parse_query("-mac"), Err(DomainError::Validation(_))));
        assert!(matches!(parse_query("US CN"), Err(DomainError::Validation(_))));
        assert!(matches!(
            parse_query("\"Final Cut"),
            Err(DomainError::Validation(_))
        ));
    }
}
