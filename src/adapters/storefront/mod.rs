//! Storefront adapters: HTTP gateway, detail-page extractor, price-text parser.

pub mod extractor;
pub mod itunes_client;
pub mod price_text;

pub use extractor::{PageExtraction, ParseError, extract};
pub use itunes_client::ItunesStorefront;
pub use price_text::{ParsedPrice, parse_price_text};
