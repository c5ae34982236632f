//! Region metadata: code ↔ display name ↔ local currency, flag glyphs, and the
//! alias table used to read free-text region tokens.

/// A storefront region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub code: &'static str,
    pub name: &'static str,
    /// ISO 4217 code of the storefront's local currency.
    pub currency: &'static str,
}

const fn region(code: &'static str, name: &'static str, currency: &'static str) -> Region {
    Region {
        code,
        name,
        currency,
    }
}

/// Supported storefronts.
pub static REGIONS: &[Region] = &[
    region("US", "United States", "USD"),
    region("CN", "China", "CNY"),
    region("HK", "Hong Kong", "HKD"),
    region("TW", "Taiwan", "TWD"),
    region("JP", "Japan", "JPY"),
    region("KR", "South Korea", "KRW"),
    region("SG", "Singapore", "SGD"),
    region("MY", "Malaysia", "MYR"),
    region("TH", "Thailand", "THB"),
    region("PH", "Philippines", "PHP"),
    region("ID", "Indonesia", "IDR"),
    region("VN", "Vietnam", "VND"),
    region("IN", "India", "INR"),
    region("PK", "Pakistan", "PKR"),
    region("TR", "Turkey", "TRY"),
    region("NG", "Nigeria", "NGN"),
    region("EG", "Egypt", "EGP"),
    region("ZA", "South Africa", "ZAR"),
    region("SA", "Saudi Arabia", "SAR"),
    region("AE", "United Arab Emirates", "AED"),
    region("IL", "Israel", "ILS"),
    region("GB", "United Kingdom", "GBP"),
    region("DE", "Germany", "EUR"),
    region("FR", "France", "EUR"),
    region("IT", "Italy", "EUR"),
    region("ES", "Spain", "EUR"),
    region("NL", "Netherlands", "EUR"),
    region("CH", "Switzerland", "CHF"),
    region("SE", "Sweden", "SEK"),
    region("NO", "Norway", "NOK"),
    region("DK", "Denmark", "DKK"),
    region("PL", "Poland", "PLN"),
    region("CZ", "Czechia", "CZK"),
    region("HU", "Hungary", "HUF"),
    region("RU", "Russia", "RUB"),
    region("UA", "Ukraine", "UAH"),
    region("CA", "Canada", "CAD"),
    region("MX", "Mexico", "MXN"),
    region("BR", "Brazil", "BRL"),
    region("AR", "Argentina", "USD"),
    region("CL", "Chile", "CLP"),
    region("CO", "Colombia", "COP"),
    region("PE", "Peru", "PEN"),
    region("AU", "Australia", "AUD"),
    region("NZ", "New Zealand", "NZD"),
];

/// Case-insensitive names and synonyms → region code.
static ALIASES: &[(&str, &str)] = &[
    ("usa", "US"),
    ("america", "US"),
    ("united states", "US"),
    ("美国", "US"),
    ("china", "CN"),
    ("中国", "CN"),
    ("大陆", "CN"),
    ("hongkong", "HK"),
    ("hong kong", "HK"),
    ("香港", "HK"),
    ("taiwan", "TW"),
    ("台湾", "TW"),
    ("japan", "JP"),
    ("日本", "JP"),
    ("korea", "KR"),
    ("south korea", "KR"),
    ("韩国", "KR"),
    ("singapore", "SG"),
    ("新加坡", "SG"),
    ("malaysia", "MY"),
    ("马来西亚", "MY"),
    ("thailand", "TH"),
    ("泰国", "TH"),
    ("philippines", "PH"),
    ("菲律宾", "PH"),
    ("indonesia", "ID"),
    ("印尼", "ID"),
    ("vietnam", "VN"),
    ("越南", "VN"),
    ("india", "IN"),
    ("印度", "IN"),
    ("pakistan", "PK"),
    ("巴基斯坦", "PK"),
    ("turkey", "TR"),
    ("türkiye", "TR"),
    ("turkiye", "TR"),
    ("土耳其", "TR"),
    ("nigeria", "NG"),
    ("尼日利亚", "NG"),
    ("egypt", "EG"),
    ("埃及", "EG"),
    ("south africa", "ZA"),
    ("南非", "ZA"),
    ("saudi", "SA"),
    ("saudi arabia", "SA"),
    ("沙特", "SA"),
    ("uae", "AE"),
    ("emirates", "AE"),
    ("阿联酋", "AE"),
    ("israel", "IL"),
    ("以色列", "IL"),
    ("uk", "GB"),
    ("britain", "GB"),
    ("england", "GB"),
    ("united kingdom", "GB"),
    ("英国", "GB"),
    ("germany", "DE"),
    ("德国", "DE"),
    ("france", "FR"),
    ("法国", "FR"),
    ("italy", "IT"),
    ("意大利", "IT"),
    ("spain", "ES"),
    ("西班牙", "ES"),
    ("netherlands", "NL"),
    ("荷兰", "NL"),
    ("switzerland", "CH"),
    ("瑞士", "CH"),
    ("sweden", "SE"),
    ("瑞典", "SE"),
    ("norway", "NO"),
    ("挪威", "NO"),
    ("denmark", "DK"),
    ("丹麦", "DK"),
    ("poland", "PL"),
    ("波兰", "PL"),
    ("czechia", "CZ"),
    ("czech", "CZ"),
    ("捷克", "CZ"),
    ("hungary", "HU"),
    ("匈牙利", "HU"),
    ("russia", "RU"),
    ("俄罗斯", "RU"),
    ("ukraine", "UA"),
    ("乌克兰", "UA"),
    ("canada", "CA"),
    ("加拿大", "CA"),
    ("mexico", "MX"),
    ("墨西哥", "MX"),
    ("brazil", "BR"),
    ("巴西", "BR"),
    ("argentina", "AR"),
    ("阿根廷", "AR"),
    ("chile", "CL"),
    ("智利", "CL"),
    ("colombia", "CO"),
    ("哥伦比亚", "CO"),
    ("peru", "PE"),
    ("秘鲁", "PE"),
    ("australia", "AU"),
    ("澳大利亚", "AU"),
    ("澳洲", "AU"),
    ("new zealand", "NZ"),
    ("新西兰", "NZ"),
];

/// Regions offered when the user asks to change the search region.
pub const REGION_PICKER: &[&str] = &["CN", "HK", "TW", "JP", "GB"];

/// Find a supported region by code (case-insensitive).
pub fn lookup(code: &str) -> Option<&'static Region> {
    REGIONS.iter().find(|r| r.code.eq_ignore_ascii_case(code))
}

pub fn is_supported(code: &str) -> bool {
    lookup(code).is_some()
}

/// Interpret a free-text token as a region: a supported code, or an alias.
pub fn resolve_token(token: &str) -> Option<&'static str> {
    if let Some(r) = lookup(token) {
        return Some(r.code);
    }
    let lower = token.trim().to_lowercase();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map(|(_, code)| *code)
}

/// Display name, falling back to the code itself for unknown regions.
pub fn display_name(code: &str) -> String {
    lookup(code)
        .map(|r| r.name.to_string())
        .unwrap_or_else(|| code.to_uppercase())
}

pub fn local_currency(code: &str) -> Option<&'static str> {
    lookup(code).map(|r| r.currency)
}

/// Flag glyph built from regional indicator symbols. Empty for malformed codes.
pub fn flag(code: &str) -> String {
    let code = code.trim();
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return String::new();
    }
    code.to_ascii_uppercase()
        .chars()
        .filter_map(|c| char::from_u32(0x1F1E6 + (c as u32 - 'A' as u32)))
        .collect()
}
