//! Plan reconciliation: pick the in-app purchase most regions share and rank
//! regions by what that plan (or the cheapest fallback) costs.

use crate::domain::entities::RegionPriceRecord;
use std::cmp::Ordering;

/// Tie-break order for equally common plan names. First keyword that any tied
/// name contains wins.
pub const PRIORITY_KEYWORDS: &[&str] = &["Pro", "Premium", "Plus", "Standard"];

/// Most common IAP name across `ok` records. `None` when no region lists any.
///
/// Ties go to the first name containing a priority keyword (keywords checked
/// in order), else to the first-encountered tied name.
pub fn find_common_plan(records: &[RegionPriceRecord]) -> Option<String> {
    // Vec keeps first-encountered order for the final fallback.
    let mut tally: Vec<(&str, usize)> = Vec::new();
    for prices in records.iter().filter_map(|r| r.prices()) {
        for iap in &prices.in_app_purchases {
            match tally.iter_mut().find(|(name, _)| *name == iap.name) {
                Some((_, count)) => *count += 1,
                None => tally.push((iap.name.as_str(), 1)),
            }
        }
    }

    let max = tally.iter().map(|(_, c)| *c).max()?;
    let tied: Vec<&str> = tally
        .iter()
        .filter(|(_, c)| *c == max)
        .map(|(name, _)| *name)
        .collect();

    PRIORITY_KEYWORDS
        .iter()
        .find_map(|kw| tied.iter().find(|name| name.contains(kw)))
        .or_else(|| tied.first())
        .map(|name| name.to_string())
}

/// Ranking key `(effective_price, base_price)` in the reporting currency.
///
/// Non-ok records get `(∞, ∞)`. For ok records the effective price is the
/// common plan's converted price, else the cheapest converted IAP, else the
/// converted base price. Unknown conversions count as `∞`.
pub fn sort_key(record: &RegionPriceRecord, common_plan: Option<&str>) -> (f64, f64) {
    let Some(prices) = record.prices() else {
        return (f64::INFINITY, f64::INFINITY);
    };
    let base = prices.base.converted.unwrap_or(f64::INFINITY);

    let mut plan_price: Option<f64> = None;
    let mut cheapest: Option<f64> = None;
    for iap in &prices.in_app_purchases {
        let Some(price) = iap.converted_price else {
            continue;
        };
        if common_plan == Some(iap.name.as_str()) {
            plan_price = Some(plan_price.map_or(price, |p: f64| p.min(price)));
        }
        cheapest = Some(cheapest.map_or(price, |p: f64| p.min(price)));
    }

    let effective = plan_price.or(cheapest).unwrap_or(base);
    (effective, base)
}

fn compare_keys(a: (f64, f64), b: (f64, f64)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1))
}

/// Sort records ascending by `sort_key`. Stable: equal keys keep input order,
/// so non-ok records stay in request order at the end.
pub fn rank_records(
    mut records: Vec<RegionPriceRecord>,
    common_plan: Option<&str>,
) -> Vec<RegionPriceRecord> {
    records.sort_by(|a, b| compare_keys(sort_key(a, common_plan), sort_key(b, common_plan)));
    records
}
