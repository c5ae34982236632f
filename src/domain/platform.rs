//! Platform filter and the pure classification of search hits.

use crate::domain::entities::{AppCandidate, AppKind};
use serde::{Deserialize, Serialize};

/// Device family marker in `supportedDevices` entries (e.g. "iPadPro-iPadPro").
const TABLET_FAMILY: &str = "iPad";

/// Which storefront platform a search targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlatformFilter {
    #[default]
    #[serde(rename = "software")]
    Default,
    #[serde(rename = "macSoftware")]
    Mac,
    #[serde(rename = "iPadSoftware")]
    Tablet,
}

impl PlatformFilter {
    /// Value of the search endpoint's `entity` parameter.
    pub fn entity(self) -> &'static str {
        match self {
            PlatformFilter::Default => "software",
            PlatformFilter::Mac => "macSoftware",
            PlatformFilter::Tablet => "iPadSoftware",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            PlatformFilter::Default => "iOS",
            PlatformFilter::Mac => "macOS",
            PlatformFilter::Tablet => "iPadOS",
        }
    }

    /// Command-line flag selecting this filter, if any.
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "-mac" => Some(PlatformFilter::Mac),
            "-ipad" => Some(PlatformFilter::Tablet),
            _ => None,
        }
    }
}

/// Whether a hit with this `kind` and device list belongs under `filter`.
///
/// Mac-only hits belong to `Mac` and nothing else. Everything else belongs to
/// `Default`, and to `Tablet` when it declares a tablet device or no device
/// list at all.
pub fn belongs_to(filter: PlatformFilter, kind: AppKind, supported_devices: &[String]) -> bool {
    let mac_only = kind.is_mac_only();
    match filter {
        PlatformFilter::Default => !mac_only,
        PlatformFilter::Mac => mac_only,
        PlatformFilter::Tablet => {
            !mac_only
                && (supported_devices.is_empty()
                    || supported_devices.iter().any(|d| d.contains(TABLET_FAMILY)))
        }
    }
}

/// Keep only the hits belonging to `filter`, preserving search-engine order.
pub fn filter_candidates(candidates: Vec<AppCandidate>, filter: PlatformFilter) -> Vec<AppCandidate> {
    candidates
        .into_iter()
        .filter(|c| belongs_to(filter, c.kind, &c.supported_devices))
        .collect()
}
