//! Interactive search session: paged candidate list plus the browse state machine.
//!
//! `Searching → Browsing ⇄ RegionSelect ⇄ Detail`; closing removes the session
//! from the store, so there is no `Closed` variant to hold.

use crate::domain::entities::{AppCandidate, PriceReport};
use crate::domain::errors::SessionError;
use crate::domain::platform::PlatformFilter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| SessionError::NotFound(s.to_string()))
    }
}

/// Page size and page cap for candidate lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub per_page: usize,
    pub max_pages: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            per_page: 5,
            max_pages: 10,
        }
    }
}

/// `ceil(results / per_page)` capped at `max_pages`; 1 for an empty list.
pub fn total_pages(results: usize, limits: PageLimits) -> usize {
    if results == 0 || limits.per_page == 0 {
        return 1;
    }
    results.div_ceil(limits.per_page).min(limits.max_pages.max(1))
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Candidate list being fetched.
    Searching,
    /// Candidate list shown at `current_page`.
    Browsing,
    /// Region picker shown.
    RegionSelect,
    /// Price report of one app shown.
    Detail { report: PriceReport },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Searching => "searching",
            SessionState::Browsing => "browsing",
            SessionState::RegionSelect => "selecting a region",
            SessionState::Detail { .. } => "showing app details",
        }
    }
}

/// User action against a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Pick the candidate at a page-relative index.
    Select { index: usize },
    /// Jump to a 1-based page.
    Page { page: usize },
    ShowRegionPicker,
    /// Re-run the search in a single region.
    ChangeRegion { region: String },
    BackToResults,
    NewSearch,
    Close,
}

impl SessionAction {
    pub fn name(&self) -> &'static str {
        match self {
            SessionAction::Select { .. } => "select",
            SessionAction::Page { .. } => "page",
            SessionAction::ShowRegionPicker => "change region",
            SessionAction::ChangeRegion { .. } => "region",
            SessionAction::BackToResults => "back to results",
            SessionAction::NewSearch => "new search",
            SessionAction::Close => "close",
        }
    }
}

/// An action addressed to a session by a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub session_id: SessionId,
    pub user_id: i64,
    pub action: SessionAction,
}

/// Candidate list of one search run.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults {
    pub query: String,
    /// Region the search ran in (upper-case code).
    pub region: String,
    pub platform: PlatformFilter,
    /// Search-engine order preserved.
    pub all_results: Vec<AppCandidate>,
    pub current_page: usize,
    pub per_page: usize,
    pub total_pages: usize,
    /// Set when the search request itself failed.
    pub error: Option<String>,
}

impl SearchResults {
    pub fn new(
        query: String,
        region: String,
        platform: PlatformFilter,
        all_results: Vec<AppCandidate>,
        error: Option<String>,
        limits: PageLimits,
    ) -> Self {
        let total_pages = total_pages(all_results.len(), limits);
        Self {
            query,
            region,
            platform,
            all_results,
            current_page: 1,
            per_page: limits.per_page,
            total_pages,
            error,
        }
    }

    /// Candidates visible on the current page.
    pub fn page_slice(&self) -> &[AppCandidate] {
        let start = (self.current_page - 1).saturating_mul(self.per_page);
        let end = start.saturating_add(self.per_page).min(self.all_results.len());
        self.all_results.get(start..end).unwrap_or(&[])
    }
}

#[derive(Debug, Clone)]
pub struct SearchSession {
    pub id: SessionId,
    pub owner: i64,
    pub chat_id: i64,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    /// Explicit regions from the query; overrides the default region set.
    pub user_regions: Option<Vec<String>>,
    pub search: SearchResults,
    pub state: SessionState,
}

impl SearchSession {
    pub fn new(owner: i64, chat_id: i64, user_regions: Option<Vec<String>>, search: SearchResults) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            owner,
            chat_id,
            created_at: now,
            last_active: now,
            user_regions,
            search,
            state: SessionState::Searching,
        }
    }

    pub fn ensure_owner(&self, user_id: i64) -> Result<(), SessionError> {
        if self.owner == user_id {
            Ok(())
        } else {
            Err(SessionError::NotOwner {
                session_id: self.id.to_string(),
            })
        }
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    fn require(
        &self,
        action: &SessionAction,
        allowed: impl Fn(&SessionState) -> bool,
    ) -> Result<(), SessionError> {
        if allowed(&self.state) {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                action: action.name(),
                state: self.state.name(),
            })
        }
    }

    /// Replace the candidate list with a fresh search run and show page 1.
    pub fn load_results(&mut self, search: SearchResults) {
        self.search = search;
        self.state = SessionState::Browsing;
    }

    /// Move to page `page` (1-based). Out-of-range pages leave the session untouched.
    pub fn go_to_page(&mut self, page: usize) -> Result<(), SessionError> {
        self.require(&SessionAction::Page { page }, |s| {
            *s == SessionState::Browsing
        })?;
        if page == 0 || page > self.search.total_pages {
            return Err(SessionError::PageOutOfRange {
                requested: page,
                total: self.search.total_pages,
            });
        }
        self.search.current_page = page;
        Ok(())
    }

    /// Candidate at a page-relative index, while browsing.
    pub fn candidate_at(&self, index: usize) -> Result<&AppCandidate, SessionError> {
        self.require(&SessionAction::Select { index }, |s| {
            *s == SessionState::Browsing
        })?;
        let page = self.search.page_slice();
        page.get(index).ok_or(SessionError::IndexOutOfRange {
            index,
            len: page.len(),
        })
    }

    pub fn show_region_picker(&mut self) -> Result<(), SessionError> {
        self.require(&SessionAction::ShowRegionPicker, |s| {
            matches!(s, SessionState::Browsing | SessionState::Detail { .. })
        })?;
        self.state = SessionState::RegionSelect;
        Ok(())
    }

    /// Check a region change is allowed and mark the session as searching.
    pub fn begin_region_change(&mut self, region: &str) -> Result<(), SessionError> {
        self.require(
            &SessionAction::ChangeRegion {
                region: region.to_string(),
            },
            |s| !matches!(s, SessionState::Searching),
        )?;
        self.state = SessionState::Searching;
        Ok(())
    }

    pub fn back_to_results(&mut self) -> Result<(), SessionError> {
        self.require(&SessionAction::BackToResults, |s| {
            matches!(s, SessionState::RegionSelect | SessionState::Detail { .. })
        })?;
        self.state = SessionState::Browsing;
        Ok(())
    }

    pub fn show_detail(&mut self, report: PriceReport) {
        self.state = SessionState::Detail { report };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::AppKind;

    fn candidates(n: u64) -> Vec<AppCandidate> {
        (1..=n)
            .map(|i| AppCandidate {
                store_id: i,
                name: format!("App {}", i),
                kind: AppKind::Software,
                supported_devices: vec![],
                developer: None,
                formatted_price: None,
            })
            .collect()
    }

    fn browsing(n: u64) -> SearchSession {
        let search = SearchResults::new(
            "app".into(),
            "US".into(),
            PlatformFilter::Default,
            candidates(n),
            None,
            PageLimits::default(),
        );
        let mut s = SearchSession::new(7, 70, None, search.clone());
        s.load_results(search);
        s
    }

    #[test]
    fn test_total_pages() {
        let limits = PageLimits::default();
        assert_eq!(total_pages(0, limits), 1);
        assert_eq!(total_pages(5, limits), 1);
        assert_eq!(total_pages(6, limits), 2);
        assert_eq!(total_pages(200, limits), 10);
    }

    #[test]
    fn test_page_bounds_rejected_without_mutation() {
        let mut s = browsing(12);
        assert_eq!(s.search.total_pages, 3);
        assert_eq!(
            s.go_to_page(0),
            Err(SessionError::PageOutOfRange {
                requested: 0,
                total: 3
            })
        );
        assert!(s.go_to_page(4).is_err());
        assert_eq!(s.search.current_page, 1);

        s.go_to_page(3).unwrap();
        let ids: Vec<u64> = s.search.page_slice().iter().map(|c| c.store_id).collect();
        assert_eq!(ids, vec![11, 12]);
    }

    #[test]
    fn test_candidate_index_is_page_relative() {
        let mut s = browsing(12);
        s.go_to_page(2).unwrap();
        assert_eq!(s.candidate_at(0).unwrap().store_id, 6);
        assert!(matches!(
            s.candidate_at(5),
            Err(SessionError::IndexOutOfRange { index: 5, len: 5 })
        ));
    }

    #[test]
    fn test_transitions_follow_state_machine() {
        let mut s = browsing(3);
        assert!(s.back_to_results().is_err());
        s.show_region_picker().unwrap();
        assert_eq!(s.state, SessionState::RegionSelect);
        assert!(s.go_to_page(1).is_err());
        assert!(s.show_region_picker().is_err());
        s.back_to_results().unwrap();
        assert_eq!(s.state, SessionState::Browsing);
        s.begin_region_change("JP").unwrap();
        assert!(s.begin_region_change("JP").is_err());
    }

    #[test]
    fn test_owner_check() {
        let s = browsing(1);
        assert!(s.ensure_owner(7).is_ok());
        assert!(matches!(
            s.ensure_owner(8),
            Err(SessionError::NotOwner { .. })
        ));
    }

    #[test]
    fn test_session_id_round_trip_and_garbage() {
        let id = SessionId::new();
        assert_eq!(id.to_string().parse::<SessionId>().unwrap(), id);
        assert!(matches!(
            "nope".parse::<SessionId>(),
            Err(SessionError::NotFound(_))
        ));
    }
}
