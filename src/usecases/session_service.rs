//! Interactive search sessions: start from a query, dispatch user actions,
//! sweep idle sessions.
//!
//! The store map is locked only to insert, look up or remove. Each session has
//! its own mutex, held for the whole action, so two rapid actions on one
//! session run one after the other while other sessions proceed.

use crate::domain::query::{ParsedQuery, parse_query};
use crate::domain::regions::{self, REGION_PICKER};
use crate::domain::{
    ActionRequest, AppCandidate, DomainError, PageLimits, PlatformFilter, PriceReport,
    SearchResults, SearchSession, SessionAction, SessionError, SessionId,
};
use crate::usecases::region_aggregator::RegionAggregator;
use crate::usecases::search_service::SearchService;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// Region that resolves direct store ids.
pub const LOOKUP_REGION: &str = "US";
/// Search region when the query names none.
pub const DEFAULT_SEARCH_REGION: &str = "US";

/// Live sessions by id.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<SearchSession>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: SearchSession) -> SessionId {
        let id = session.id;
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
        id
    }

    pub async fn get(&self, id: &SessionId) -> Option<Arc<Mutex<SearchSession>>> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn contains(&self, id: &SessionId) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    pub async fn remove(&self, id: &SessionId) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions idle since before `cutoff`. Sessions busy with an action
    /// are active by definition and kept.
    async fn remove_idle(&self, cutoff: chrono::DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| match session.try_lock() {
            Ok(s) => s.last_active >= cutoff,
            Err(_) => true,
        });
        before - sessions.len()
    }
}

/// One page of a candidate list, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsPage {
    pub session_id: SessionId,
    pub query: String,
    pub region: String,
    pub platform: PlatformFilter,
    pub page: usize,
    pub total_pages: usize,
    pub total_results: usize,
    /// Absolute position of the first candidate shown (0-based).
    pub offset: usize,
    pub candidates: Vec<AppCandidate>,
    pub error: Option<String>,
}

impl ResultsPage {
    fn of(session: &SearchSession) -> Self {
        let search = &session.search;
        Self {
            session_id: session.id,
            query: search.query.clone(),
            region: search.region.clone(),
            platform: search.platform,
            page: search.current_page,
            total_pages: search.total_pages,
            total_results: search.all_results.len(),
            offset: (search.current_page - 1) * search.per_page,
            candidates: search.page_slice().to_vec(),
            error: search.error.clone(),
        }
    }
}

/// Result of starting from a query.
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    /// Direct id: report right away, no session.
    Report(PriceReport),
    /// Free text: a new browsing session.
    Browse(ResultsPage),
}

/// What the presentation layer shows after an action.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Results(ResultsPage),
    RegionPicker {
        session_id: SessionId,
        regions: Vec<&'static str>,
    },
    Report {
        session_id: SessionId,
        report: PriceReport,
    },
    /// Session destroyed; the user starts over.
    NewSearch { session_id: SessionId },
    /// Session destroyed.
    Closed { session_id: SessionId },
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Regions priced when the query names none.
    pub default_regions: Vec<String>,
    pub limits: PageLimits,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_regions: ["CN", "NG", "TR", "IN", "MY", "US"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            limits: PageLimits::default(),
        }
    }
}

pub struct SessionService {
    search: Arc<SearchService>,
    aggregator: Arc<RegionAggregator>,
    store: Arc<SessionStore>,
    settings: SessionSettings,
}

impl SessionService {
    pub fn new(
        search: Arc<SearchService>,
        aggregator: Arc<RegionAggregator>,
        store: Arc<SessionStore>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            search,
            aggregator,
            store,
            settings,
        }
    }

    fn effective_regions(&self, user_regions: Option<&[String]>) -> Vec<String> {
        user_regions
            .filter(|r| !r.is_empty())
            .map(|r| r.to_vec())
            .unwrap_or_else(|| self.settings.default_regions.clone())
    }

    /// Handle a query typed by `user_id` in `chat_id`.
    pub async fn start(
        &self,
        user_id: i64,
        chat_id: i64,
        text: &str,
    ) -> Result<StartOutcome, DomainError> {
        match parse_query(text)? {
            ParsedQuery::ById { store_id, regions } => {
                let app = self
                    .search
                    .lookup(store_id, LOOKUP_REGION)
                    .await?
                    .ok_or_else(|| DomainError::Validation(format!("no app with id {}", store_id)))?;
                let regions = self.effective_regions(regions.as_deref());
                info!(user_id, app_id = store_id, "direct id lookup");
                let report = self
                    .aggregator
                    .build_report(app, PlatformFilter::Default, &regions)
                    .await;
                Ok(StartOutcome::Report(report))
            }
            ParsedQuery::Search {
                term,
                platform,
                regions,
            } => {
                let search_region = regions
                    .as_ref()
                    .and_then(|r| r.first().cloned())
                    .unwrap_or_else(|| DEFAULT_SEARCH_REGION.to_string());
                let outcome = self.search.search(&term, &search_region, platform).await;
                let results = SearchResults::new(
                    term,
                    search_region,
                    platform,
                    outcome.candidates,
                    outcome.error,
                    self.settings.limits,
                );
                let mut session = SearchSession::new(user_id, chat_id, regions, results.clone());
                session.load_results(results);
                let page = ResultsPage::of(&session);
                let id = self.store.insert(session).await;
                info!(
                    user_id,
                    session_id = %id,
                    results = page.total_results,
                    "search session started"
                );
                Ok(StartOutcome::Browse(page))
            }
        }
    }

    /// Apply one action. Precondition failures reject the action and leave
    /// the session as it was.
    pub async fn handle(&self, request: ActionRequest) -> Result<ActionOutcome, DomainError> {
        let id = request.session_id;
        let handle = self
            .store
            .get(&id)
            .await
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        let mut session = handle.lock().await;
        session.ensure_owner(request.user_id)?;
        // Closed by a concurrent action while we waited for the lock.
        if !self.store.contains(&id).await {
            return Err(SessionError::NotFound(id.to_string()).into());
        }
        debug!(session_id = %id, action = request.action.name(), "session action");

        let outcome = match request.action {
            SessionAction::Select { index } => {
                let app = session.candidate_at(index)?.clone();
                let regions = self.effective_regions(session.user_regions.as_deref());
                let report = self
                    .aggregator
                    .build_report(app, session.search.platform, &regions)
                    .await;
                session.show_detail(report.clone());
                ActionOutcome::Report {
                    session_id: id,
                    report,
                }
            }
            SessionAction::Page { page } => {
                session.go_to_page(page)?;
                ActionOutcome::Results(ResultsPage::of(&session))
            }
            SessionAction::ShowRegionPicker => {
                session.show_region_picker()?;
                ActionOutcome::RegionPicker {
                    session_id: id,
                    regions: REGION_PICKER.to_vec(),
                }
            }
            SessionAction::ChangeRegion { region } => {
                let code = regions::resolve_token(&region).ok_or_else(|| {
                    DomainError::Validation(format!("unsupported region '{}'", region))
                })?;
                session.begin_region_change(code)?;
                let query = session.search.query.clone();
                let platform = session.search.platform;
                let outcome = self.search.search(&query, code, platform).await;
                session.load_results(SearchResults::new(
                    query,
                    code.to_string(),
                    platform,
                    outcome.candidates,
                    outcome.error,
                    self.settings.limits,
                ));
                ActionOutcome::Results(ResultsPage::of(&session))
            }
            SessionAction::BackToResults => {
                session.back_to_results()?;
                ActionOutcome::Results(ResultsPage::of(&session))
            }
            SessionAction::NewSearch => {
                self.store.remove(&id).await;
                info!(session_id = %id, "session ended for a new search");
                return Ok(ActionOutcome::NewSearch { session_id: id });
            }
            SessionAction::Close => {
                self.store.remove(&id).await;
                info!(session_id = %id, "session closed");
                return Ok(ActionOutcome::Closed { session_id: id });
            }
        };
        session.touch();
        Ok(outcome)
    }

    /// Remove sessions idle for longer than `max_idle`. Returns how many.
    pub async fn expire_idle(&self, max_idle: Duration) -> usize {
        let max_idle = ChronoDuration::from_std(max_idle).unwrap_or(ChronoDuration::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(max_idle)
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
        let removed = self.store.remove_idle(cutoff).await;
        if removed > 0 {
            info!(removed, "expired idle sessions");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::MemoryCache;
    use crate::domain::{RegionOutcome, SessionState};
    use crate::usecases::region_aggregator::AggregatorSettings;
    use crate::usecases::test_support::{FakePage, FakeStorefront, StaticRates, app, detail_html};

    const OWNER: i64 = 11;
    const CHAT: i64 = 99;

    fn service_with(fake: FakeStorefront) -> (SessionService, Arc<SessionStore>) {
        let fake = Arc::new(fake);
        let store = Arc::new(SessionStore::new());
        let aggregator = Arc::new(RegionAggregator::new(
            fake.clone(),
            Arc::new(MemoryCache::new()),
            Arc::new(StaticRates::new("CNY", &[("USD", 0.125), ("JPY", 20.0)])),
            AggregatorSettings {
                region_timeout: Duration::from_millis(200),
                ..AggregatorSettings::default()
            },
        ));
        let service = SessionService::new(
            Arc::new(SearchService::new(fake, 200)),
            aggregator,
            store.clone(),
            SessionSettings {
                default_regions: vec!["US".into(), "TR".into()],
                limits: PageLimits::default(),
            },
        );
        (service, store)
    }

    fn many_apps(n: u64) -> Vec<AppCandidate> {
        (1..=n).map(|i| app(i, &format!("App {}", i))).collect()
    }

    async fn browse(service: &SessionService, text: &str) -> ResultsPage {
        match service.start(OWNER, CHAT, text).await.unwrap() {
            StartOutcome::Browse(page) => page,
            other => panic!("expected a browsing session, got {:?}", other),
        }
    }

    fn act(session_id: SessionId, action: SessionAction) -> ActionRequest {
        ActionRequest {
            session_id,
            user_id: OWNER,
            action,
        }
    }

    #[tokio::test]
    async fn test_search_starts_browsing_session() {
        let (service, store) =
            service_with(FakeStorefront::new().with_hits(Some("software"), many_apps(12)));
        let page = browse(&service, "notes").await;
        assert_eq!(page.region, "US");
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_results, 12);
        assert_eq!(page.candidates.len(), 5);
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn test_search_runs_in_first_named_region() {
        let fake = FakeStorefront::new().with_hits(Some("software"), many_apps(1));
        let (service, _) = service_with(fake);
        let page = browse(&service, "notes jp tr").await;
        assert_eq!(page.region, "JP");
    }

    #[tokio::test]
    async fn test_paging_and_bounds() {
        let (service, store) =
            service_with(FakeStorefront::new().with_hits(Some("software"), many_apps(12)));
        let page = browse(&service, "notes").await;
        let id = page.session_id;

        let outcome = service.handle(act(id, SessionAction::Page { page: 3 })).await.unwrap();
        let ActionOutcome::Results(page) = outcome else {
            panic!("expected results");
        };
        assert_eq!(page.offset, 10);
        assert_eq!(page.candidates.len(), 2);

        for bad in [0, 4] {
            let err = service
                .handle(act(id, SessionAction::Page { page: bad }))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                DomainError::Session(SessionError::PageOutOfRange { .. })
            ));
        }
        let session = store.get(&id).await.unwrap();
        assert_eq!(session.lock().await.search.current_page, 3);
    }

    #[tokio::test]
    async fn test_non_owner_is_rejected_without_change() {
        let (service, store) =
            service_with(FakeStorefront::new().with_hits(Some("software"), many_apps(12)));
        let id = browse(&service, "notes").await.session_id;

        let err = service
            .handle(ActionRequest {
                session_id: id,
                user_id: OWNER + 1,
                action: SessionAction::Page { page: 2 },
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Session(SessionError::NotOwner { .. })
        ));

        let err = service
            .handle(ActionRequest {
                session_id: id,
                user_id: OWNER + 1,
                action: SessionAction::Close,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Session(SessionError::NotOwner { .. })));

        let session = store.get(&id).await.unwrap();
        let session = session.lock().await;
        assert_eq!(session.search.current_page, 1);
        assert_eq!(session.state, SessionState::Browsing);
    }

    #[tokio::test]
    async fn test_unknown_session_is_rejected() {
        let (service, _) = service_with(FakeStorefront::new());
        let err = service
            .handle(act(SessionId::new(), SessionAction::Close))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Session(SessionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_select_builds_report_over_default_regions() {
        let fake = FakeStorefront::new()
            .with_hits(Some("software"), many_apps(7))
            .with_page("US", FakePage::Html(detail_html(1.0, "USD", &[])))
            .with_page("TR", FakePage::NotFound);
        let (service, store) = service_with(fake);
        let id = browse(&service, "notes").await.session_id;
        service.handle(act(id, SessionAction::Page { page: 2 })).await.unwrap();

        let outcome = service
            .handle(act(id, SessionAction::Select { index: 1 }))
            .await
            .unwrap();
        let ActionOutcome::Report { report, .. } = outcome else {
            panic!("expected report");
        };
        assert_eq!(report.app.store_id, 7);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].region_code, "US");
        assert_eq!(report.records[1].outcome, RegionOutcome::NotListed);

        let session = store.get(&id).await.unwrap();
        assert!(matches!(
            session.lock().await.state,
            SessionState::Detail { .. }
        ));
        // Paging is not allowed from the detail view.
        assert!(service.handle(act(id, SessionAction::Page { page: 1 })).await.is_err());
        service.handle(act(id, SessionAction::BackToResults)).await.unwrap();
        service.handle(act(id, SessionAction::Page { page: 1 })).await.unwrap();
    }

    #[tokio::test]
    async fn test_region_change_reruns_search() {
        let fake = FakeStorefront::new().with_hits(Some("software"), many_apps(12));
        let (service, _) = service_with(fake);
        let id = browse(&service, "notes").await.session_id;
        service.handle(act(id, SessionAction::Page { page: 2 })).await.unwrap();

        let outcome = service
            .handle(act(id, SessionAction::ShowRegionPicker))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ActionOutcome::RegionPicker {
                session_id: id,
                regions: vec!["CN", "HK", "TW", "JP", "GB"],
            }
        );

        let err = service
            .handle(act(id, SessionAction::ChangeRegion { region: "Atlantis".into() }))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let outcome = service
            .handle(act(id, SessionAction::ChangeRegion { region: "jp".into() }))
            .await
            .unwrap();
        let ActionOutcome::Results(page) = outcome else {
            panic!("expected results");
        };
        assert_eq!(page.region, "JP");
        assert_eq!(page.page, 1);
    }

    #[tokio::test]
    async fn test_close_and_new_search_destroy_session() {
        let fake = FakeStorefront::new().with_hits(Some("software"), many_apps(3));
        let (service, store) = service_with(fake);
        let a = browse(&service, "notes").await.session_id;
        let b = browse(&service, "notes").await.session_id;

        assert_eq!(
            service.handle(act(a, SessionAction::Close)).await.unwrap(),
            ActionOutcome::Closed { session_id: a }
        );
        assert_eq!(
            service.handle(act(b, SessionAction::NewSearch)).await.unwrap(),
            ActionOutcome::NewSearch { session_id: b }
        );
        assert_eq!(store.count().await, 0);
        assert!(service.handle(act(a, SessionAction::Close)).await.is_err());
    }

    #[tokio::test]
    async fn test_direct_id_reports_without_session() {
        let fake = FakeStorefront::new()
            .with_lookup(app(42, "Direct"))
            .with_page("JP", FakePage::Html(detail_html(200.0, "JPY", &[])));
        let (service, store) = service_with(fake);

        let outcome = service.start(OWNER, CHAT, "id42 japan").await.unwrap();
        let StartOutcome::Report(report) = outcome else {
            panic!("expected report");
        };
        assert_eq!(report.app.name, "Direct");
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].prices().unwrap().base.converted, Some(10.0));
        assert_eq!(store.count().await, 0);

        let err = service.start(OWNER, CHAT, "id7").await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_expire_idle() {
        let fake = FakeStorefront::new().with_hits(Some("software"), many_apps(1));
        let (service, store) = service_with(fake);
        browse(&service, "notes").await;
        assert_eq!(service.expire_idle(Duration::from_secs(600)).await, 0);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(service.expire_idle(Duration::from_millis(5)).await, 1);
        assert_eq!(store.count().await, 0);
    }
}
