//! Implements InputPort. Inquire-based interactive prompts.
//!
//! Main menu → query prompt → paged candidate list → region picker or price
//! report, driven entirely through `SessionService` actions.

use crate::adapters::ui::{progress, render, report_csv};
use crate::domain::regions;
use crate::domain::{ActionRequest, DomainError, PriceReport, SessionAction, SessionError, SessionId};
use crate::ports::InputPort;
use crate::usecases::{ActionOutcome, CacheAdminService, ResultsPage, SessionService, StartOutcome};
use async_trait::async_trait;
use inquire::error::InquireResult;
use inquire::ui::{Color, RenderConfig, StyleSheet, Styled};
use inquire::{Confirm, InquireError, Select, Text};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Neon prompt theme for all inquire prompts.
pub fn apply_theme() {
    let config = RenderConfig::default()
        .with_prompt_prefix(Styled::new("›").with_fg(Color::LightMagenta))
        .with_highlighted_option_prefix(Styled::new("▸").with_fg(Color::LightCyan))
        .with_selected_option(Some(StyleSheet::new().with_fg(Color::LightCyan)))
        .with_answer(StyleSheet::new().with_fg(Color::LightMagenta));
    inquire::set_global_render_config(config);
}

/// Cancelled prompts (Esc, Ctrl-C) become `None`.
fn answered<T>(result: InquireResult<T>) -> Result<Option<T>, DomainError> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(DomainError::Ui(e.to_string())),
    }
}

fn print_error(e: &DomainError) {
    println!("✗ {}", e);
}

enum MainMenu {
    Search,
    ClearCache,
    Quit,
}

impl fmt::Display for MainMenu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MainMenu::Search => "Look up app prices",
            MainMenu::ClearCache => "Clear price cache (admin)",
            MainMenu::Quit => "Quit",
        })
    }
}

enum ResultsChoice {
    Pick { index: usize, label: String },
    Previous,
    Next,
    ChangeRegion,
    NewSearch,
    Close,
}

impl fmt::Display for ResultsChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultsChoice::Pick { label, .. } => f.write_str(label),
            ResultsChoice::Previous => f.write_str("◀ Previous page"),
            ResultsChoice::Next => f.write_str("Next page ▶"),
            ResultsChoice::ChangeRegion => f.write_str("🌍 Change search region"),
            ResultsChoice::NewSearch => f.write_str("🔍 New search"),
            ResultsChoice::Close => f.write_str("✖ Close"),
        }
    }
}

enum PickerChoice {
    Region(&'static str),
    Back,
}

impl fmt::Display for PickerChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PickerChoice::Region(code) => write!(
                f,
                "{} {} ({})",
                regions::flag(code),
                regions::display_name(code),
                code
            ),
            PickerChoice::Back => f.write_str("◀ Back to results"),
        }
    }
}

enum ReportChoice {
    Back,
    ChangeRegion,
    NewSearch,
    Close,
}

impl fmt::Display for ReportChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReportChoice::Back => "◀ Back to results",
            ReportChoice::ChangeRegion => "🌍 Change search region",
            ReportChoice::NewSearch => "🔍 New search",
            ReportChoice::Close => "✖ Close",
        })
    }
}

/// What the browse loop is showing.
enum View {
    Results(ResultsPage),
    Picker(Vec<&'static str>),
    Report,
}

/// How a browse loop ended.
enum BrowseEnd {
    NewSearch,
    Closed,
}

/// TUI adapter. Inquire prompts.
pub struct TuiInputPort {
    sessions: Arc<SessionService>,
    cache_admin: Arc<CacheAdminService>,
    user_id: i64,
    chat_id: i64,
    reports_dir: PathBuf,
}

impl TuiInputPort {
    pub fn new(
        sessions: Arc<SessionService>,
        cache_admin: Arc<CacheAdminService>,
        user_id: i64,
        reports_dir: PathBuf,
    ) -> Self {
        Self {
            sessions,
            cache_admin,
            user_id,
            // A terminal is a private chat with its operator.
            chat_id: user_id,
            reports_dir,
        }
    }

    /// Prompt for queries until the user backs out to the main menu.
    async fn search_flow(&self) -> Result<(), DomainError> {
        loop {
            let Some(text) = answered(
                Text::new("App name or id:")
                    .with_help_message("e.g. WhatsApp us tr -ipad, or id310633997 jp")
                    .prompt(),
            )?
            else {
                return Ok(());
            };

            let bar = progress::spinner("Searching...");
            let started = self.sessions.start(self.user_id, self.chat_id, &text).await;
            bar.finish_and_clear();

            match started {
                Ok(StartOutcome::Report(report)) => {
                    self.show_report(&report)?;
                }
                Ok(StartOutcome::Browse(page)) => match self.browse(page).await? {
                    BrowseEnd::NewSearch => continue,
                    BrowseEnd::Closed => return Ok(()),
                },
                Err(e) => print_error(&e),
            }
        }
    }

    fn show_report(&self, report: &PriceReport) -> Result<(), DomainError> {
        println!("\n{}\n", render::price_report(report));
        let export = answered(
            Confirm::new("Export this report to CSV?")
                .with_default(false)
                .prompt(),
        )?;
        if export == Some(true) {
            match report_csv::write_report(&self.reports_dir, report) {
                Ok(path) => println!("Saved {}", path.display()),
                Err(e) => print_error(&e),
            }
        }
        Ok(())
    }

    fn results_action(page: &ResultsPage) -> Result<Option<SessionAction>, DomainError> {
        println!("\n{}", render::results_header(page));
        let mut options: Vec<ResultsChoice> = page
            .candidates
            .iter()
            .enumerate()
            .map(|(index, app)| ResultsChoice::Pick {
                index,
                label: render::candidate_label(page.offset + index, app),
            })
            .collect();
        if page.page > 1 {
            options.push(ResultsChoice::Previous);
        }
        if page.page < page.total_pages {
            options.push(ResultsChoice::Next);
        }
        options.extend([
            ResultsChoice::ChangeRegion,
            ResultsChoice::NewSearch,
            ResultsChoice::Close,
        ]);

        let choice = answered(Select::new("Choose an app:", options).with_page_size(10).prompt())?;
        Ok(Some(match choice {
            None | Some(ResultsChoice::Close) => SessionAction::Close,
            Some(ResultsChoice::Pick { index, .. }) => SessionAction::Select { index },
            Some(ResultsChoice::Previous) => SessionAction::Page {
                page: page.page - 1,
            },
            Some(ResultsChoice::Next) => SessionAction::Page {
                page: page.page + 1,
            },
            Some(ResultsChoice::ChangeRegion) => SessionAction::ShowRegionPicker,
            Some(ResultsChoice::NewSearch) => SessionAction::NewSearch,
        }))
    }

    fn picker_action(codes: &[&'static str]) -> Result<SessionAction, DomainError> {
        let mut options: Vec<PickerChoice> = codes.iter().map(|c| PickerChoice::Region(c)).collect();
        options.push(PickerChoice::Back);
        let choice = answered(Select::new("Search in region:", options).prompt())?;
        Ok(match choice {
            Some(PickerChoice::Region(code)) => SessionAction::ChangeRegion {
                region: code.to_string(),
            },
            None | Some(PickerChoice::Back) => SessionAction::BackToResults,
        })
    }

    fn report_action() -> Result<SessionAction, DomainError> {
        let options = vec![
            ReportChoice::Back,
            ReportChoice::ChangeRegion,
            ReportChoice::NewSearch,
            ReportChoice::Close,
        ];
        let choice = answered(Select::new("Next:", options).prompt())?;
        Ok(match choice {
            Some(ReportChoice::Back) => SessionAction::BackToResults,
            Some(ReportChoice::ChangeRegion) => SessionAction::ShowRegionPicker,
            Some(ReportChoice::NewSearch) => SessionAction::NewSearch,
            None | Some(ReportChoice::Close) => SessionAction::Close,
        })
    }

    /// Drive one session until it is closed or replaced by a new search.
    async fn browse(&self, first: ResultsPage) -> Result<BrowseEnd, DomainError> {
        let session_id: SessionId = first.session_id;
        let mut view = View::Results(first);

        loop {
            let action = match &view {
                View::Results(page) => Self::results_action(page)?.unwrap_or(SessionAction::Close),
                View::Picker(codes) => Self::picker_action(codes)?,
                View::Report => Self::report_action()?,
            };
            debug!(session_id = %session_id, action = action.name(), "tui action");

            let bar = matches!(
                action,
                SessionAction::Select { .. } | SessionAction::ChangeRegion { .. }
            )
            .then(|| progress::spinner("Fetching prices..."));
            let result = self
                .sessions
                .handle(ActionRequest {
                    session_id,
                    user_id: self.user_id,
                    action,
                })
                .await;
            if let Some(bar) = bar {
                bar.finish_and_clear();
            }

            match result {
                Ok(ActionOutcome::Results(page)) => view = View::Results(page),
                Ok(ActionOutcome::RegionPicker { regions, .. }) => view = View::Picker(regions),
                Ok(ActionOutcome::Report { report, .. }) => {
                    self.show_report(&report)?;
                    view = View::Report;
                }
                Ok(ActionOutcome::NewSearch { .. }) => return Ok(BrowseEnd::NewSearch),
                Ok(ActionOutcome::Closed { .. }) => return Ok(BrowseEnd::Closed),
                Err(DomainError::Session(SessionError::NotFound(id))) => {
                    print_error(&SessionError::NotFound(id).into());
                    return Ok(BrowseEnd::Closed);
                }
                Err(e) => print_error(&e),
            }
        }
    }

    async fn clear_cache(&self) {
        match self.cache_admin.clear_price_cache(self.user_id).await {
            Ok(removed) => println!("Removed {} cached price records.", removed),
            Err(e) => print_error(&e),
        }
    }
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        loop {
            let options = vec![MainMenu::Search, MainMenu::ClearCache, MainMenu::Quit];
            match answered(Select::new("What next?", options).prompt())? {
                Some(MainMenu::Search) => self.search_flow().await?,
                Some(MainMenu::ClearCache) => self.clear_cache().await,
                Some(MainMenu::Quit) | None => return Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_prompt_is_none() {
        let r: InquireResult<u8> = Err(InquireError::OperationCanceled);
        assert_eq!(answered(r).unwrap(), None);
        let r: InquireResult<u8> = Err(InquireError::NotTTY);
        assert!(matches!(answered(r), Err(DomainError::Ui(_))));
    }

    #[test]
    fn test_picker_labels() {
        let label = PickerChoice::Region("JP").to_string();
        assert!(label.ends_with("(JP)"));
        assert_eq!(PickerChoice::Back.to_string(), "◀ Back to results");
    }
}
