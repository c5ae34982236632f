pub mod banner;
pub mod progress;
pub mod render;
pub mod report_csv;
pub mod tui;

/// Prints the welcome banner and applies the neon theme for all subsequent inquire prompts.
/// Call once at startup, after tracing init.
pub fn init_ui(reference_currency: &str) {
    banner::print_welcome(reference_currency);
    tui::apply_theme();
}
