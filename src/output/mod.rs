//! Run summary formatting
//!
//! Text output for humans reading the CI log, JSON for anything consuming
//! the run result downstream.

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::cli::OutputFormat;
use crate::orchestrator::OrchestratorResult;
use std::io::Write;

/// Renders a finished run to a writer
pub trait OutputFormatter {
    fn render(
        &self,
        result: &OrchestratorResult,
        writer: &mut dyn Write,
    ) -> std::io::Result<()>;
}

/// Picks the formatter for the requested format
pub fn create_formatter(format: OutputFormat, dry_run: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(dry_run)),
        OutputFormat::Json => Box::new(JsonFormatter::new(dry_run)),
    }
}
