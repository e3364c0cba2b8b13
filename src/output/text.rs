//! Human-readable summary output

use crate::orchestrator::OrchestratorResult;
use crate::output::OutputFormatter;
use colored::Colorize;
use std::io::Write;

/// Colored per-package report plus aggregate counts
pub struct TextFormatter {
    dry_run: bool,
}

impl TextFormatter {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    fn header(&self) -> String {
        if self.dry_run {
            format!("{} {}", "Update summary".bold(), "(dry-run)".cyan())
        } else {
            "Update summary".bold().to_string()
        }
    }
}

impl OutputFormatter for TextFormatter {
    fn render(
        &self,
        result: &OrchestratorResult,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        writeln!(writer, "\n{}", self.header())?;

        if result.summary.total() == 0 {
            writeln!(writer, "  {}", "nothing to update".dimmed())?;
            return Ok(());
        }

        for r in result.summary.results() {
            let icon = if r.success { "✅" } else { "❌" };
            let versions = match r.new_version {
                Some(ref new) => format!("{} -> {}", r.old_version, new),
                None => r.old_version.clone(),
            };
            writeln!(writer, "{} {} ({})", icon, r.package.bold(), versions)?;
            writeln!(writer, "   {}", r.message)?;
            for action in &r.actions {
                writeln!(writer, "   - {}", action.dimmed())?;
            }
            if let Some(ref error) = r.error {
                writeln!(writer, "   {}", error.red())?;
            }
        }

        writeln!(
            writer,
            "\n{} processed, {} updated, {} failed",
            result.summary.total(),
            result.summary.succeeded().to_string().green(),
            if result.summary.failed() > 0 {
                result.summary.failed().to_string().red().to_string()
            } else {
                "0".to_string()
            }
        )?;

        for critical in &result.critical_errors {
            writeln!(writer, "{} {}", "critical:".red().bold(), critical)?;
        }
        Ok(())
    }
}
