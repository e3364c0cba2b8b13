//! Machine-readable summary output

use crate::orchestrator::OrchestratorResult;
use crate::output::OutputFormatter;
use serde::Serialize;
use std::io::Write;

/// JSON document describing a finished run
#[derive(Serialize)]
struct JsonReport<'a> {
    dry_run: bool,
    total: usize,
    succeeded: usize,
    failed: usize,
    results: &'a [crate::domain::result::BuildResult],
    critical_errors: &'a [String],
}

/// JSON formatter
pub struct JsonFormatter {
    dry_run: bool,
}

impl JsonFormatter {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }
}

impl OutputFormatter for JsonFormatter {
    fn render(
        &self,
        result: &OrchestratorResult,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let report = JsonReport {
            dry_run: self.dry_run,
            total: result.summary.total(),
            succeeded: result.summary.succeeded(),
            failed: result.summary.failed(),
            results: result.summary.results(),
            critical_errors: &result.critical_errors,
        };
        let body = serde_json::to_string_pretty(&report)?;
        writeln!(writer, "{}", body)
    }
}
