//! Aggregation of classification results and text/JSON rendering.

use std::fmt::Write as _;

use serde::Serialize;

use crate::loader::slash_path;
use crate::types::{LoadFailure, ResolutionResult, ResolutionStatus};

/// Exit code for a run with no broken or ambiguous links.
pub const EXIT_CLEAN: u8 = 0;

/// Exit code for a run with at least one broken or ambiguous link.
pub const EXIT_BROKEN: u8 = 1;

/// Exit code for a fatal error (bad root, traversal failure).
pub const EXIT_FATAL: u8 = 2;

/// Report rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Machine-readable `ValidationReport` serialization.
    Json,
    /// Human-readable listing and summary.
    Text,
}

/// The outcome of one validation run. Built once from the full result set.
#[derive(Debug, Serialize)]
pub struct ValidationReport {
    /// Broken and ambiguous results, in (source, line, column) order.
    pub broken_links: Vec<ResolutionResult>,
    /// Links with a URI scheme or inside example code, not checked.
    pub external_links: usize,
    /// Files skipped because they could not be decoded.
    pub load_errors: Vec<LoadFailure>,
    /// Links whose target exists.
    pub resolved_links: usize,
    /// Every link classified in this run.
    pub total_links: usize,
}

impl ValidationReport {
    /// Aggregate sorted results. Keeps only failures; the rest are counted.
    pub fn from_results(results: Vec<ResolutionResult>, mut load_errors: Vec<LoadFailure>) -> Self {
        load_errors.sort();
        let total_links = results.len();
        let mut external_links = 0_usize;
        let mut resolved_links = 0_usize;
        let mut broken_links = Vec::new();

        for result in results {
            match result.status {
                ResolutionStatus::Ambiguous | ResolutionStatus::BrokenRelative => broken_links.push(result),
                ResolutionStatus::External => external_links = external_links.saturating_add(1),
                ResolutionStatus::Resolved => resolved_links = resolved_links.saturating_add(1),
            }
        }

        return Self {
            broken_links,
            external_links,
            load_errors,
            resolved_links,
            total_links,
        };
    }

    /// Ambiguous links among the failures.
    fn ambiguous_count(&self) -> usize {
        return self
            .broken_links
            .iter()
            .filter(|r| return r.status == ResolutionStatus::Ambiguous)
            .count();
    }

    /// `EXIT_BROKEN` if any link is broken or ambiguous, else `EXIT_CLEAN`.
    pub fn exit_code(&self) -> u8 {
        if self.broken_links.iter().any(ResolutionResult::is_failure) {
            return EXIT_BROKEN;
        }
        return EXIT_CLEAN;
    }

    /// Render in the requested format, newline-terminated.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if JSON serialization fails.
    pub fn render(&self, format: OutputFormat) -> Result<String, crate::error::Error> {
        return match format {
            OutputFormat::Json => Ok(format!("{}\n", self.render_json()?)),
            OutputFormat::Text => Ok(self.render_text()),
        };
    }

    /// Serialize the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if a path is not valid UTF-8.
    pub fn render_json(&self) -> Result<String, crate::error::Error> {
        return Ok(serde_json::to_string_pretty(self)?);
    }

    /// Render the human-readable report: one line per failure and skipped
    /// file, then a summary line.
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        for result in &self.broken_links {
            let reference = &result.reference;
            let _ = write!(
                out,
                "{:<10} {}:{}  [{}]({})",
                result.status.label(),
                slash_path(&reference.source),
                reference.line,
                reference.label,
                reference.target,
            );
            if result.status == ResolutionStatus::Ambiguous {
                out.push_str("  (warning: matches more than one file)");
            }
            out.push('\n');
        }

        for failure in &self.load_errors {
            let _ = writeln!(out, "{:<10} {}  ({})", "SKIPPED", slash_path(&failure.path), failure.reason);
        }

        if !self.broken_links.is_empty() || !self.load_errors.is_empty() {
            out.push('\n');
        }

        let broken = self.broken_links.len();
        let _ = write!(
            out,
            "Checked {} links: {} resolved, {} external (skipped), {broken} broken",
            self.total_links, self.resolved_links, self.external_links,
        );
        let ambiguous = self.ambiguous_count();
        if ambiguous > 0 {
            let _ = write!(out, " ({ambiguous} ambiguous)");
        }
        out.push('\n');

        return out;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, reason = "test code")]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::types::{LinkKind, LinkReference};

    fn result(line: usize, target: &str, status: ResolutionStatus) -> ResolutionResult {
        let reference = LinkReference {
            column: 3,
            guide_ordinal: None,
            in_code_block: false,
            kind: LinkKind::Inline,
            label: target.trim_end_matches(".md").to_string(),
            line,
            source: PathBuf::from("SKILL.md"),
            target: target.to_string(),
        };
        return match status {
            ResolutionStatus::Resolved => ResolutionResult::resolved(reference, PathBuf::from("/corpus").join(target)),
            ResolutionStatus::Ambiguous | ResolutionStatus::BrokenRelative | ResolutionStatus::External => {
                ResolutionResult::unresolved(reference, status)
            },
        };
    }

    #[test]
    fn counts_each_status() {
        let report = ValidationReport::from_results(
            vec![
                result(1, "core/bar.md", ResolutionStatus::Resolved),
                result(2, "core/foo.md", ResolutionStatus::BrokenRelative),
                result(3, "https://testdino.com", ResolutionStatus::External),
                result(4, "Guide.md", ResolutionStatus::Ambiguous),
            ],
            Vec::new(),
        );
        assert_eq!(report.total_links, 4, "total");
        assert_eq!(report.resolved_links, 1, "resolved");
        assert_eq!(report.external_links, 1, "external");
        assert_eq!(report.broken_links.len(), 2, "broken and ambiguous are listed");
        assert_eq!(report.exit_code(), EXIT_BROKEN, "exit code");
    }

    #[test]
    fn clean_report_exits_zero() {
        let report = ValidationReport::from_results(vec![result(1, "core/bar.md", ResolutionStatus::Resolved)], Vec::new());
        assert_eq!(report.exit_code(), EXIT_CLEAN, "exit code");
        assert_eq!(
            report.render_text(),
            "Checked 1 links: 1 resolved, 0 external (skipped), 0 broken\n",
            "summary only"
        );
    }

    #[test]
    fn text_lists_each_broken_link() {
        let report = ValidationReport::from_results(
            vec![
                result(2, "core/foo.md", ResolutionStatus::BrokenRelative),
                result(4, "Guide.md", ResolutionStatus::Ambiguous),
            ],
            vec![LoadFailure { path: PathBuf::from("core/bad.md"), reason: "not valid UTF-8".to_string() }],
        );
        let text = report.render_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "BROKEN     SKILL.md:2  [core/foo](core/foo.md)", "broken line");
        assert_eq!(
            lines[1],
            "AMBIGUOUS  SKILL.md:4  [Guide](Guide.md)  (warning: matches more than one file)",
            "ambiguous line"
        );
        assert_eq!(lines[2], "SKIPPED    core/bad.md  (not valid UTF-8)", "skipped file");
        assert_eq!(
            lines[4],
            "Checked 2 links: 0 resolved, 0 external (skipped), 2 broken (1 ambiguous)",
            "summary"
        );
    }

    #[test]
    fn json_carries_broken_link_details() {
        let report = ValidationReport::from_results(
            vec![result(2, "core/foo.md", ResolutionStatus::BrokenRelative)],
            Vec::new(),
        );
        let value: serde_json::Value = serde_json::from_str(&report.render_json().unwrap()).unwrap();
        assert_eq!(value["total_links"], 1, "total");
        let broken = &value["broken_links"][0];
        assert_eq!(broken["status"], "broken_relative", "status");
        assert_eq!(broken["reference"]["source"], "SKILL.md", "source");
        assert_eq!(broken["reference"]["target"], "core/foo.md", "target");
        assert_eq!(broken["reference"]["line"], 2, "line");
        assert!(broken.get("resolved_path").is_none(), "no resolved path");
    }
}
