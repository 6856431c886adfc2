/// Core domain types for guides, link references, and their classification.
use std::path::PathBuf;

use serde::Serialize;

/// One logical documentation unit: a whole markdown file, or one
/// sub-document of a file split on the separator marker.
#[derive(Debug, Clone)]
pub struct Guide {
    /// Number of file lines preceding this guide. Zero for whole-file guides.
    pub line_offset: usize,
    /// Position among sibling sub-documents (1-based), `None` for a whole file.
    pub ordinal: Option<usize>,
    /// Markdown file path relative to the corpus root.
    pub path: PathBuf,
    /// Guide content.
    pub raw_text: String,
    /// Text of the first heading outside code fences.
    pub title: Option<String>,
}

impl Guide {
    /// Identifier shown in reports: `path` or `path@ordinal`.
    pub fn display_id(&self) -> String {
        return match self.ordinal {
            None => self.path.display().to_string(),
            Some(n) => format!("{}@{n}", self.path.display()),
        };
    }
}

/// Which markdown syntax produced a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// Reference-style definition: `[label]: target`.
    Definition,
    /// Image: `![alt](target)`.
    Image,
    /// Inline link: `[label](target)`.
    Inline,
}

/// A single markdown link found inside a guide. Target is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkReference {
    /// One-based byte column of the opening bracket.
    pub column: usize,
    /// Ordinal of the owning guide within its file, if the file was split.
    pub guide_ordinal: Option<usize>,
    /// Whether the link sits inside a fenced code block.
    pub in_code_block: bool,
    /// Syntax that produced the link.
    pub kind: LinkKind,
    /// Display text (or alt text for images).
    pub label: String,
    /// One-based line number in the source file.
    pub line: usize,
    /// Markdown file containing the link, relative to the corpus root.
    pub source: PathBuf,
    /// Raw href as written, including any fragment.
    pub target: String,
}

impl LinkReference {
    /// The portion of the target used for filesystem resolution,
    /// with `#fragment` and `?query` removed.
    pub fn path_part(&self) -> &str {
        let end = self.target.find(['#', '?']).unwrap_or(self.target.len());
        return self.target.get(..end).unwrap_or("");
    }

    /// Sort key: (source, guide ordinal, line, column).
    fn sort_key(&self) -> (&PathBuf, Option<usize>, usize, usize) {
        return (&self.source, self.guide_ordinal, self.line, self.column);
    }
}

impl Ord for LinkReference {
    /// Compare by position in the corpus for deterministic report ordering.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        return self
            .sort_key()
            .cmp(&other.sort_key())
            .then_with(|| return self.target.cmp(&other.target));
    }
}

impl PartialOrd for LinkReference {
    /// Delegate to `Ord` implementation.
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        return Some(self.cmp(other));
    }
}

/// A markdown file excluded from the run because it is not valid text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct LoadFailure {
    /// File that failed to decode, relative to the corpus root.
    pub path: PathBuf,
    /// Why it was skipped.
    pub reason: String,
}

/// Outcome of classifying one reference. `resolved_path` is present
/// exactly when `status` is `Resolved`; use the constructors to keep it so.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    /// The classified reference.
    pub reference: LinkReference,
    /// Normalized absolute path the link points at, for resolved links.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_path: Option<PathBuf>,
    /// Classification outcome.
    pub status: ResolutionStatus,
}

impl ResolutionResult {
    /// A reference that did not resolve to a single file.
    pub fn unresolved(reference: LinkReference, status: ResolutionStatus) -> Self {
        let status = match status {
            ResolutionStatus::Resolved => ResolutionStatus::BrokenRelative,
            ResolutionStatus::Ambiguous | ResolutionStatus::BrokenRelative | ResolutionStatus::External => status,
        };
        return Self { reference, resolved_path: None, status };
    }

    /// A reference that resolved to `path`.
    pub fn resolved(reference: LinkReference, path: PathBuf) -> Self {
        return Self {
            reference,
            resolved_path: Some(path),
            status: ResolutionStatus::Resolved,
        };
    }

    /// Whether this result fails the run.
    pub const fn is_failure(&self) -> bool {
        return matches!(self.status, ResolutionStatus::Ambiguous | ResolutionStatus::BrokenRelative);
    }
}

impl Ord for ResolutionResult {
    /// Order by the underlying reference position.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        return self.reference.cmp(&other.reference);
    }
}

impl PartialOrd for ResolutionResult {
    /// Delegate to `Ord` implementation.
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        return Some(self.cmp(other));
    }
}

/// The four terminal classifications of a link target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// Several candidate files match, e.g. names differing only by case.
    Ambiguous,
    /// Relative target with no matching file or guide identifier.
    BrokenRelative,
    /// URI scheme or example code; never checked.
    External,
    /// Target exists.
    Resolved,
}

impl ResolutionStatus {
    /// Uppercase label used in text reports.
    pub const fn label(self) -> &'static str {
        return match self {
            ResolutionStatus::Ambiguous => "AMBIGUOUS",
            ResolutionStatus::BrokenRelative => "BROKEN",
            ResolutionStatus::External => "EXTERNAL",
            ResolutionStatus::Resolved => "RESOLVED",
        };
    }
}
