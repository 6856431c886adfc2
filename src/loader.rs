//! Corpus loading: enumerate markdown files and split them into guides.

use std::ops::Range;
use std::path::{Path, PathBuf};

use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Error;
use crate::extractor::markdown_options;
use crate::types::{Guide, LoadFailure};

/// Output of one load pass.
#[derive(Debug, Default)]
pub struct LoadedCorpus {
    /// Files skipped because they could not be decoded, sorted by path.
    pub failures: Vec<LoadFailure>,
    /// Guides in lexicographic path order, sub-documents in file order.
    pub guides: Vec<Guide>,
}

/// Load every markdown file under `root` into guides.
/// Applies the config's include/exclude filters to relative paths.
/// The root is expected to be checked with [`ensure_root_is_directory`].
///
/// # Errors
///
/// Returns `Error::Walk` if traversal fails, or `Error::Read` if a file
/// cannot be read. Files that are not valid UTF-8 are recorded as failures,
/// not errors.
pub fn load(root: &Path, config: &Config) -> Result<LoadedCorpus, Error> {
    let mut corpus = LoadedCorpus::default();
    for relative in collect_markdown_files(root, config)? {
        let absolute = root.join(&relative);
        let bytes = std::fs::read(&absolute).map_err(|source| {
            return Error::Read { path: absolute.clone(), source };
        })?;

        match String::from_utf8(bytes) {
            Err(e) => {
                tracing::warn!(path = %relative.display(), error = %e, "skipping file that is not valid UTF-8");
                corpus.failures.push(LoadFailure {
                    path: relative,
                    reason: format!("not valid UTF-8: {e}"),
                });
            },
            Ok(text) => {
                let guides = split_into_guides(&relative, &text, &config.separator);
                tracing::debug!(path = %relative.display(), guides = guides.len(), "loaded");
                corpus.guides.extend(guides);
            },
        }
    }

    return Ok(corpus);
}

/// Walk `root` and return relative paths of markdown files, sorted.
///
/// # Errors
///
/// Returns `Error::Walk` on the first traversal failure.
fn collect_markdown_files(root: &Path, config: &Config) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !is_markdown(path) || !path.is_file() {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        if !config.should_scan(&slash_path(&relative)) {
            tracing::debug!(path = %relative.display(), "excluded by config");
            continue;
        }
        files.push(relative);
    }

    files.sort();
    return Ok(files);
}

/// Fail fast on a missing or non-directory root.
///
/// # Errors
///
/// Returns `Error::RootNotFound`, `Error::RootNotDirectory`, or `Error::Io`.
pub fn ensure_root_is_directory(root: &Path) -> Result<(), Error> {
    return match std::fs::metadata(root) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(Error::RootNotFound { path: root.to_path_buf() })
        },
        Err(e) => Err(Error::Io(e)),
        Ok(meta) if !meta.is_dir() => Err(Error::RootNotDirectory { path: root.to_path_buf() }),
        Ok(_) => Ok(()),
    };
}

/// Markdown by extension: `.md` or `.markdown`, any case.
fn is_markdown(path: &Path) -> bool {
    return path
        .extension()
        .and_then(|e| return e.to_str())
        .is_some_and(|ext| return ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown"));
}

/// Render a relative path with `/` separators for prefix matching.
pub fn slash_path(path: &Path) -> String {
    return path
        .components()
        .map(|c| return c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
}

/// Byte ranges of every code block in `text`, fenced or indented.
fn code_block_spans(text: &str) -> Vec<Range<usize>> {
    return Parser::new_ext(text, markdown_options())
        .into_offset_iter()
        .filter_map(|(event, range)| {
            return matches!(event, Event::Start(Tag::CodeBlock(_))).then_some(range);
        })
        .collect();
}

/// Title of a markdown text: the text of its first non-empty heading.
#[allow(clippy::wildcard_enum_match_arm, reason = "only heading events matter")]
fn first_heading(text: &str) -> Option<String> {
    let mut heading: Option<String> = None;
    for event in Parser::new_ext(text, markdown_options()) {
        match event {
            Event::Start(Tag::Heading { .. }) => heading = Some(String::new()),
            Event::Text(part) | Event::Code(part) => {
                if let Some(title) = heading.as_mut() {
                    title.push_str(&part);
                }
            },
            Event::End(TagEnd::Heading(_)) => {
                let title = heading.take().unwrap_or_default();
                if !title.trim().is_empty() {
                    return Some(title.trim().to_string());
                }
            },
            _ => {},
        }
    }
    return None;
}

/// Split a file into guides on separator lines outside code blocks.
/// A file without separators is one guide; otherwise each non-blank chunk
/// becomes a guide numbered from 1.
pub fn split_into_guides(path: &Path, text: &str, separator: &str) -> Vec<Guide> {
    let code = code_block_spans(text);
    let mut chunks: Vec<(usize, Vec<&str>)> = vec![(0, Vec::new())];
    let mut line_start = 0_usize;

    for (idx, raw_line) in text.split_inclusive('\n').enumerate() {
        let line = raw_line.trim_end_matches(['\n', '\r']);
        let in_code = code.iter().any(|span| return span.contains(&line_start));
        line_start = line_start.saturating_add(raw_line.len());
        if !in_code && line.trim() == separator {
            chunks.push((idx.saturating_add(1), Vec::new()));
            continue;
        }
        if let Some((_, lines)) = chunks.last_mut() {
            lines.push(line);
        }
    }

    if chunks.len() == 1 {
        return vec![Guide {
            line_offset: 0,
            ordinal: None,
            path: path.to_path_buf(),
            raw_text: text.to_string(),
            title: first_heading(text),
        }];
    }

    let mut guides = Vec::new();
    let mut ordinal = 0_usize;
    for (line_offset, lines) in chunks {
        if lines.iter().all(|l| return l.trim().is_empty()) {
            continue;
        }
        ordinal = ordinal.saturating_add(1);
        let raw_text = lines.join("\n");
        guides.push(Guide {
            line_offset,
            ordinal: Some(ordinal),
            path: path.to_path_buf(),
            title: first_heading(&raw_text),
            raw_text,
        });
    }
    return guides;
}
