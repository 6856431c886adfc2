//! Link extraction: inline links, images, and reference-style definitions.

use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, LinkType, Options, Parser, Tag, TagEnd};
use regex::{Captures, Regex};

use crate::error::Error;
use crate::types::{Guide, LinkKind, LinkReference};

/// Reference definition `[label]: target` inside example code.
/// Footnotes (`[^1]:`) excluded.
const DEFINITION_PATTERN: &str = r"^ {0,3}\[([^\]^][^\]]*)\]:\s*(<[^<>]*>|\S+)";

/// Inline `[label](target "title")` and `![alt](target)` inside example code.
/// Labels may contain one level of nested brackets; targets may be
/// `<angle bracketed>` or contain balanced parentheses.
const INLINE_PATTERN: &str = r#"(!?)\[((?:[^\[\]]|\[[^\[\]]*\])*)\]\(\s*(<[^<>\n]*>|[^\s()<>]*(?:\([^\s()]*\)[^\s()]*)*)(?:\s+(?:"[^"]*"|'[^']*'|\([^()]*\)))?\s*\)"#;

/// Patterns for links written inside fenced code blocks, which the markdown
/// parser reports as plain text. Built once per run and shared across workers.
#[derive(Debug)]
pub struct LinkPatterns {
    /// Reference-style definition matcher, anchored at line start.
    definition: Regex,
    /// Inline link and image matcher.
    inline: Regex,
}

impl LinkPatterns {
    /// Compile the link patterns.
    ///
    /// # Errors
    ///
    /// Returns `Error::Pattern` if a pattern fails to compile.
    pub fn compile() -> Result<Self, Error> {
        return Ok(Self {
            definition: Regex::new(DEFINITION_PATTERN)?,
            inline: Regex::new(INLINE_PATTERN)?,
        });
    }
}

/// Byte offset to file line and column for one guide.
struct LineIndex {
    /// Lines before the guide's first line.
    line_offset: usize,
    /// Byte offset of each line start in the guide text.
    starts: Vec<usize>,
}

impl LineIndex {
    /// Index the line starts of `guide`.
    fn new(guide: &Guide) -> Self {
        let mut starts = vec![0];
        starts.extend(
            guide
                .raw_text
                .match_indices('\n')
                .map(|(idx, _)| return idx.saturating_add(1)),
        );
        return Self {
            line_offset: guide.line_offset,
            starts,
        };
    }

    /// One-based (file line, byte column) of a byte offset.
    fn position(&self, offset: usize) -> (usize, usize) {
        let idx = self.starts.partition_point(|start| return *start <= offset).saturating_sub(1);
        let start = self.starts.get(idx).copied().unwrap_or(0);
        let line = self.line_offset.saturating_add(idx).saturating_add(1);
        return (line, offset.saturating_sub(start).saturating_add(1));
    }
}

/// Parser extensions used for every guide. Tables carry most index links;
/// footnotes keep `[^1]:` out of the reference definitions; metadata blocks
/// keep YAML frontmatter from turning into headings.
pub fn markdown_options() -> Options {
    return Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TABLES
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS;
}

/// Extract every link in a guide, in appearance order.
///
/// Inline links and images come from the markdown parser, so code spans and
/// indented code blocks never yield links. Links written inside fenced code
/// blocks are kept but tagged `in_code_block`. Reference-style uses are not
/// counted; their definitions are.
#[allow(clippy::wildcard_enum_match_arm, reason = "only link, code block and text events carry links")]
pub fn extract(guide: &Guide, patterns: &LinkPatterns) -> Vec<LinkReference> {
    let index = LineIndex::new(guide);
    let mut links: Vec<LinkReference> = Vec::new();
    let mut open: Vec<Option<usize>> = Vec::new();
    let mut in_fence = false;

    let mut events = Parser::new_ext(&guide.raw_text, markdown_options()).into_offset_iter();
    for (event, range) in events.by_ref() {
        match event {
            Event::Start(Tag::Link { link_type, dest_url, .. }) => {
                let slot = if link_type == LinkType::Inline {
                    push_reference(&mut links, guide, &index, LinkKind::Inline, &dest_url, range.start)
                } else {
                    None
                };
                open.push(slot);
            },
            Event::Start(Tag::Image { link_type, dest_url, .. }) => {
                let slot = if link_type == LinkType::Inline {
                    push_reference(&mut links, guide, &index, LinkKind::Image, &dest_url, range.start)
                } else {
                    None
                };
                open.push(slot);
            },
            Event::End(TagEnd::Link | TagEnd::Image) => {
                open.pop();
            },
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(_))) => in_fence = true,
            Event::End(TagEnd::CodeBlock) => in_fence = false,
            Event::Text(text) if in_fence => {
                scan_fenced_code(&text, range, guide, &index, patterns, &mut links);
            },
            Event::Text(text) | Event::Code(text) => {
                for slot in open.iter().flatten() {
                    if let Some(link) = links.get_mut(*slot) {
                        link.label.push_str(&text);
                    }
                }
            },
            _ => {},
        }
    }

    let mut definitions: Vec<_> = events.reference_definitions().iter().collect();
    definitions.sort_by_key(|(_, def)| return def.span.start);
    for (label, def) in definitions {
        let start = bracket_start(&guide.raw_text, def.span.start);
        if let Some(slot) = push_reference(&mut links, guide, &index, LinkKind::Definition, &def.dest, start)
            && let Some(link) = links.get_mut(slot)
        {
            link.label = label.to_string();
        }
    }

    for link in &mut links {
        link.label = link.label.trim().to_string();
    }
    links.sort_by_key(|l| return (l.line, l.column));
    return links;
}

/// Offset of the first `[` at or after `from`, which is where a reference
/// definition's label opens.
fn bracket_start(text: &str, from: usize) -> usize {
    return text
        .get(from..)
        .and_then(|rest| return rest.find('['))
        .map_or(from, |idx| return from.saturating_add(idx));
}

/// Push a reference parsed from markdown structure. Returns its slot, or
/// `None` if the target is empty.
fn push_reference(
    links: &mut Vec<LinkReference>,
    guide: &Guide,
    index: &LineIndex,
    kind: LinkKind,
    target: &str,
    offset: usize,
) -> Option<usize> {
    let reference = make_reference(guide, index, kind, String::new(), target, offset, false)?;
    links.push(reference);
    return Some(links.len().saturating_sub(1));
}

/// Scan the text of a fenced code block line by line for link syntax.
fn scan_fenced_code(
    text: &str,
    range: Range<usize>,
    guide: &Guide,
    index: &LineIndex,
    patterns: &LinkPatterns,
    links: &mut Vec<LinkReference>,
) {
    let mut line_start = range.start;
    let code = guide.raw_text.get(range).unwrap_or(text);
    for line in code.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);
        extract_code_line(content, line_start, guide, index, patterns, links);
        line_start = line_start.saturating_add(line.len());
    }
}

/// Extract links from one line of example code: a definition if the line is
/// one, otherwise all inline links and images.
fn extract_code_line(
    line: &str,
    line_start: usize,
    guide: &Guide,
    index: &LineIndex,
    patterns: &LinkPatterns,
    links: &mut Vec<LinkReference>,
) {
    let build = |cap: &Captures<'_>, kind: LinkKind, label: usize, target: usize| {
        let whole = cap.get(0)?;
        let column = match kind {
            LinkKind::Definition => whole.start().saturating_add(whole.as_str().find('[').unwrap_or(0)),
            LinkKind::Image | LinkKind::Inline => whole.start(),
        };
        return make_reference(
            guide,
            index,
            kind,
            cap.get(label)?.as_str().to_string(),
            cap.get(target)?.as_str(),
            line_start.saturating_add(column),
            true,
        );
    };

    if let Some(cap) = patterns.definition.captures(line) {
        links.extend(build(&cap, LinkKind::Definition, 1, 2));
        return;
    }
    for cap in patterns.inline.captures_iter(line) {
        let is_image = cap.get(1).is_some_and(|m| return !m.as_str().is_empty());
        let kind = if is_image { LinkKind::Image } else { LinkKind::Inline };
        links.extend(build(&cap, kind, 2, 3));
    }
}

/// Assemble a reference, unwrapping `<target>` and dropping empty targets.
fn make_reference(
    guide: &Guide,
    index: &LineIndex,
    kind: LinkKind,
    label: String,
    raw_target: &str,
    offset: usize,
    in_code_block: bool,
) -> Option<LinkReference> {
    let target = raw_target
        .strip_prefix('<')
        .and_then(|t| return t.strip_suffix('>'))
        .unwrap_or(raw_target)
        .trim();
    if target.is_empty() {
        return None;
    }

    let (line, column) = index.position(offset);
    return Some(LinkReference {
        column,
        guide_ordinal: guide.ordinal,
        in_code_block,
        kind,
        label,
        line,
        source: guide.path.clone(),
        target: target.to_string(),
    });
}
