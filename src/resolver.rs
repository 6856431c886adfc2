//! Reference classification against a filesystem snapshot.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use crate::error::Error;
use crate::types::{Guide, LinkReference, ResolutionResult, ResolutionStatus};

/// Schemes that never take `//`, recognized with a bare `scheme:` prefix.
/// Anything else needs `scheme://` to count as external.
const OPAQUE_SCHEMES: [&str; 6] = ["data", "javascript", "mailto", "sms", "tel", "urn"];

/// Classifies link references. Holds the canonical corpus root and an index
/// of logical guide identifiers: title slugs of split sub-documents and the
/// stems of the files they were split from.
#[derive(Debug)]
pub struct Resolver {
    /// Guide identifier to the files that define it.
    guide_ids: BTreeMap<String, BTreeSet<PathBuf>>,
    /// Canonicalized corpus root.
    root: PathBuf,
}

/// What a case-aware directory lookup found for one path.
#[derive(Debug, PartialEq, Eq)]
enum Lookup {
    /// Several entries match ignoring case, or only a case variant exists.
    Ambiguous,
    /// The exact name exists as a file and nothing else collides with it.
    Exact,
    /// No file by that name in any case.
    Missing,
}

impl Resolver {
    /// Build a resolver for `root`, indexing the sub-document titles and the
    /// file stem of every split file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the root cannot be canonicalized.
    pub fn new(root: &Path, guides: &[Guide]) -> Result<Self, Error> {
        let root = std::fs::canonicalize(root)?;
        let mut guide_ids: BTreeMap<String, BTreeSet<PathBuf>> = BTreeMap::new();

        for guide in guides.iter().filter(|g| return g.ordinal.is_some()) {
            let stem = guide.path.file_stem().map(|s| return s.to_string_lossy());
            let ids = [guide.title.as_deref().map(slugify), stem.as_deref().map(slugify)];
            for id in ids.into_iter().flatten().filter(|id| return !id.is_empty()) {
                guide_ids.entry(id).or_default().insert(normalize_path(&root.join(&guide.path)));
            }
        }

        return Ok(Self { guide_ids, root });
    }

    /// Classify one reference. Performs only directory listings and
    /// existence checks; never reads file contents.
    pub fn classify(&self, reference: LinkReference) -> ResolutionResult {
        if reference.in_code_block || is_external(&reference.target) {
            return ResolutionResult::unresolved(reference, ResolutionStatus::External);
        }

        let path_part = decode_path(reference.path_part());
        if path_part.is_empty() {
            // Same-document anchor; anchors themselves are not validated.
            let own_file = normalize_path(&self.root.join(&reference.source));
            return ResolutionResult::resolved(reference, own_file);
        }

        let candidate = self.candidate_path(&reference.source, &path_part);
        return match lookup_case_aware(&candidate) {
            Lookup::Ambiguous => ResolutionResult::unresolved(reference, ResolutionStatus::Ambiguous),
            Lookup::Exact => ResolutionResult::resolved(reference, candidate),
            Lookup::Missing => self.resolve_guide_id(reference, &path_part),
        };
    }

    /// Join a link path onto the source file's directory, or onto the root
    /// for `/`-prefixed paths, and normalize it.
    fn candidate_path(&self, source: &Path, path_part: &str) -> PathBuf {
        if let Some(rooted) = path_part.strip_prefix('/') {
            return normalize_path(&self.root.join(rooted));
        }
        let source_dir = source.parent().unwrap_or_else(|| return Path::new(""));
        return normalize_path(&self.root.join(source_dir).join(path_part));
    }

    /// Fall back to logical guide identifiers for bare, extensionless names.
    fn resolve_guide_id(&self, reference: LinkReference, path_part: &str) -> ResolutionResult {
        let is_bare = !path_part.contains(['/', '\\']) && Path::new(path_part).extension().is_none();
        if !is_bare {
            return ResolutionResult::unresolved(reference, ResolutionStatus::BrokenRelative);
        }

        let matches = self.guide_ids.get(&slugify(path_part));
        let mut files = matches.into_iter().flatten();
        return match (files.next(), files.next()) {
            (Some(file), None) => {
                let file = file.clone();
                ResolutionResult::resolved(reference, file)
            },
            (Some(_), Some(_)) => ResolutionResult::unresolved(reference, ResolutionStatus::Ambiguous),
            (None, _) => ResolutionResult::unresolved(reference, ResolutionStatus::BrokenRelative),
        };
    }
}

/// Percent-decode a link path (`my%20guide.md`). A sequence that does not
/// decode to UTF-8 is kept as written.
fn decode_path(path_part: &str) -> String {
    return urlencoding::decode(path_part).map_or_else(|_| return path_part.to_string(), Cow::into_owned);
}

/// Whether a target points outside the corpus: `scheme://...`, a
/// protocol-relative `//host/path`, or one of the opaque schemes such as
/// `mailto:`. A colon alone does not make a scheme, so `config.ts:12` and
/// `C:/docs` stay relative.
pub fn is_external(target: &str) -> bool {
    if target.starts_with("//") {
        return true;
    }
    let Some((scheme, rest)) = target.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    let well_formed = chars.next().is_some_and(|c| return c.is_ascii_alphabetic())
        && chars.all(|c| return c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !well_formed {
        return false;
    }
    return (scheme.len() >= 2 && rest.starts_with("//"))
        || OPAQUE_SCHEMES.iter().any(|known| return scheme.eq_ignore_ascii_case(known));
}

/// Look for `path` in its parent directory, comparing names ignoring case.
fn lookup_case_aware(path: &Path) -> Lookup {
    let (Some(name), Some(parent)) = (path.file_name(), path.parent()) else {
        return Lookup::Missing;
    };
    let Ok(entries) = std::fs::read_dir(parent) else {
        return Lookup::Missing;
    };

    let wanted = name.to_string_lossy().to_lowercase();
    let mut exact = false;
    let mut matched = 0_usize;
    for entry in entries.filter_map(Result::ok) {
        let entry_name = entry.file_name();
        if entry_name.to_string_lossy().to_lowercase() != wanted || !entry.path().is_file() {
            continue;
        }
        matched = matched.saturating_add(1);
        exact = exact || entry_name == name;
    }

    return match (matched, exact) {
        (0, _) => Lookup::Missing,
        (1, true) => Lookup::Exact,
        _ => Lookup::Ambiguous,
    };
}

/// Collapse `.` and `..` components in a path without touching the filesystem.
/// Preserves leading `..` when there is nothing left to pop.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        push_normalized_component(&mut components, component);
    }
    return components.iter().collect();
}

/// Handle a single path component during normalization.
/// Pops the last component for `..` when possible, preserves it otherwise.
fn push_normalized_component<'a>(components: &mut Vec<Component<'a>>, component: Component<'a>) {
    match component {
        Component::CurDir => {},
        Component::ParentDir => {
            let can_pop = matches!(
                components.last(),
                Some(Component::Normal(_))
            );
            if can_pop {
                components.pop();
            } else if !matches!(components.last(), Some(Component::RootDir | Component::Prefix(_))) {
                components.push(component);
            }
        },
        Component::Normal(_) | Component::Prefix(_) | Component::RootDir => components.push(component),
    }
}

/// Convert heading text to a lowercase identifier.
/// Lowercase, spaces/non-alphanumeric to hyphens, collapse runs, trim edges.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut result = String::with_capacity(lowered.len());
    let mut prev_hyphen = true; // Start true to trim leading hyphens.

    for c in lowered.chars() {
        if c.is_alphanumeric() {
            result.push(c);
            prev_hyphen = false;
            continue;
        }
        if prev_hyphen {
            continue;
        }
        result.push('-');
        prev_hyphen = true;
    }

    if result.ends_with('-') {
        result.pop();
    }
    return result;
}
