//! One validation run: load, extract, classify in parallel, aggregate.

use std::num::NonZeroUsize;
use std::path::Path;

use crate::config::Config;
use crate::error::Error;
use crate::extractor::{self, LinkPatterns};
use crate::loader;
use crate::report::ValidationReport;
use crate::resolver::{self, Resolver};
use crate::types::{Guide, ResolutionResult};

/// Run-level switches coming from the command line.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Drop links with a URI scheme before classification.
    pub ignore_external: bool,
    /// Worker thread count.
    pub jobs: NonZeroUsize,
}

impl Default for Options {
    /// Classify everything, one worker per available core.
    fn default() -> Self {
        return Self {
            ignore_external: false,
            jobs: std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
        };
    }
}

/// Validate every link in the corpus rooted at `root`.
///
/// # Errors
///
/// Returns `Error::RootNotFound` or `Error::RootNotDirectory` for a bad root,
/// and fatal errors from config loading, corpus traversal, or root
/// canonicalization. Undecodable files are reported, not returned.
pub fn run(root: &Path, options: Options) -> Result<ValidationReport, Error> {
    loader::ensure_root_is_directory(root)?;
    let config = Config::load(root)?;
    let corpus = loader::load(root, &config)?;
    tracing::debug!(
        guides = corpus.guides.len(),
        skipped = corpus.failures.len(),
        "corpus loaded"
    );

    let patterns = LinkPatterns::compile()?;
    let resolver = Resolver::new(root, &corpus.guides)?;
    let ignore_external = options.ignore_external || config.ignore_external;

    let mut results = classify_in_parallel(&corpus.guides, &patterns, &resolver, ignore_external, options.jobs);
    results.sort();

    return Ok(ValidationReport::from_results(results, corpus.failures));
}

/// Extract and classify one guide's links.
fn process_guide(
    guide: &Guide,
    patterns: &LinkPatterns,
    resolver: &Resolver,
    ignore_external: bool,
) -> Vec<ResolutionResult> {
    let results: Vec<ResolutionResult> = extractor::extract(guide, patterns)
        .into_iter()
        .filter(|r| return !(ignore_external && resolver::is_external(&r.target)))
        .map(|r| return resolver.classify(r))
        .collect();
    tracing::debug!(guide = %guide.display_id(), links = results.len(), "classified");
    return results;
}

/// Fan guides out to a fixed pool of scoped workers and gather their results
/// through a single channel. Result order is unspecified; callers sort.
fn classify_in_parallel(
    guides: &[Guide],
    patterns: &LinkPatterns,
    resolver: &Resolver,
    ignore_external: bool,
    jobs: NonZeroUsize,
) -> Vec<ResolutionResult> {
    let (work_tx, work_rx) = crossbeam_channel::unbounded::<&Guide>();
    let (result_tx, result_rx) = crossbeam_channel::unbounded::<Vec<ResolutionResult>>();

    for guide in guides {
        if work_tx.send(guide).is_err() {
            break;
        }
    }
    drop(work_tx);

    let workers = jobs.get().min(guides.len().max(1));
    std::thread::scope(|scope| {
        for _ in 0..workers {
            let work_rx = work_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                for guide in &work_rx {
                    let results = process_guide(guide, patterns, resolver, ignore_external);
                    if result_tx.send(results).is_err() {
                        return;
                    }
                }
            });
        }
    });
    drop(result_tx);

    return result_rx.iter().flatten().collect();
}
