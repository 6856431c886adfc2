//! Watch mode: validate on startup, then re-validate on corpus changes.

use std::path::Path;
use std::time::Duration;

use notify::{RecursiveMode, Watcher as _};

use crate::commands;
use crate::error;
use crate::report::{EXIT_FATAL, OutputFormat};
use crate::validate::Options;

/// Debounce delay between filesystem events and re-check.
const DEBOUNCE_MS: u64 = 100;

/// Create a filesystem watcher that sends a unit on every content change.
///
/// # Errors
///
/// Returns `Error::Watch` if the watcher cannot be created.
fn create_watcher(
    tx: crossbeam_channel::Sender<()>,
) -> Result<notify::RecommendedWatcher, error::Error> {
    return notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(
                event.kind,
                notify::EventKind::Create(_)
                    | notify::EventKind::Modify(_)
                    | notify::EventKind::Remove(_)
            )
        {
            let _ = tx.send(());
        }
    })
    .map_err(|e| {
        return error::Error::Watch {
            reason: format!("watcher setup failed: {e}"),
        };
    });
}

/// Entry point for `--watch`.
///
/// Runs an initial check, then watches the corpus root recursively and
/// re-checks after each burst of changes. Returns the last run's exit code
/// once the event channel closes.
///
/// # Errors
///
/// Returns a fatal error from the initial run (bad root), or `Error::Watch`
/// if the watcher cannot be set up.
pub fn run(root: &Path, options: Options, format: OutputFormat) -> Result<u8, error::Error> {
    tracing::info!(root = %root.display(), "watch: initial check");
    let mut last_code = commands::check(root, options, format)?;

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(tx)?;
    watcher.watch(root, RecursiveMode::Recursive).map_err(|e| {
        return error::Error::Watch {
            reason: format!("cannot watch {}: {e}", root.display()),
        };
    })?;
    eprintln!("watch: monitoring {}, press Ctrl+C to stop", root.display());

    while rx.recv().is_ok() {
        let debounce = Duration::from_millis(DEBOUNCE_MS);
        while rx.recv_timeout(debounce).is_ok() {}
        eprintln!("watch: change detected, re-checking...");
        last_code = run_check(root, options, format);
    }

    return Ok(last_code);
}

/// Run check once after a change. Fatal errors are printed, not propagated,
/// so a transiently missing root doesn't end the watch.
fn run_check(root: &Path, options: Options, format: OutputFormat) -> u8 {
    return match commands::check(root, options, format) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            EXIT_FATAL
        },
    };
}
