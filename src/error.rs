/// Crate-level error types for validate-docs.
use std::path::PathBuf;

/// Fatal errors that abort a validation run. Per-file decode failures are
/// not errors; they are recorded as `LoadFailure` and the run continues.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// Report serialization failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped serialization error.
        #[from]
        serde_json::Error,
    ),

    /// A link pattern failed to compile.
    #[error("pattern: {0}")]
    Pattern(
        /// The wrapped regex error.
        #[from]
        regex::Error,
    ),

    /// A file could not be read while loading the corpus.
    #[error("read failed: {}: {source}", path.display())]
    Read {
        /// File that failed to read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The corpus root exists but is not a directory.
    #[error("root is not a directory: {}", path.display())]
    RootNotDirectory {
        /// Path given as the corpus root.
        path: PathBuf,
    },

    /// The corpus root does not exist.
    #[error("root directory not found: {}", path.display())]
    RootNotFound {
        /// Path given as the corpus root.
        path: PathBuf,
    },

    /// TOML deserialization of `.validate-docs.toml` failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// Directory traversal failed part-way; a partial report would be misleading.
    #[error("traversal: {0}")]
    Walk(
        /// The wrapped walkdir error.
        #[from]
        walkdir::Error,
    ),

    /// The filesystem watcher could not be set up.
    #[error("watch: {reason}")]
    Watch {
        /// Description of the watcher failure.
        reason: String,
    },
}
