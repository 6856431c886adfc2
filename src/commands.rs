//! CLI command bodies: a single check, and output format selection.

use std::path::Path;

use crate::error;
use crate::report::OutputFormat;
use crate::validate::{self, Options};

/// Validate the corpus once, print the report to stdout, and return the
/// exit code it implies (0 clean, 1 broken/ambiguous).
///
/// # Errors
///
/// Returns fatal errors from validation or report serialization.
pub fn check(root: &Path, options: Options, format: OutputFormat) -> Result<u8, error::Error> {
    let report = validate::run(root, options)?;
    print!("{}", report.render(format)?);
    return Ok(report.exit_code());
}

/// Format used when `--format` is not given: JSON under CI, text otherwise.
pub fn default_format() -> OutputFormat {
    return format_for_ci_value(std::env::var("CI").ok().as_deref());
}

/// Map the value of the `CI` variable to a default format.
fn format_for_ci_value(ci: Option<&str>) -> OutputFormat {
    let under_ci = ci.is_some_and(|v| return v.eq_ignore_ascii_case("true") || v == "1");
    if under_ci {
        return OutputFormat::Json;
    }
    return OutputFormat::Text;
}
