use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn validate_docs(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_validate-docs"))
        .arg(root)
        .args(args)
        .env_remove("CI")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn clean_corpus_exits_zero() {
    let out = validate_docs(&fixture("clean"), &[]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(
        stdout(&out),
        "Checked 8 links: 6 resolved, 2 external (skipped), 0 broken\n",
        "clean summary"
    );
}

#[test]
fn broken_link_is_listed_and_exits_one() {
    let out = validate_docs(&fixture("broken"), &["--format=text"]);
    assert_eq!(out.status.code(), Some(1), "broken corpus exits 1");
    let text = stdout(&out);
    assert!(text.contains("BROKEN     SKILL.md:3  [foo](core/foo.md)"), "got: {text}");
    assert!(text.ends_with("Checked 2 links: 0 resolved, 1 external (skipped), 1 broken\n"), "got: {text}");
    assert!(!text.contains("testdino"), "external links are never reported as broken");
}

#[test]
fn json_report_for_ci() {
    let out = validate_docs(&fixture("broken"), &["--format", "json"]);
    assert_eq!(out.status.code(), Some(1), "broken corpus exits 1");
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["total_links"], 2, "total");
    assert_eq!(report["external_links"], 1, "external");
    let broken = report["broken_links"].as_array().unwrap();
    assert_eq!(broken.len(), 1, "one broken link");
    assert_eq!(broken[0]["reference"]["source"], "SKILL.md", "source");
    assert_eq!(broken[0]["reference"]["target"], "core/foo.md", "target");
    assert_eq!(broken[0]["reference"]["line"], 3, "line");
}

#[test]
fn ci_environment_defaults_to_json() {
    let out = Command::new(env!("CARGO_BIN_EXE_validate-docs"))
        .arg(fixture("clean"))
        .env("CI", "true")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0), "clean corpus exits 0");
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["total_links"], 8, "total");
    assert_eq!(report["broken_links"].as_array().unwrap().len(), 0, "nothing broken");
}

#[test]
fn missing_root_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let out = validate_docs(&dir.path().join("no-such-dir"), &[]);
    assert_eq!(out.status.code(), Some(2), "fatal exit code");
    assert!(out.stdout.is_empty(), "no report on fatal errors");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert_eq!(stderr.lines().count(), 1, "got: {stderr}");
    assert!(stderr.starts_with("error: root directory not found"), "got: {stderr}");
}

#[test]
fn repeated_runs_are_byte_identical() {
    for name in ["clean", "broken"] {
        for format in ["text", "json"] {
            let first = validate_docs(&fixture(name), &["--format", format]);
            let second = validate_docs(&fixture(name), &["--format", format, "--jobs", "1"]);
            assert_eq!(first.stdout, second.stdout, "{name} {format}");
        }
    }
}

#[test]
fn ignore_external_skips_scheme_links() {
    let out = validate_docs(&fixture("clean"), &["--ignore-external"]);
    assert_eq!(out.status.code(), Some(0), "clean corpus exits 0");
    // The code-fence placeholder has no scheme, so it is still counted as external.
    assert_eq!(
        stdout(&out),
        "Checked 7 links: 6 resolved, 1 external (skipped), 0 broken\n",
        "scheme link dropped"
    );
}

#[test]
fn undecodable_file_is_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("SKILL.md"), "[bar](bar.md)\n").unwrap();
    std::fs::write(dir.path().join("bar.md"), "# Bar\n").unwrap();
    std::fs::write(dir.path().join("binary.md"), [0xc3_u8, 0x28, 0xa0]).unwrap();

    let out = validate_docs(dir.path(), &[]);
    assert_eq!(out.status.code(), Some(0), "decode failures are not fatal");
    let text = stdout(&out);
    assert!(text.contains("SKIPPED    binary.md"), "got: {text}");
    assert!(text.ends_with("Checked 1 links: 1 resolved, 0 external (skipped), 0 broken\n"), "got: {text}");
}

fn corpus(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        std::fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

#[test]
fn code_spans_and_indented_code_are_not_checked() {
    let dir = corpus(&[(
        "SKILL.md",
        "Write links as `` `[label](path/to/guide.md)` `` in prose.\n\n    [x](placeholder.md)\n",
    )]);
    let out = validate_docs(dir.path(), &[]);
    assert_eq!(out.status.code(), Some(0), "got: {}", stdout(&out));
    assert_eq!(
        stdout(&out),
        "Checked 0 links: 0 resolved, 0 external (skipped), 0 broken\n",
        "no links outside code"
    );
}

#[test]
fn split_file_stem_is_a_guide_name() {
    let dir = corpus(&[
        ("guides.md", "# Locators\n<!-- guide-separator -->\n# Fixtures\n"),
        ("SKILL.md", "[all guides](guides)\n"),
    ]);
    let out = validate_docs(dir.path(), &[]);
    assert_eq!(out.status.code(), Some(0), "got: {}", stdout(&out));
    assert!(stdout(&out).ends_with("1 resolved, 0 external (skipped), 0 broken\n"), "got: {}", stdout(&out));
}

#[test]
fn colon_in_relative_path_is_still_checked() {
    let dir = corpus(&[("SKILL.md", "[cfg](missing.config.ts:12)\n")]);
    let out = validate_docs(dir.path(), &[]);
    assert_eq!(out.status.code(), Some(1), "got: {}", stdout(&out));
    assert!(
        stdout(&out).contains("BROKEN     SKILL.md:1  [cfg](missing.config.ts:12)"),
        "got: {}",
        stdout(&out)
    );
}

#[test]
fn percent_encoded_space_resolves() {
    let dir = corpus(&[("my guide.md", "# Mine\n"), ("SKILL.md", "[g](my%20guide.md)\n")]);
    let out = validate_docs(dir.path(), &[]);
    assert_eq!(out.status.code(), Some(0), "got: {}", stdout(&out));
    assert!(!stdout(&out).contains("BROKEN"), "got: {}", stdout(&out));
}
