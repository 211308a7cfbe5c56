//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - No sleeping: timing runs on deadlines (`sleep_until`) and intervals
//! - No blocking I/O inside async functions
//! - No `unwrap()`/`expect()` in production code
//!
//! The helpers here find the production part of each source file: everything
//! before the file's `#[cfg(test)]` module, with line comments removed.

use std::fs;
use std::path::{Path, PathBuf};

/// Source directories holding production code, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["companion/core/src", "companion/daemon/src", "tui/src"];

/// A line of production code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLine {
    /// 1-based line number
    pub number: usize,
    /// Line with any `//` comment removed
    pub code: String,
}

/// A rule violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// Offending code
    pub code: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.line, self.code.trim())
    }
}

/// Workspace root (two levels above this package)
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// Every `.rs` file under the production directories
#[must_use]
pub fn production_files() -> Vec<PathBuf> {
    let root = workspace_root();
    let mut files = Vec::new();
    for dir in PRODUCTION_DIRS {
        let path = root.join(dir);
        if !path.exists() {
            continue;
        }
        for entry in walkdir::WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.path().extension().and_then(|s| s.to_str()) == Some("rs") {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files
}

/// Production lines of a source text
#[must_use]
pub fn production_lines(source: &str) -> Vec<CodeLine> {
    source
        .lines()
        .take_while(|line| !line.trim_start().starts_with("#[cfg(test)]"))
        .enumerate()
        .map(|(idx, line)| CodeLine {
            number: idx + 1,
            code: strip_comment(line).to_string(),
        })
        .collect()
}

/// Line without its `//` comment
///
/// `://` (URLs in string literals) does not start a comment.
#[must_use]
pub fn strip_comment(line: &str) -> &str {
    let mut search = 0;
    while let Some(found) = line[search..].find("//") {
        let at = search + found;
        if at > 0 && line.as_bytes()[at - 1] == b':' {
            search = at + 2;
            continue;
        }
        return &line[..at];
    }
    line
}

/// Whether `line` declares a function; `Some(true)` for `async fn`
#[must_use]
pub fn fn_header(line: &str) -> Option<bool> {
    let mut rest = line.trim_start();
    for prefix in ["pub(crate) ", "pub(super) ", "pub "] {
        if let Some(stripped) = rest.strip_prefix(prefix) {
            rest = stripped;
            break;
        }
    }
    if rest.starts_with("async fn ") {
        Some(true)
    } else if rest.starts_with("fn ") || rest.starts_with("const fn ") {
        Some(false)
    } else {
        None
    }
}

/// Whether the function enclosing `lines[idx]` is `async`
#[must_use]
pub fn in_async_fn(lines: &[CodeLine], idx: usize) -> bool {
    lines[..=idx]
        .iter()
        .rev()
        .find_map(|line| fn_header(&line.code))
        .unwrap_or(false)
}

/// Scan every production file with `check`
///
/// `check` sees the file's production lines and the index of the line under
/// test and returns whether that line violates the rule.
pub fn scan(check: impl Fn(&Path, &[CodeLine], usize) -> bool) -> Vec<Violation> {
    let mut violations = Vec::new();
    for path in production_files() {
        let Ok(source) = fs::read_to_string(&path) else {
            continue;
        };
        let lines = production_lines(&source);
        for idx in 0..lines.len() {
            if check(&path, &lines, idx) {
                violations.push(Violation {
                    path: path.clone(),
                    line: lines[idx].number,
                    code: lines[idx].code.clone(),
                });
            }
        }
    }
    violations
}

/// Fail with a readable list of violations
pub fn assert_clean(rule: &str, hint: &str, violations: &[Violation]) {
    if violations.is_empty() {
        return;
    }
    eprintln!("\n{rule}:");
    for violation in violations {
        eprintln!("  {violation}");
    }
    eprintln!("\n{hint}");
    panic!("\nFound {} violation(s) of: {rule}", violations.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &[&str]) -> Vec<CodeLine> {
        production_lines(&src.join("\n"))
    }

    #[test]
    fn test_test_module_is_not_production() {
        let parsed = lines(&["fn a() {}", "#[cfg(test)]", "mod tests {}"]);
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_comments_are_stripped_but_urls_kept() {
        assert_eq!(strip_comment("let x = 1; // note"), "let x = 1; ");
        assert_eq!(
            strip_comment(r#"let u = "https://example.com"; // c"#),
            r#"let u = "https://example.com"; "#
        );
    }

    #[test]
    fn test_fn_headers() {
        assert_eq!(fn_header("    pub async fn run(mut self) {"), Some(true));
        assert_eq!(fn_header("fn helper() -> u8 {"), Some(false));
        assert_eq!(fn_header("    pub(crate) const fn new() -> Self {"), Some(false));
        assert_eq!(fn_header("let f = async move {"), None);
    }

    #[test]
    fn test_async_context() {
        let parsed = lines(&[
            "async fn load() {",
            "    let s = std::fs::read_to_string(p);",
            "}",
            "fn sync_load() {",
            "    let s = std::fs::read_to_string(p);",
            "}",
        ]);
        assert!(in_async_fn(&parsed, 1));
        assert!(!in_async_fn(&parsed, 4));
    }

    #[test]
    fn test_sources_are_found() {
        assert!(production_files()
            .iter()
            .any(|p| p.ends_with("companion/core/src/coordinator.rs")));
    }
}
