//! Graft Suite Harness Library Module
//!
//! Reusable discovery, execution, and reporting for YAML-based expansion
//! suites. A suite case describes one host request; the harness drives it
//! through the full parse, dispatch, expand, and render pipeline and
//! compares the produced fragments (or the structured failure) against the
//! case's expectation.
//!
//! # Suite Format
//!
//! Suites are YAML files holding a list of cases:
//! ```yaml
//! - name: "echo pairs value and spelling"
//!   request: echo
//!   kind: freestandingExpression
//!   site: "#echo(x + y)"
//!   arguments:
//!     - "x + y"
//!   expected:
//!     - '(x + y, "x + y")'
//!
//! - name: "echo without an argument"
//!   request: echo
//!   kind: freestandingExpression
//!   site: "#echo()"
//!   expect_error_kind: "graft::expand::missing_argument"
//!   skip: false                      # optional, defaults to false
//!   only: false                      # optional, defaults to false
//! ```
//!
//! # Public API
//!
//! - [`run_suite_case`] - Execute a single case against a registry
//! - [`discover_yaml_files`] - Find all suite files in a directory tree
//! - [`load_suite_cases`] - Load and parse the cases of one file
//! - [`run_all_suites`] - Complete run with filtering and reporting

use std::fs;
use std::path::{Path, PathBuf};

use difference::{Changeset, Difference};
use serde::Deserialize;
use walkdir::WalkDir;

use crate::driver::{self, ExpansionRequest};
use crate::errors::{print_error, GraftError};
use crate::registry::{ExpansionKind, Registry, BUILTIN};

// =============================================================================
// CORE TYPES
// =============================================================================

/// Represents the result of executing a single suite case.
#[derive(Debug, Clone)]
pub enum SuiteResult {
    /// Case passed
    Pass { file: String, name: String },
    /// Case failed; `mismatch` carries (expected, actual) text for diffing
    Fail {
        file: String,
        name: String,
        error: String,
        mismatch: Option<(String, String)>,
    },
    /// Case was skipped
    Skipped {
        file: String,
        name: String,
        reason: String,
    },
}

/// Represents a single YAML suite case.
#[derive(Debug, Deserialize, Clone)]
pub struct SuiteCase {
    pub name: String,
    pub request: String,
    pub kind: ExpansionKind,
    pub site: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    pub expected: Option<Vec<String>>,
    pub expect_error: Option<String>,
    pub expect_error_kind: Option<String>,
    #[serde(default)]
    pub skip: bool,
    #[serde(default)]
    pub only: bool,
}

/// Configuration for suite execution and reporting.
pub struct SuiteConfig {
    pub suite_root: String,
    pub use_colors: bool,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            suite_root: "tests/suites".to_string(),
            use_colors: atty::is(atty::Stream::Stderr),
        }
    }
}

// Color constants for terminal output
const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";

impl SuiteConfig {
    /// Apply color formatting to text if colors are enabled.
    pub fn colorize(&self, text: &str, color: &str) -> String {
        if self.use_colors {
            format!("{}{}{}", color, text, RESET)
        } else {
            text.to_string()
        }
    }
}

// =============================================================================
// SUITE DISCOVERY AND LOADING
// =============================================================================

/// Discovers all YAML files recursively under the given root directory.
pub fn discover_yaml_files<P: AsRef<Path>>(root: P) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_type().is_file()
                && e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect()
}

/// Load and parse suite cases from a YAML file.
pub fn load_suite_cases(path: &Path) -> Vec<SuiteCase> {
    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Vec<SuiteCase>>(&content) {
            Ok(cases) => cases,
            Err(e) => {
                eprintln!("Failed to parse YAML in {}: {}", path.display(), e);
                Vec::new()
            }
        },
        Err(e) => {
            eprintln!("Failed to read {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Helper for case skipping logic.
pub fn skip_reason(case: &SuiteCase, has_only: bool, filter: Option<&str>) -> Option<String> {
    if has_only && !case.only {
        return Some("Not marked 'only' in 'only' mode".to_string());
    }
    if case.skip {
        return Some("Marked 'skip'".to_string());
    }
    if let Some(f) = filter {
        if !case.name.to_lowercase().contains(f) {
            return Some(format!("Filtered out by substring: {}", f));
        }
    }
    None
}

// =============================================================================
// CASE EXECUTION
// =============================================================================

/// Execute a single suite case against `registry`.
pub fn run_suite_case(file: String, case: SuiteCase, registry: &Registry) -> SuiteResult {
    let request = ExpansionRequest {
        request_name: case.request.clone(),
        kind: case.kind,
        site: case.site.clone(),
        arguments: case.arguments.clone(),
    };

    match driver::expand(registry, &request) {
        Ok(fragments) => compare_success(fragments, &case, &file),
        Err(error) => compare_failure(error, &case, &file),
    }
}

fn expects_error(case: &SuiteCase) -> bool {
    case.expect_error.is_some() || case.expect_error_kind.is_some()
}

fn compare_success(fragments: Vec<String>, case: &SuiteCase, file: &str) -> SuiteResult {
    if expects_error(case) {
        let expectation = case
            .expect_error_kind
            .as_deref()
            .or(case.expect_error.as_deref())
            .unwrap_or_default();
        return SuiteResult::Fail {
            file: file.to_string(),
            name: case.name.clone(),
            error: format!(
                "Expected error '{}' but expansion produced {} fragment(s)",
                expectation,
                fragments.len()
            ),
            mismatch: None,
        };
    }

    match case.expected.as_ref() {
        Some(expected) if *expected == fragments => SuiteResult::Pass {
            file: file.to_string(),
            name: case.name.clone(),
        },
        Some(expected) => SuiteResult::Fail {
            file: file.to_string(),
            name: case.name.clone(),
            error: "Fragments did not match expected".to_string(),
            mismatch: Some((expected.join("\n"), fragments.join("\n"))),
        },
        // A case with no expectation only asserts that expansion succeeds.
        None => SuiteResult::Pass {
            file: file.to_string(),
            name: case.name.clone(),
        },
    }
}

fn compare_failure(error: GraftError, case: &SuiteCase, file: &str) -> SuiteResult {
    let matches = if let Some(expected_kind) = case.expect_error_kind.as_deref() {
        error.code() == expected_kind
    } else if let Some(expected) = case.expect_error.as_deref() {
        error.to_string().contains(expected)
    } else {
        false
    };

    if matches {
        return SuiteResult::Pass {
            file: file.to_string(),
            name: case.name.clone(),
        };
    }

    let summary = format!("{}: {}", error.code(), error);
    // The rich diagnostic goes to stderr right away; the summary line joins
    // the report at the end of the run.
    print_error(error);
    SuiteResult::Fail {
        file: file.to_string(),
        name: case.name.clone(),
        error: summary,
        mismatch: None,
    }
}

// =============================================================================
// REPORTING AND OUTPUT
// =============================================================================

/// Partition suite results by outcome type.
pub fn partition_results(results: &[SuiteResult]) -> (usize, usize, usize) {
    let passed = results
        .iter()
        .filter(|r| matches!(r, SuiteResult::Pass { .. }))
        .count();
    let failed = results
        .iter()
        .filter(|r| matches!(r, SuiteResult::Fail { .. }))
        .count();
    let skipped = results
        .iter()
        .filter(|r| matches!(r, SuiteResult::Skipped { .. }))
        .count();
    (passed, failed, skipped)
}

/// Print comprehensive suite results with colored output.
pub fn report_results(results: &[SuiteResult], config: &SuiteConfig) {
    let (passed, failed, skipped) = partition_results(results);
    let total = results.len();

    for r in results {
        match r {
            SuiteResult::Pass { file, name } => {
                println!("{}: {} [{}]", config.colorize("PASS", GREEN), name, file)
            }
            SuiteResult::Fail { .. } => print_failure(r, config),
            SuiteResult::Skipped { file, name, reason } => {
                println!(
                    "{}: {} [{}] ({})",
                    config.colorize("SKIP", YELLOW),
                    name,
                    file,
                    reason
                )
            }
        }
    }

    println!(
        "\nSuite summary: total {}, {} {}, {} {}, {} {}",
        total,
        config.colorize("passed", GREEN),
        passed,
        config.colorize("failed", RED),
        failed,
        config.colorize("skipped", YELLOW),
        skipped,
    );

    if failed > 0 {
        eprintln!("\nFailed cases:");
        for r in results {
            if let SuiteResult::Fail { name, .. } = r {
                eprintln!("  - {}", name);
            }
        }
    }
}

/// Print detailed failure information.
pub fn print_failure(r: &SuiteResult, config: &SuiteConfig) {
    if let SuiteResult::Fail {
        file,
        name,
        error,
        mismatch,
    } = r
    {
        eprintln!("{}: {} [{}]", config.colorize("FAIL", RED), name, file);
        eprintln!("  Error: {}", error);
        if let Some((expected, actual)) = mismatch {
            eprintln!("  Diff:");
            print_diff(expected, actual, config);
        }
    }
}

/// Print a line diff between expected and actual fragment text.
pub fn print_diff(expected: &str, actual: &str, config: &SuiteConfig) {
    let changeset = Changeset::new(expected, actual, "\n");
    for diff in &changeset.diffs {
        match diff {
            Difference::Same(block) => {
                for line in block.lines() {
                    eprintln!("    {}", line);
                }
            }
            Difference::Rem(block) => {
                for line in block.lines() {
                    eprintln!("  - expected: {}", config.colorize(line, GREEN));
                }
            }
            Difference::Add(block) => {
                for line in block.lines() {
                    eprintln!("  + actual:   {}", config.colorize(line, RED));
                }
            }
        }
    }
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Run all suites with optional filtering and return summary counts.
pub fn run_all_suites(filter: Option<&str>, config: &SuiteConfig) -> (usize, usize, usize) {
    let yaml_files = discover_yaml_files(&config.suite_root);

    let mut all_cases = Vec::new();
    let mut has_only_cases = false;

    for file_path in &yaml_files {
        let file_name = file_path.display().to_string();
        for case in load_suite_cases(file_path) {
            if case.only {
                has_only_cases = true;
            }
            all_cases.push((file_name.clone(), case));
        }
    }

    let results: Vec<SuiteResult> = all_cases
        .into_iter()
        .map(|(file, case)| {
            if let Some(reason) = skip_reason(&case, has_only_cases, filter) {
                return SuiteResult::Skipped {
                    file,
                    name: case.name,
                    reason,
                };
            }
            run_suite_case(file, case, &BUILTIN)
        })
        .collect();

    report_results(&results, config);
    partition_results(&results)
}
