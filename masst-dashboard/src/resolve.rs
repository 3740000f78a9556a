//! Result resolution for a task
//!
//! Which document a task shows is decided only by what exists in its
//! output directory, checked in a fixed order:
//! 1. the (analog or plain) microbiome HTML report - search ran and matched
//! 2. the matches table - search ran but nothing matched
//! 3. anything else - the search failed, or the task never existed

use crate::dispatch::{ClientExit, OUTPUT_PREFIX};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const NO_MATCHES_FILE: &str = "success_no_matches_metadata.html";
pub const ERROR_FILE: &str = "error_result.html";

const BUILTIN_NO_MATCHES: &str = include_str!("../html_results/success_no_matches_metadata.html");
const BUILTIN_ERROR: &str = include_str!("../html_results/error_result.html");

/// Which of the three outcomes a task is in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultOutcome {
    /// Path of the client's HTML report
    FullResult(PathBuf),
    NoMatches,
    /// `exit` is the recorded client status, when the task has one
    Error { exit: Option<ClientExit> },
}

impl ResultOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            ResultOutcome::FullResult(_) => "full_result",
            ResultOutcome::NoMatches => "no_matches",
            ResultOutcome::Error { .. } => "error",
        }
    }
}

/// Name of the full report for the given mode
pub fn full_result_file(analog: bool) -> String {
    if analog {
        format!("{OUTPUT_PREFIX}_analog_microbiome.html")
    } else {
        format!("{OUTPUT_PREFIX}_microbiome.html")
    }
}

/// Name of the intermediate matches table
pub fn matches_file() -> String {
    format!("{OUTPUT_PREFIX}_matches.tsv")
}

/// Reduce a task id to a bare file name.
///
/// `"../../etc/passwd"` becomes `"passwd"`; ids with no final component
/// (`""`, `".."`, `"/"`) give `None`.
pub fn sanitize_task_id(task: &str) -> Option<&str> {
    Path::new(task).file_name().and_then(|name| name.to_str())
}

/// Maps task ids to documents under an output root
#[derive(Debug, Clone)]
pub struct ResultResolver {
    output_root: PathBuf,
    no_matches_document: String,
    error_document: String,
}

impl ResultResolver {
    /// Resolver using the built-in no-match and error documents
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            no_matches_document: BUILTIN_NO_MATCHES.to_string(),
            error_document: BUILTIN_ERROR.to_string(),
        }
    }

    /// Replace the fixed documents with copies found in `dir`.
    ///
    /// Either file may be missing, in which case the built-in one stays.
    pub fn with_static_dir(mut self, dir: &Path) -> Self {
        if let Some(doc) = read_override(&dir.join(NO_MATCHES_FILE)) {
            self.no_matches_document = doc;
        }
        if let Some(doc) = read_override(&dir.join(ERROR_FILE)) {
            self.error_document = doc;
        }
        self
    }

    #[cfg(test)]
    pub(crate) fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Directory a task id refers to, after sanitizing
    pub fn task_dir(&self, task: &str) -> Option<PathBuf> {
        sanitize_task_id(task).map(|name| self.output_root.join(name))
    }

    /// Decide the outcome for a task. Reads the filesystem only.
    pub async fn resolve(&self, task: &str, analog: bool) -> ResultOutcome {
        let Some(dir) = self.task_dir(task) else {
            debug!(task, "Task id has no file name component");
            return ResultOutcome::Error { exit: None };
        };

        let report = dir.join(full_result_file(analog));
        if is_file(&report).await {
            return ResultOutcome::FullResult(report);
        }

        if is_file(&dir.join(matches_file())).await {
            return ResultOutcome::NoMatches;
        }

        ResultOutcome::Error {
            exit: ClientExit::read_recorded(&dir).await,
        }
    }

    /// Bytes of the document for an outcome.
    ///
    /// A report that vanished between `resolve` and this read gives the
    /// error document.
    pub async fn document(&self, outcome: &ResultOutcome) -> Vec<u8> {
        match outcome {
            ResultOutcome::FullResult(path) => match tokio::fs::read(path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to read result report");
                    self.error_document.clone().into_bytes()
                }
            },
            ResultOutcome::NoMatches => self.no_matches_document.clone().into_bytes(),
            ResultOutcome::Error { .. } => self.error_document.clone().into_bytes(),
        }
    }

    #[cfg(test)]
    pub(crate) fn error_document(&self) -> &str {
        &self.error_document
    }

    #[cfg(test)]
    pub(crate) fn no_matches_document(&self) -> &str {
        &self.no_matches_document
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

fn read_override(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(doc) => Some(doc),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No document override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn setup() -> (tempfile::TempDir, ResultResolver) {
        let root = tempfile::tempdir().unwrap();
        let resolver = ResultResolver::new(root.path().join("microbemasst"));
        fs::create_dir_all(resolver.output_root()).unwrap();
        (root, resolver)
    }

    fn task_with(resolver: &ResultResolver, task: &str, files: &[&str]) -> PathBuf {
        let dir = resolver.output_root().join(task);
        fs::create_dir_all(&dir).unwrap();
        for file in files {
            fs::write(dir.join(file), format!("<html>{file}</html>")).unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn test_full_result_wins_over_matches() {
        let (_root, resolver) = setup();
        let dir = task_with(
            &resolver,
            "t1",
            &["fastMASST_microbiome.html", "fastMASST_matches.tsv"],
        );
        assert_eq!(
            resolver.resolve("t1", false).await,
            ResultOutcome::FullResult(dir.join("fastMASST_microbiome.html"))
        );
    }

    #[tokio::test]
    async fn test_analog_flag_selects_report() {
        let (_root, resolver) = setup();
        let dir = task_with(&resolver, "t2", &["fastMASST_analog_microbiome.html"]);
        assert_eq!(
            resolver.resolve("t2", true).await,
            ResultOutcome::FullResult(dir.join("fastMASST_analog_microbiome.html"))
        );
        // Plain mode does not pick up the analog report
        assert_eq!(resolver.resolve("t2", false).await, ResultOutcome::Error { exit: None });
    }

    #[tokio::test]
    async fn test_matches_only_is_no_matches() {
        let (_root, resolver) = setup();
        task_with(&resolver, "t3", &["fastMASST_matches.tsv"]);
        assert_eq!(resolver.resolve("t3", false).await, ResultOutcome::NoMatches);
        assert_eq!(resolver.resolve("t3", true).await, ResultOutcome::NoMatches);
    }

    #[tokio::test]
    async fn test_empty_matches_file_is_no_matches() {
        let (_root, resolver) = setup();
        let dir = task_with(&resolver, "t4", &[]);
        fs::write(dir.join("fastMASST_matches.tsv"), "").unwrap();
        assert_eq!(resolver.resolve("t4", false).await, ResultOutcome::NoMatches);
    }

    #[tokio::test]
    async fn test_nothing_is_error() {
        let (_root, resolver) = setup();
        task_with(&resolver, "t5", &["input_spectra.mgf"]);
        assert_eq!(resolver.resolve("t5", false).await, ResultOutcome::Error { exit: None });
        assert_eq!(
            resolver.resolve("never-dispatched", false).await,
            ResultOutcome::Error { exit: None }
        );
    }

    #[tokio::test]
    async fn test_error_carries_recorded_exit() {
        let (_root, resolver) = setup();
        let dir = task_with(&resolver, "t6", &[]);
        fs::write(
            dir.join("dispatch_status.json"),
            r#"{"status":"exited","code":2,"success":false}"#,
        )
        .unwrap();
        assert_eq!(
            resolver.resolve("t6", false).await,
            ResultOutcome::Error {
                exit: Some(ClientExit::Exited {
                    code: Some(2),
                    success: false
                })
            }
        );
    }

    #[tokio::test]
    async fn test_path_traversal_stays_in_root() {
        let (root, resolver) = setup();
        // A report planted outside the output root must not be reachable
        let outside = root.path().join("escape");
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("fastMASST_microbiome.html"), "secret").unwrap();

        assert_eq!(sanitize_task_id("../../etc/passwd"), Some("passwd"));
        assert_eq!(
            resolver.task_dir("../../etc/passwd"),
            Some(resolver.output_root().join("passwd"))
        );
        assert_eq!(
            resolver.resolve("../../etc/passwd", false).await,
            ResultOutcome::Error { exit: None }
        );
        assert_eq!(resolver.resolve("../escape", false).await, ResultOutcome::Error { exit: None });
        assert_eq!(resolver.resolve("..", false).await, ResultOutcome::Error { exit: None });
        assert_eq!(resolver.resolve("", false).await, ResultOutcome::Error { exit: None });
    }

    #[tokio::test]
    async fn test_directory_named_like_report_is_ignored() {
        let (_root, resolver) = setup();
        let dir = task_with(&resolver, "t9", &["fastMASST_matches.tsv"]);
        fs::create_dir_all(dir.join("fastMASST_microbiome.html")).unwrap();
        assert_eq!(resolver.resolve("t9", false).await, ResultOutcome::NoMatches);
    }

    #[tokio::test]
    async fn test_resolve_is_repeatable() {
        let (_root, resolver) = setup();
        task_with(&resolver, "t7", &["fastMASST_matches.tsv"]);
        let first = resolver.resolve("t7", false).await;
        let second = resolver.resolve("t7", false).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_documents() {
        let (_root, resolver) = setup();
        let dir = task_with(&resolver, "t8", &["fastMASST_microbiome.html"]);

        let report = resolver.resolve("t8", false).await;
        assert_eq!(resolver.document(&report).await, b"<html>fastMASST_microbiome.html</html>");

        let no_matches = resolver.document(&ResultOutcome::NoMatches).await;
        assert_eq!(no_matches, BUILTIN_NO_MATCHES.as_bytes());

        fs::remove_file(dir.join("fastMASST_microbiome.html")).unwrap();
        assert_eq!(resolver.document(&report).await, BUILTIN_ERROR.as_bytes());
    }

    #[test]
    fn test_static_dir_overrides() {
        let (root, resolver) = setup();
        let static_dir = root.path().join("html_results");
        fs::create_dir_all(&static_dir).unwrap();
        fs::write(static_dir.join(ERROR_FILE), "custom error").unwrap();

        let resolver = resolver.with_static_dir(&static_dir);
        assert_eq!(resolver.error_document(), "custom error");
        assert_eq!(resolver.no_matches_document(), BUILTIN_NO_MATCHES);
    }
}
