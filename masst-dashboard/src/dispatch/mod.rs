//! Search dispatch
//!
//! Each search gets a fresh task directory named by a random id. Peak list
//! searches first write their spectrum into that directory as MGF. The
//! external client is then run to completion with the task directory as its
//! output location. Whether it succeeded is not decided here: the resolver
//! works that out later from the files it left behind.

mod invocation;
mod mgf;

pub use invocation::{ClientInvocation, OUTPUT_PREFIX};
pub use mgf::INPUT_SPECTRA_FILE;

use crate::ClientConfig;
use crate::params::{SearchForm, SearchParameters, SpectrumQuery};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// File recording how the client process ended
pub const DISPATCH_STATUS_FILE: &str = "dispatch_status.json";

/// Path of the results endpoint served by the API
pub const RESULTS_PATH: &str = "/microbiomemasst/results";

/// Errors from dispatching a search
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Failed to create task directory {path}: {source}")]
    TaskDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write input spectrum: {0}")]
    InputSpectrum(#[source] std::io::Error),

    #[error("Search queue closed")]
    QueueClosed,
}

/// Which search button fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchEvent {
    /// "Search microbiomeMASST by USI"
    SearchByIdentifier,
    /// "Search microbiomeMASST by Spectrum Peaks"
    SearchByPeaks,
}

/// Opaque, unguessable task identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// A fresh random (v4 UUID) id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One search's working directory
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    /// Absolute path of `<output_root>/<id>`
    pub output_dir: PathBuf,
    pub analog: bool,
}

impl Task {
    /// Prefix handed to the client as `--out_file`
    pub fn output_prefix(&self) -> PathBuf {
        self.output_dir.join(OUTPUT_PREFIX)
    }

    /// Results endpoint URL for this task
    pub fn results_url(&self) -> String {
        results_url(&self.id, self.analog)
    }
}

/// `/microbiomemasst/results?task=<id>&analog=<True|False>`
pub fn results_url(task: &TaskId, analog: bool) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("task", task.as_str())
        .append_pair("analog", if analog { "True" } else { "False" })
        .finish();
    format!("{RESULTS_PATH}?{query}")
}

/// How the client process ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClientExit {
    Exited { code: Option<i32>, success: bool },
    TimedOut { after_secs: u64 },
    SpawnFailed { message: String },
}

impl ClientExit {
    pub fn is_success(&self) -> bool {
        matches!(self, ClientExit::Exited { success: true, .. })
    }

    /// Read the status recorded in a task directory, if any
    pub async fn read_recorded(task_dir: &Path) -> Option<Self> {
        let contents = tokio::fs::read_to_string(task_dir.join(DISPATCH_STATUS_FILE))
            .await
            .ok()?;
        serde_json::from_str(&contents).ok()
    }
}

/// Outcome of a dispatched search
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub task: Task,
    pub exit: ClientExit,
    pub elapsed: Duration,
}

impl DispatchReport {
    pub fn results_url(&self) -> String {
        self.task.results_url()
    }
}

/// Runs MASST client searches, a bounded number at a time
pub struct Dispatcher {
    client: ClientConfig,
    output_root: PathBuf,
    permits: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new(client: ClientConfig, output_root: impl Into<PathBuf>) -> Self {
        let permits = Arc::new(Semaphore::new(client.max_concurrent_searches.max(1)));
        Self {
            client,
            output_root: output_root.into(),
            permits,
        }
    }

    /// Handle a button press on the search form
    pub async fn dispatch(
        &self,
        event: SearchEvent,
        form: &SearchForm,
    ) -> Result<DispatchReport, DispatchError> {
        self.run_search(SearchParameters::from_form(form, event)).await
    }

    /// Run one search to completion
    pub async fn run_search(
        &self,
        params: SearchParameters,
    ) -> Result<DispatchReport, DispatchError> {
        let task = self.create_task(params.analog).await?;
        let started = Instant::now();

        let exit = match &params.query {
            SpectrumQuery::Usi(usi) => self.search_by_identifier(&task, usi, &params).await?,
            SpectrumQuery::Peaks {
                peaks,
                precursor_mz,
            } => {
                self.search_by_peaks(&task, peaks, precursor_mz, &params)
                    .await?
            }
        };

        record_exit(&task, &exit).await;

        let elapsed = started.elapsed();
        info!(
            task = %task.id,
            analog = task.analog,
            success = exit.is_success(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Search finished"
        );

        Ok(DispatchReport {
            task,
            exit,
            elapsed,
        })
    }

    async fn search_by_identifier(
        &self,
        task: &Task,
        usi: &str,
        params: &SearchParameters,
    ) -> Result<ClientExit, DispatchError> {
        let invocation = ClientInvocation::single(&self.client, task, usi, params);
        self.run_client(task, invocation).await
    }

    async fn search_by_peaks(
        &self,
        task: &Task,
        peaks: &str,
        precursor_mz: &str,
        params: &SearchParameters,
    ) -> Result<ClientExit, DispatchError> {
        let mgf = mgf::write_input_spectrum(&task.output_dir, precursor_mz, peaks)
            .await
            .map_err(DispatchError::InputSpectrum)?;
        let invocation = ClientInvocation::batch(&self.client, task, &mgf, params);
        self.run_client(task, invocation).await
    }

    /// Create `<output_root>/<fresh id>/`
    pub async fn create_task(&self, analog: bool) -> Result<Task, DispatchError> {
        let id = TaskId::generate();
        let dir = self.output_root.join(id.as_str());

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| DispatchError::TaskDirectory {
                path: dir.clone(),
                source,
            })?;
        // The client runs from its own working directory
        let output_dir = tokio::fs::canonicalize(&dir)
            .await
            .map_err(|source| DispatchError::TaskDirectory { path: dir, source })?;

        debug!(task = %id, dir = %output_dir.display(), "Created task directory");
        Ok(Task {
            id,
            output_dir,
            analog,
        })
    }

    async fn run_client(
        &self,
        task: &Task,
        invocation: ClientInvocation,
    ) -> Result<ClientExit, DispatchError> {
        let _permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| DispatchError::QueueClosed)?;

        info!(
            task = %task.id,
            program = invocation.program,
            args = ?invocation.args,
            "Running MASST client"
        );

        let timeout_secs = self.client.search_timeout_secs;
        let mut cmd = invocation.to_command();
        let output = tokio::time::timeout(Duration::from_secs(timeout_secs), cmd.output()).await;

        let exit = match output {
            Ok(Ok(output)) => {
                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    warn!(
                        task = %task.id,
                        code = ?output.status.code(),
                        stderr = %tail(&stderr, 2000),
                        "MASST client exited with failure"
                    );
                }
                ClientExit::Exited {
                    code: output.status.code(),
                    success: output.status.success(),
                }
            }
            Ok(Err(e)) => {
                warn!(task = %task.id, error = %e, "Failed to launch MASST client");
                ClientExit::SpawnFailed {
                    message: e.to_string(),
                }
            }
            Err(_) => {
                // Dropping the output future kills the child
                warn!(task = %task.id, timeout_secs, "MASST client timed out");
                ClientExit::TimedOut {
                    after_secs: timeout_secs,
                }
            }
        };

        Ok(exit)
    }
}

async fn record_exit(task: &Task, exit: &ClientExit) {
    let path = task.output_dir.join(DISPATCH_STATUS_FILE);
    let result = match serde_json::to_vec(exit) {
        Ok(bytes) => tokio::fs::write(&path, bytes).await,
        Err(e) => Err(std::io::Error::other(e)),
    };
    if let Err(e) = result {
        warn!(task = %task.id, error = %e, "Failed to record client exit status");
    }
}

fn tail(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    let skip = count - max_chars;
    let start = text.char_indices().nth(skip).map(|(i, _)| i).unwrap_or(0);
    &text[start..]
}
