//! Command lines for the external MASST client

use super::Task;
use crate::ClientConfig;
use crate::params::SearchParameters;
use std::path::{Path, PathBuf};

/// Prefix the client writes all of its outputs under, inside the task directory
pub const OUTPUT_PREFIX: &str = "fastMASST";

/// A fully resolved client command line
#[derive(Debug, Clone, PartialEq)]
pub struct ClientInvocation {
    /// Executable to launch
    pub program: String,
    /// Directory the client is run from
    pub working_dir: PathBuf,
    /// Arguments, script first
    pub args: Vec<String>,
}

impl ClientInvocation {
    /// Single query by USI or library accession
    pub fn single(
        client: &ClientConfig,
        task: &Task,
        usi: &str,
        params: &SearchParameters,
    ) -> Self {
        let mut args = vec![
            client.single_script.clone(),
            "--usi_or_lib_id".to_string(),
            usi.to_string(),
            "--out_file".to_string(),
            path_arg(&task.output_prefix()),
        ];
        push_scoring(&mut args, params);
        push_analog_window(&mut args, params);
        args.extend(["--database".to_string(), client.database.clone()]);
        if params.analog {
            args.extend(["--analog".to_string(), "true".to_string()]);
        }

        Self::new(client, args)
    }

    /// Batch query over the spectra of an MGF file
    pub fn batch(
        client: &ClientConfig,
        task: &Task,
        mgf: &Path,
        params: &SearchParameters,
    ) -> Self {
        let mut args = vec![
            client.batch_script.clone(),
            "--in_file".to_string(),
            path_arg(mgf),
            "--out_file".to_string(),
            path_arg(&task.output_prefix()),
            "--parallel_queries".to_string(),
            "1".to_string(),
        ];
        push_scoring(&mut args, params);
        // The batch client parses a Python-style boolean here
        args.extend([
            "--analog".to_string(),
            if params.analog { "True" } else { "False" }.to_string(),
        ]);
        push_analog_window(&mut args, params);
        args.extend(["--database".to_string(), client.database.clone()]);

        Self::new(client, args)
    }

    fn new(client: &ClientConfig, args: Vec<String>) -> Self {
        Self {
            program: client.program.clone(),
            working_dir: client.working_dir.clone(),
            args,
        }
    }

    /// Value following `flag`, if present
    #[cfg(test)]
    pub(crate) fn arg_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    pub fn to_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

fn push_scoring(args: &mut Vec<String>, params: &SearchParameters) {
    args.extend([
        "--precursor_mz_tol".to_string(),
        params.precursor_tolerance.to_string(),
        "--mz_tol".to_string(),
        params.fragment_tolerance.to_string(),
        "--min_cos".to_string(),
        params.cosine_threshold.to_string(),
        "--min_matched_signals".to_string(),
        params.min_matched_peaks.to_string(),
    ]);
}

fn push_analog_window(args: &mut Vec<String>, params: &SearchParameters) {
    args.extend([
        "--analog_mass_below".to_string(),
        params.analog_window.below.to_string(),
        "--analog_mass_above".to_string(),
        params.analog_window.above.to_string(),
    ]);
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
