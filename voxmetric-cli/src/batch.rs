//! Process fan-out: one child `run` per subject.

use crate::config::{anchor, Manifest, Subject};
use crate::error::CliError;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

#[derive(Debug, Serialize)]
pub struct SubjectOutcome {
    pub id: String,
    pub config: PathBuf,
    pub exit_code: Option<i32>,
    pub elapsed_ms: u128,
    pub summary: Option<serde_json::Value>,
    pub stderr: Option<String>,
}

impl SubjectOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub processes: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub subjects: Vec<SubjectOutcome>,
}

/// Config paths in a manifest are relative to the manifest file.
fn resolve(manifest_path: &Path, config: &Path) -> PathBuf {
    match manifest_path.parent() {
        Some(dir) => anchor(dir, config),
        None => config.to_path_buf(),
    }
}

fn run_child(exe: &Path, config: &Path, trace: bool, subject: &Subject) -> SubjectOutcome {
    let start = Instant::now();
    let mut cmd = Command::new(exe);
    if trace {
        cmd.arg("--trace");
    }
    cmd.arg("run")
        .arg("--config")
        .arg(config)
        .stdin(Stdio::null());
    tracing::info!(subject = %subject.id, config = %config.display(), "spawning");

    let (exit_code, summary, stderr) = match cmd.output() {
        Ok(output) => {
            let summary = serde_json::from_slice(&output.stdout).ok();
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            (
                output.status.code(),
                summary,
                (!stderr.is_empty()).then_some(stderr),
            )
        }
        Err(err) => (None, None, Some(format!("failed to spawn: {err}"))),
    };
    let outcome = SubjectOutcome {
        id: subject.id.clone(),
        config: config.to_path_buf(),
        exit_code,
        elapsed_ms: start.elapsed().as_millis(),
        summary,
        stderr,
    };
    if outcome.succeeded() {
        tracing::info!(subject = %outcome.id, elapsed_ms = outcome.elapsed_ms as u64, "done");
    } else {
        tracing::warn!(subject = %outcome.id, exit_code = ?outcome.exit_code, "failed");
    }
    outcome
}

/// Runs every subject of `manifest`, at most `processes` at a time.
///
/// Children share nothing; each reads its own inputs and writes its own
/// outputs. A failing subject does not stop the others.
pub fn run_batch(
    manifest_path: &Path,
    manifest: &Manifest,
    processes: usize,
    trace: bool,
) -> Result<BatchReport, CliError> {
    if processes == 0 {
        return Err(CliError::Config("processes must be at least 1".into()));
    }
    let exe = std::env::current_exe()?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(processes)
        .build()
        .map_err(|err| CliError::Pool(err.to_string()))?;
    let subjects: Vec<SubjectOutcome> = pool.install(|| {
        manifest
            .subjects
            .par_iter()
            .map(|subject| {
                let config = resolve(manifest_path, &subject.config);
                run_child(&exe, &config, trace, subject)
            })
            .collect()
    });
    let succeeded = subjects.iter().filter(|s| s.succeeded()).count();
    Ok(BatchReport {
        processes,
        succeeded,
        failed: subjects.len() - succeeded,
        subjects,
    })
}
