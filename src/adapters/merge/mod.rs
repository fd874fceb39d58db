//! External merge tool
//!
//! Merging measurement files is delegated to ROOT's `hadd`. The tool runs
//! either as a single stream or, when scratch space allows, with several
//! worker processes writing partial results to a scratch directory.

use crate::domain::SampleError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// How the merge tool should run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeStrategy {
    /// One process, no scratch files
    SingleStream,

    /// Several worker processes sharing a scratch directory
    MultiWorker { jobs: usize, scratch_dir: PathBuf },
}

/// One merge invocation
#[derive(Debug, Clone)]
pub struct MergeRequest {
    /// Input files, in discovery order
    pub inputs: Vec<PathBuf>,

    /// Output file, overwritten if present
    pub destination: PathBuf,

    pub strategy: MergeStrategy,
}

/// Something that can combine input files into one output file
#[async_trait]
pub trait MergeTool: Send + Sync {
    /// Runs the merge to completion
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::MergeToolMissing`] if the tool is unavailable
    /// and [`SampleError::MergeFailed`] if it exits unsuccessfully.
    async fn merge(&self, request: &MergeRequest) -> Result<(), SampleError>;

    /// Full command line for a request, for logging
    fn command_line(&self, request: &MergeRequest) -> Vec<String>;
}

/// `hadd` invoked as a child process
#[derive(Debug, Clone)]
pub struct HaddMergeTool {
    executable: String,
    dry_run: bool,
}

impl HaddMergeTool {
    pub fn new(executable: impl Into<String>, dry_run: bool) -> Self {
        Self {
            executable: executable.into(),
            dry_run,
        }
    }

    fn arguments(request: &MergeRequest) -> Vec<String> {
        let mut args = vec!["-f".to_string()];
        if let MergeStrategy::MultiWorker { jobs, scratch_dir } = &request.strategy {
            args.push("-j".to_string());
            args.push(jobs.to_string());
            args.push("-d".to_string());
            args.push(scratch_dir.display().to_string());
        }
        args.push(request.destination.display().to_string());
        args.extend(request.inputs.iter().map(|p| p.display().to_string()));
        args
    }

    fn locate(&self) -> Result<PathBuf, SampleError> {
        which::which(&self.executable).map_err(|_| {
            tracing::error!(
                executable = %self.executable,
                "Merge executable not found. Set up the ROOT environment (source thisroot.sh) first"
            );
            SampleError::MergeToolMissing(self.executable.clone())
        })
    }
}

#[async_trait]
impl MergeTool for HaddMergeTool {
    async fn merge(&self, request: &MergeRequest) -> Result<(), SampleError> {
        let command = self.command_line(request).join(" ");
        if self.dry_run {
            tracing::info!(command = %command, "[DRY RUN] Skipping merge");
            return Ok(());
        }

        let program = self.locate()?;
        tracing::info!(command = %command, "Running merge");

        let status = Command::new(program)
            .args(Self::arguments(request))
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|e| SampleError::MergeFailed(format!("{}: {}", self.executable, e)))?;

        if !status.success() {
            return Err(SampleError::MergeFailed(format!(
                "{} exited with {} while writing {}",
                self.executable,
                status,
                request.destination.display()
            )));
        }
        Ok(())
    }

    fn command_line(&self, request: &MergeRequest) -> Vec<String> {
        let mut line = vec![self.executable.clone()];
        line.extend(Self::arguments(request));
        line
    }
}
