//! Shared fixtures for end-to-end build tests
//!
//! Measurement files in these tests are plain text. Each line is either
//! `pot <value>` or `pair <run> <subrun>`. The fake merge tool concatenates
//! its inputs, so a merged file reads back as the union of its inputs.

#![allow(dead_code)]

use async_trait::async_trait;
use ntuple_catalogue::adapters::database::SqliteRunDatabase;
use ntuple_catalogue::adapters::merge::{MergeRequest, MergeTool};
use ntuple_catalogue::adapters::reader::{MeasurementReader, TreeInfo};
use ntuple_catalogue::config::{CatalogueConfig, DatabaseConfig, MergeConfig, OutputConfig, WorkflowConfig};
use ntuple_catalogue::core::catalogue::Collaborators;
use ntuple_catalogue::core::merge::space::SpaceProbe;
use ntuple_catalogue::domain::{CatalogueError, Result, RunSubrun, SampleError};
use rusqlite::{params, Connection};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Merge tool that concatenates its inputs into the destination
#[derive(Default)]
pub struct ConcatMergeTool {
    pub calls: AtomicUsize,
}

#[async_trait]
impl MergeTool for ConcatMergeTool {
    async fn merge(&self, request: &MergeRequest) -> std::result::Result<(), SampleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut merged = String::new();
        for input in &request.inputs {
            merged.push_str(&tokio::fs::read_to_string(input).await?);
        }
        tokio::fs::write(&request.destination, merged).await?;
        Ok(())
    }

    fn command_line(&self, request: &MergeRequest) -> Vec<String> {
        let mut line = vec!["concat".to_string(), request.destination.display().to_string()];
        line.extend(request.inputs.iter().map(|p| p.display().to_string()));
        line
    }
}

/// Merge tool that fails for chosen output files and concatenates otherwise
pub struct FailingMergeTool {
    pub failing: Vec<String>,
    pub inner: ConcatMergeTool,
}

impl FailingMergeTool {
    pub fn failing_for(file_names: &[&str]) -> Self {
        Self {
            failing: file_names.iter().map(|n| n.to_string()).collect(),
            inner: ConcatMergeTool::default(),
        }
    }
}

#[async_trait]
impl MergeTool for FailingMergeTool {
    async fn merge(&self, request: &MergeRequest) -> std::result::Result<(), SampleError> {
        let name = request
            .destination
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if self.failing.contains(&name) {
            return Err(SampleError::MergeFailed(format!("exit status 1 for {name}")));
        }
        self.inner.merge(request).await
    }

    fn command_line(&self, request: &MergeRequest) -> Vec<String> {
        self.inner.command_line(request)
    }
}

/// Reader for the text measurement format
pub struct TextReader;

impl TextReader {
    fn read(file: &Path) -> Result<String> {
        fs::read_to_string(file)
            .map_err(|e| CatalogueError::Reader(format!("{}: {}", file.display(), e)))
    }
}

#[async_trait]
impl MeasurementReader for TextReader {
    async fn sum_branch(&self, file: &Path, _tree: &str, _branch: &str) -> Result<f64> {
        Ok(Self::read(file)?
            .lines()
            .filter_map(|l| l.strip_prefix("pot "))
            .filter_map(|v| v.trim().parse::<f64>().ok())
            .sum())
    }

    async fn trees(&self, file: &Path) -> Result<Vec<TreeInfo>> {
        Self::read(file)?;
        Ok(vec![TreeInfo::new("nuselection/SubRun", &["run", "subRun", "pot"])])
    }

    async fn pairs(&self, file: &Path, _tree: &str, _r: &str, _s: &str) -> Result<Vec<RunSubrun>> {
        Ok(Self::read(file)?
            .lines()
            .filter_map(|l| l.strip_prefix("pair "))
            .filter_map(|rest| {
                let (run, subrun) = rest.trim().split_once(' ')?;
                Some(RunSubrun::new(run.parse().ok()?, subrun.parse().ok()?))
            })
            .collect())
    }
}

/// Plenty of scratch space
pub struct AmpleSpace;

impl SpaceProbe for AmpleSpace {
    fn free_bytes(&self, _dir: &Path) -> io::Result<u64> {
        Ok(u64::MAX)
    }
}

/// A scratch area holding stage directories, a workflow document, a run
/// database and the build outputs
pub struct Workspace {
    pub dir: TempDir,
    stages: Vec<String>,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            stages: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn stage_dir(&self, stage: &str) -> PathBuf {
        self.root().join("stages").join(stage)
    }

    pub fn ntuple_dir(&self) -> PathBuf {
        self.root().join("ntuples")
    }

    pub fn catalogue_path(&self) -> PathBuf {
        self.root().join("out").join("samples.json")
    }

    /// Declares a stage and writes its job files
    pub fn stage(&mut self, name: &str, files: &[(&str, &str)]) -> &mut Self {
        let dir = self.stage_dir(name);
        fs::create_dir_all(&dir).unwrap();
        for (file, content) in files {
            fs::write(dir.join(file), content).unwrap();
        }
        self.stages.push(name.to_string());
        self
    }

    /// Writes the workflow document for every declared stage
    pub fn write_workflow(&self) -> PathBuf {
        let mut xml = format!(
            "<?xml version=\"1.0\"?>\n<!DOCTYPE project [\n<!ENTITY base \"{}\">\n]>\n<job>\n<project name=\"test\">\n",
            self.root().join("stages").display()
        );
        for stage in &self.stages {
            xml.push_str(&format!(
                "  <stage name=\"{stage}\">\n    <outdir>&base;/{stage}</outdir>\n  </stage>\n"
            ));
        }
        xml.push_str("</project>\n</job>\n");

        let path = self.root().join("workflow.xml");
        fs::write(&path, xml).unwrap();
        path
    }

    /// Writes a run database with (run, subrun, triggers) rows
    pub fn write_run_db(&self, rows: &[(i64, i64, i64)]) -> PathBuf {
        let path = self.root().join("run.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE runinfo (run INTEGER, subrun INTEGER, EXTTrig INTEGER)")
            .unwrap();
        for (run, subrun, triggers) in rows {
            conn.execute(
                "INSERT INTO runinfo (run, subrun, EXTTrig) VALUES (?1, ?2, ?3)",
                params![run, subrun, triggers],
            )
            .unwrap();
        }
        path
    }

    /// Writes a recipe document with the given beamlines block
    pub fn write_recipe(&self, kind: &str, beamlines: Value) -> PathBuf {
        let recipe = serde_json::json!({
            "role": "recipe",
            "recipe_kind": kind,
            "ntuple_base_directory": self.ntuple_dir(),
            "beamlines": beamlines,
        });
        let path = self.root().join("recipe.json");
        fs::write(&path, serde_json::to_string_pretty(&recipe).unwrap()).unwrap();
        path
    }

    /// Configuration pointing at this workspace
    pub fn config(&self, run_db: PathBuf) -> CatalogueConfig {
        CatalogueConfig {
            workflow: WorkflowConfig {
                documents: vec![self.write_workflow()],
            },
            merge: MergeConfig {
                jobs: 2,
                scratch_dir: self.root().join("scratch"),
                ..Default::default()
            },
            database: DatabaseConfig {
                path: run_db,
                ..Default::default()
            },
            output: OutputConfig {
                catalogue_path: self.catalogue_path(),
            },
            ..Default::default()
        }
    }

    /// Fake collaborators around a real SQLite run database
    pub fn collaborators(&self, config: &CatalogueConfig, merge_tool: Arc<dyn MergeTool>) -> Collaborators {
        Collaborators {
            merge_tool,
            reader: Arc::new(TextReader),
            database: Arc::new(SqliteRunDatabase::new(&config.database)),
            space: Arc::new(AmpleSpace),
        }
    }
}
