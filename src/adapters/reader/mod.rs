//! Measurement file reader
//!
//! Measurement files are ROOT files holding named trees. The catalogue reads
//! three things from them: the sum of one branch of one tree (exposure), the
//! list of trees with their branch names, and the (run, subrun) pairs stored
//! in a tree.
//!
//! [`RootMacroReader`] answers these by running a small macro through the ROOT
//! interpreter in batch mode and parsing its tab-separated stdout.

use crate::config::ReaderConfig;
use crate::domain::{CatalogueError, Result, RunSubrun};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tempfile::TempDir;
use tokio::process::Command;

/// A tree found in a measurement file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeInfo {
    /// Slash-separated path from the file root, e.g. `nuselection/SubRun`
    pub path: String,

    /// Top-level branch names
    pub branches: Vec<String>,
}

impl TreeInfo {
    pub fn new(path: impl Into<String>, branches: &[&str]) -> Self {
        Self {
            path: path.into(),
            branches: branches.iter().map(|b| b.to_string()).collect(),
        }
    }

    /// Actual names of the run and subrun branches, matched case-insensitively
    pub fn run_subrun_branches(&self) -> Option<(&str, &str)> {
        let find = |wanted: &str| {
            self.branches
                .iter()
                .find(|b| b.eq_ignore_ascii_case(wanted))
                .map(String::as_str)
        };
        Some((find("run")?, find("subrun")?))
    }
}

/// Read access to measurement files
#[async_trait]
pub trait MeasurementReader: Send + Sync {
    /// Sum of `branch` over every entry of `tree`
    async fn sum_branch(&self, file: &Path, tree: &str, branch: &str) -> Result<f64>;

    /// Every tree in the file, top level and nested
    async fn trees(&self, file: &Path) -> Result<Vec<TreeInfo>>;

    /// (run, subrun) pairs stored in `tree`, one per entry
    async fn pairs(
        &self,
        file: &Path,
        tree: &str,
        run_branch: &str,
        subrun_branch: &str,
    ) -> Result<Vec<RunSubrun>>;
}

const MACRO_NAME: &str = "catalogue_reader";

const MACRO_SOURCE: &str = r#"#include <TFile.h>
#include <TTree.h>
#include <TKey.h>
#include <TClass.h>
#include <TDirectory.h>
#include <TBranch.h>
#include <cstdio>
#include <string>

static void list_trees(TDirectory* dir, const std::string& prefix) {
  TIter next(dir->GetListOfKeys());
  while (TKey* key = (TKey*)next()) {
    std::string name = prefix.empty() ? key->GetName() : prefix + "/" + key->GetName();
    TClass* cls = TClass::GetClass(key->GetClassName());
    if (!cls) continue;
    if (cls->InheritsFrom(TDirectory::Class())) {
      list_trees((TDirectory*)key->ReadObj(), name);
    } else if (cls->InheritsFrom(TTree::Class())) {
      TTree* t = (TTree*)key->ReadObj();
      printf("TREE\t%s", name.c_str());
      TIter branches(t->GetListOfBranches());
      while (TBranch* b = (TBranch*)branches()) printf("\t%s", b->GetName());
      printf("\n");
    }
  }
}

int catalogue_reader(const char* mode, const char* path, const char* tree,
                     const char* first, const char* second) {
  TFile* f = TFile::Open(path, "READ");
  if (!f || f->IsZombie()) { printf("ERROR\tcannot open file\n"); return 1; }
  std::string m(mode);
  if (m == "trees") {
    list_trees(f, "");
    f->Close();
    printf("STATUS\tok\n");
    return 0;
  }
  TTree* t = nullptr;
  f->GetObject(tree, t);
  if (!t) { printf("ERROR\tno tree %s\n", tree); f->Close(); return 2; }
  t->SetEstimate(t->GetEntries() + 1);
  if (m == "sum") {
    Long64_t n = t->Draw(first, "", "goff");
    if (n < 0) { printf("ERROR\tno branch %s\n", first); f->Close(); return 3; }
    double total = 0;
    for (Long64_t i = 0; i < n; ++i) total += t->GetV1()[i];
    printf("SUM\t%.17g\n", total);
  } else if (m == "pairs") {
    std::string expr = std::string(first) + ":" + second;
    Long64_t n = t->Draw(expr.c_str(), "", "goff");
    if (n < 0) { printf("ERROR\tno branches %s\n", expr.c_str()); f->Close(); return 3; }
    for (Long64_t i = 0; i < n; ++i)
      printf("PAIR\t%lld\t%lld\n", (long long)t->GetV1()[i], (long long)t->GetV2()[i]);
  }
  f->Close();
  printf("STATUS\tok\n");
  return 0;
}
"#;

/// Reader that drives the ROOT interpreter in batch mode
pub struct RootMacroReader {
    executable: String,
    macro_dir: TempDir,
}

impl RootMacroReader {
    /// Writes the reader macro to a private temporary directory
    ///
    /// # Errors
    ///
    /// Returns an error if the macro cannot be written.
    pub fn new(config: &ReaderConfig) -> Result<Self> {
        let macro_dir = tempfile::Builder::new()
            .prefix("ntuple-catalogue-reader")
            .tempdir()?;
        std::fs::write(macro_dir.path().join(format!("{MACRO_NAME}.C")), MACRO_SOURCE)?;
        Ok(Self {
            executable: config.root_executable.clone(),
            macro_dir,
        })
    }

    async fn run(&self, mode: &str, file: &Path, args: [&str; 3]) -> Result<Vec<String>> {
        let file_arg = file.to_string_lossy();
        let invocation = format!(
            "{}/{MACRO_NAME}.C(\"{}\",\"{}\",\"{}\",\"{}\",\"{}\")",
            self.macro_dir.path().display(),
            mode,
            escape(&file_arg),
            escape(args[0]),
            escape(args[1]),
            escape(args[2]),
        );

        let output = Command::new(&self.executable)
            .args(["-l", "-b", "-q"])
            .arg(&invocation)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                CatalogueError::Reader(format!("Failed to run {}: {}", self.executable, e))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_macro_output(&stdout, file)
    }
}

fn escape(arg: &str) -> String {
    arg.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Keeps the tagged lines of macro output and checks the completion marker
fn parse_macro_output(stdout: &str, file: &Path) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    let mut completed = false;
    for line in stdout.lines() {
        if let Some(reason) = line.strip_prefix("ERROR\t") {
            return Err(CatalogueError::Reader(format!(
                "{}: {}",
                file.display(),
                reason
            )));
        }
        if line == "STATUS\tok" {
            completed = true;
        } else if line.starts_with("TREE\t") || line.starts_with("SUM\t") || line.starts_with("PAIR\t") {
            lines.push(line.to_string());
        }
    }
    if !completed {
        return Err(CatalogueError::Reader(format!(
            "{}: reader macro did not complete",
            file.display()
        )));
    }
    Ok(lines)
}

fn parse_trees(lines: &[String]) -> Vec<TreeInfo> {
    let mut trees: Vec<TreeInfo> = Vec::new();
    for line in lines {
        let mut fields = line.split('\t').skip(1);
        let Some(path) = fields.next() else { continue };
        // Keys with several cycles list the same tree more than once
        if trees.iter().any(|t| t.path == path) {
            continue;
        }
        trees.push(TreeInfo {
            path: path.to_string(),
            branches: fields.map(str::to_string).collect(),
        });
    }
    trees
}

fn parse_pairs(lines: &[String]) -> Result<Vec<RunSubrun>> {
    lines
        .iter()
        .filter_map(|l| l.strip_prefix("PAIR\t"))
        .map(|l| {
            let (run, subrun) = l
                .split_once('\t')
                .ok_or_else(|| CatalogueError::Reader(format!("Malformed pair line: {l}")))?;
            let parse = |v: &str| {
                v.trim()
                    .parse::<i64>()
                    .map_err(|e| CatalogueError::Reader(format!("Malformed pair value {v}: {e}")))
            };
            Ok(RunSubrun::new(parse(run)?, parse(subrun)?))
        })
        .collect()
}

fn parse_sum(lines: &[String]) -> Result<f64> {
    let value = lines
        .iter()
        .find_map(|l| l.strip_prefix("SUM\t"))
        .ok_or_else(|| CatalogueError::Reader("Reader macro returned no sum".to_string()))?;
    value
        .trim()
        .parse()
        .map_err(|e| CatalogueError::Reader(format!("Malformed sum {value}: {e}")))
}

#[async_trait]
impl MeasurementReader for RootMacroReader {
    async fn sum_branch(&self, file: &Path, tree: &str, branch: &str) -> Result<f64> {
        let lines = self.run("sum", file, [tree, branch, ""]).await?;
        parse_sum(&lines)
    }

    async fn trees(&self, file: &Path) -> Result<Vec<TreeInfo>> {
        let lines = self.run("trees", file, ["", "", ""]).await?;
        Ok(parse_trees(&lines))
    }

    async fn pairs(
        &self,
        file: &Path,
        tree: &str,
        run_branch: &str,
        subrun_branch: &str,
    ) -> Result<Vec<RunSubrun>> {
        let lines = self
            .run("pairs", file, [tree, run_branch, subrun_branch])
            .await?;
        parse_pairs(&lines)
    }
}
