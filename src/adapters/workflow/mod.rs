//! Workflow description resolver
//!
//! Workflow documents are XML job descriptions. Each one declares entities in
//! its DOCTYPE (`<!ENTITY name "text">`) and lists `<stage>` elements under a
//! `<project>` child of the root, each with an `<outdir>` template that may
//! reference entities as `&name;`.
//!
//! Entities are pooled across every document before any template is
//! resolved, so a stage may use an entity declared in a different document.
//! Later declarations of the same entity win. Stage templates are substituted
//! repeatedly until no known reference remains.

use crate::domain::{CatalogueError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const MAX_SUBSTITUTION_PASSES: usize = 32;
const PREDEFINED_ENTITIES: [&str; 5] = ["amp", "lt", "gt", "quot", "apos"];

fn entity_decl_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"<!ENTITY\s+([^\s%]+)\s+"([^"]*)"\s*>"#).expect("entity pattern is valid")
    })
}

fn entity_ref_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"&([A-Za-z_][A-Za-z0-9._-]*);").expect("entity reference pattern is valid")
    })
}

fn doctype_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)<!DOCTYPE[^\[>]*(?:\[.*?\])?\s*>").expect("doctype pattern is valid")
    })
}

/// A stage as written in a workflow document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRecord {
    /// Stage name attribute
    pub name: String,
    /// Raw `<outdir>` text, entity references intact
    pub outdir_template: String,
}

/// Entities and stages parsed from one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDocument {
    /// Entity declarations in document order
    pub entities: Vec<(String, String)>,
    /// Stage records in document order
    pub stages: Vec<StageRecord>,
}

/// Resolved stage output directories
///
/// Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowContext {
    entities: HashMap<String, String>,
    stage_outdirs: BTreeMap<String, PathBuf>,
}

impl WorkflowContext {
    /// Builds a context from explicit stage directories
    pub fn from_stage_outdirs<I, S, P>(stages: I) -> Self
    where
        I: IntoIterator<Item = (S, P)>,
        S: Into<String>,
        P: Into<PathBuf>,
    {
        Self {
            entities: HashMap::new(),
            stage_outdirs: stages
                .into_iter()
                .map(|(s, p)| (s.into(), p.into()))
                .collect(),
        }
    }

    /// Output directory for a stage, if the stage was resolved
    pub fn outdir(&self, stage_name: &str) -> Option<&Path> {
        self.stage_outdirs.get(stage_name).map(PathBuf::as_path)
    }

    /// Number of resolved stages
    pub fn stage_count(&self) -> usize {
        self.stage_outdirs.len()
    }

    /// Value of an entity, if declared in any document
    pub fn entity(&self, name: &str) -> Option<&str> {
        self.entities.get(name).map(String::as_str)
    }

    /// Resolved stage names in sorted order
    pub fn stage_names(&self) -> impl Iterator<Item = &str> {
        self.stage_outdirs.keys().map(String::as_str)
    }
}

/// Reads and resolves workflow documents in order
///
/// Unreadable or unrecognizable documents are logged and skipped.
pub fn load_workflow_context(paths: &[PathBuf]) -> WorkflowContext {
    let mut parsed = Vec::with_capacity(paths.len());
    for path in paths {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(
                    document = %path.display(),
                    error = %e,
                    "Could not read workflow document"
                );
                continue;
            }
        };
        match parse_document(&text) {
            Ok(doc) => parsed.push(doc),
            Err(e) => {
                tracing::error!(document = %path.display(), error = %e, "Skipping workflow document");
            }
        }
    }

    let context = resolve(&parsed);
    tracing::info!(
        documents = paths.len(),
        stages = context.stage_count(),
        "Resolved workflow stage directories"
    );
    context
}

/// Parses entity declarations and stage records from one document
///
/// # Errors
///
/// Returns [`CatalogueError::Workflow`] if the document is not well-formed XML
/// or has no `<project>` element under its root.
pub fn parse_document(text: &str) -> Result<ParsedDocument> {
    let entities = entity_decl_pattern()
        .captures_iter(text)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect();

    // Entity references may point at declarations in other documents, which
    // the XML parser cannot see. Drop the DTD and keep references as literal
    // text so they survive parsing and can be substituted afterwards.
    let body = doctype_pattern().replace(text, "");
    let body = entity_ref_pattern().replace_all(&body, |c: &Captures| {
        if PREDEFINED_ENTITIES.contains(&&c[1]) {
            c[0].to_string()
        } else {
            format!("&amp;{};", &c[1])
        }
    });

    let mut reader = Reader::from_str(&body);
    reader.config_mut().trim_text(true);

    // Element names from the root down to the current element
    let mut path: Vec<String> = Vec::new();
    let mut project_seen = false;
    let mut in_project = false;
    let mut stage: Option<StageBuilder> = None;
    let mut stages = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| malformed(reader.buffer_position(), e))?;
        match event {
            Event::Start(e) => {
                let tag = tag_name(&e);
                open_element(&tag, &e, &path, &mut project_seen, &mut in_project, &mut stage)?;
                path.push(tag);
            }
            Event::Empty(e) => {
                let tag = tag_name(&e);
                open_element(&tag, &e, &path, &mut project_seen, &mut in_project, &mut stage)?;
                close_element(&tag, path.len(), &mut in_project, &mut stage, &mut stages);
            }
            Event::End(_) => {
                if let Some(tag) = path.pop() {
                    close_element(&tag, path.len(), &mut in_project, &mut stage, &mut stages);
                }
            }
            Event::Text(t) if in_outdir(&path, in_project) => {
                let text = t
                    .unescape()
                    .map_err(|e| malformed(reader.buffer_position(), e))?;
                if let Some(builder) = stage.as_mut().filter(|b| b.capturing) {
                    builder.outdir.push_str(&text);
                }
            }
            Event::CData(t) if in_outdir(&path, in_project) => {
                if let Some(builder) = stage.as_mut().filter(|b| b.capturing) {
                    builder.outdir.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !project_seen {
        return Err(CatalogueError::Workflow(
            "Could not find <project> in workflow XML".to_string(),
        ));
    }

    Ok(ParsedDocument { entities, stages })
}

/// A `<stage>` being read
struct StageBuilder {
    name: Option<String>,
    outdir: String,
    outdir_seen: bool,
    capturing: bool,
}

fn malformed(position: impl std::fmt::Display, err: impl std::fmt::Display) -> CatalogueError {
    CatalogueError::Workflow(format!("Malformed workflow XML at byte {position}: {err}"))
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

/// Depths: root element 0, `<project>` 1, `<stage>` 2, `<outdir>` 3
fn in_outdir(path: &[String], in_project: bool) -> bool {
    in_project && path.len() == 4 && path[2] == "stage" && path[3] == "outdir"
}

fn open_element(
    tag: &str,
    e: &BytesStart<'_>,
    path: &[String],
    project_seen: &mut bool,
    in_project: &mut bool,
    stage: &mut Option<StageBuilder>,
) -> Result<()> {
    match (path.len(), tag) {
        (1, "project") if !*project_seen => {
            *project_seen = true;
            *in_project = true;
        }
        (2, "stage") if *in_project => {
            let name = match e.try_get_attribute("name") {
                Ok(Some(attr)) => Some(
                    attr.unescape_value()
                        .map_err(|err| malformed("<stage name>", err))?
                        .into_owned(),
                ),
                Ok(None) => None,
                Err(err) => return Err(malformed("<stage>", err)),
            };
            *stage = Some(StageBuilder {
                name,
                outdir: String::new(),
                outdir_seen: false,
                capturing: false,
            });
        }
        (3, "outdir") if *in_project => {
            if let Some(builder) = stage.as_mut() {
                // Only the first <outdir> of a stage counts
                builder.capturing = !builder.outdir_seen;
                builder.outdir_seen = true;
            }
        }
        _ => {}
    }
    Ok(())
}

/// `depth` is the depth of the element being closed
fn close_element(
    tag: &str,
    depth: usize,
    in_project: &mut bool,
    stage: &mut Option<StageBuilder>,
    stages: &mut Vec<StageRecord>,
) {
    if !*in_project {
        return;
    }
    match (depth, tag) {
        (1, "project") => *in_project = false,
        (2, "stage") => {
            let Some(builder) = stage.take() else {
                return;
            };
            let Some(name) = builder.name else {
                tracing::warn!("Skipping <stage> without a name attribute");
                return;
            };
            stages.push(StageRecord {
                name,
                outdir_template: builder.outdir.trim().to_string(),
            });
        }
        (3, "outdir") => {
            if let Some(builder) = stage.as_mut() {
                builder.capturing = false;
            }
        }
        _ => {}
    }
}

/// Pools entities across documents and resolves every stage template
pub fn resolve(documents: &[ParsedDocument]) -> WorkflowContext {
    let entities: HashMap<String, String> = documents
        .iter()
        .flat_map(|d| d.entities.iter().cloned())
        .collect();

    let mut stage_outdirs = BTreeMap::new();
    for stage in documents.iter().flat_map(|d| d.stages.iter()) {
        let resolved = substitute_entities(&stage.outdir_template, &entities);
        if entity_ref_pattern().is_match(&resolved) {
            tracing::warn!(
                stage = %stage.name,
                outdir = %resolved,
                "Stage outdir still contains unresolved entity references"
            );
        }
        if resolved.is_empty() {
            tracing::warn!(stage = %stage.name, "Stage has no outdir");
            continue;
        }
        stage_outdirs.insert(stage.name.clone(), PathBuf::from(resolved));
    }

    WorkflowContext {
        entities,
        stage_outdirs,
    }
}

/// Substitutes known entity references until none remain
///
/// Unknown references are left in place. Substitution stops after a fixed
/// number of passes so self-referencing entities cannot loop forever.
pub fn substitute_entities(template: &str, entities: &HashMap<String, String>) -> String {
    let pattern = entity_ref_pattern();
    let mut current = template.to_string();
    for _ in 0..MAX_SUBSTITUTION_PASSES {
        let next = pattern
            .replace_all(&current, |c: &Captures| match entities.get(&c[1]) {
                Some(value) => value.clone(),
                None => c[0].to_string(),
            })
            .into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
    tracing::warn!(template = %template, "Entity substitution did not converge");
    current
}
