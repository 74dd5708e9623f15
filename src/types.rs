//! Core domain types for scan jobs, code units, templates, and references.

use std::collections::BTreeMap;

use serde::Serialize;
use time::OffsetDateTime;

use crate::symbols::SymbolTable;

/// An Apex class fetched from the org, enriched as the scan progresses:
/// first with a workspace member id, then a compiled symbol table, and
/// finally its inbound reference object.
#[derive(Debug, Clone, Serialize)]
pub struct CodeUnit {
    /// Raw class source, as returned by the query. Large and of no use to
    /// report consumers, so not serialized.
    #[serde(skip)]
    pub body: String,
    /// Remote record id of the class.
    pub id: String,
    /// True once some other unit was seen referencing this one.
    #[serde(rename = "isReferencedExternally")]
    pub is_referenced_externally: bool,
    /// Workspace member id, assigned when the class is submitted for compile.
    pub member_id: Option<String>,
    /// Class name, the key every reference is recorded under.
    pub name: String,
    /// Inbound references, populated by the graph builder. Always `Some`
    /// after a successful scan — empty object when nothing references this unit.
    pub references: Option<ReferenceObject>,
    /// Compiled symbol table, attached after a successful remote compile.
    #[serde(skip)]
    pub symbol_table: Option<SymbolTable>,
}

impl CodeUnit {
    /// A freshly fetched unit, before any compile work has happened.
    pub fn new(id: String, name: String, body: String) -> Self {
        return Self {
            body,
            id,
            is_referenced_externally: false,
            member_id: None,
            name,
            references: None,
            symbol_table: None,
        };
    }
}

/// Lifecycle of a scan job. `Finished` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobStatus {
    /// The scan stopped; the job carries the aggregated error text.
    Error,
    /// The scan completed and every unit carries a reference object.
    Finished,
    /// Created but not yet started.
    Pending,
    /// Currently executing.
    Running,
}

impl std::fmt::Display for JobStatus {
    /// Human-readable status label, matching the serialized form.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Error => "Error",
            Self::Finished => "Finished",
            Self::Pending => "Pending",
            Self::Running => "Running",
        };
        return f.write_str(label);
    }
}

/// All inbound usages of one code unit, aggregated across templates and
/// other units. Every map field is a concrete empty container when unused —
/// never an `Option` — so consumers need no null handling.
///
/// Citation lists under `classes`, `methods`, and `variables` accumulate in
/// visit order and are deliberately not deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReferenceObject {
    /// Referencing unit name -> line citations for bare class references
    /// (constructor calls, type usages).
    pub classes: BTreeMap<String, Vec<String>>,
    /// Method name -> (referencing unit or template display name -> line
    /// citations). Template hits carry an empty citation list, since markup
    /// containment has no line information.
    pub methods: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    /// Property name -> template display names whose markup uses it.
    pub properties: BTreeMap<String, Vec<String>>,
    /// Variable name -> (referencing unit name -> line citations).
    pub variables: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    /// Display names of templates bound to this unit as controller/extension.
    pub visualforce: Vec<String>,
}

/// One scan run against an org. Owns everything the scan produces.
#[derive(Debug, Serialize)]
pub struct ScanJob {
    /// Aggregated error text when the job ends in `Error`.
    pub error: Option<String>,
    /// Completion timestamp, set only when the job finishes cleanly.
    #[serde(with = "time::serde::rfc3339::option")]
    pub finished_at: Option<OffsetDateTime>,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// All UI templates fetched for this run.
    pub templates: Vec<UiTemplate>,
    /// All code units fetched for this run.
    pub units: Vec<CodeUnit>,
}

impl ScanJob {
    /// A new, not-yet-started job.
    pub fn new() -> Self {
        return Self {
            error: None,
            finished_at: None,
            status: JobStatus::Pending,
            templates: Vec::new(),
            units: Vec::new(),
        };
    }
}

/// Whether a template is a full page or a reusable component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TemplateKind {
    /// A reusable markup component.
    Component,
    /// A full page.
    Page,
}

impl std::fmt::Display for TemplateKind {
    /// The type tag used in template display names.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Component => "Component",
            Self::Page => "Page",
        };
        return f.write_str(label);
    }
}

/// A Visualforce page or component fetched from the org. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct UiTemplate {
    /// Raw markup, used for merge-field containment checks. Not serialized.
    #[serde(skip)]
    pub body: String,
    /// Comma-joined controller and extension names, `None` when the template
    /// declares no custom controller at all.
    pub controller: Option<String>,
    /// Remote record id of the template.
    pub id: String,
    /// Page or component.
    pub kind: TemplateKind,
    /// Template name.
    pub name: String,
}

impl UiTemplate {
    /// Controller names split back out of the comma-joined field.
    pub fn controller_names(&self) -> Vec<&str> {
        let Some(controller) = &self.controller else {
            return Vec::new();
        };
        return controller
            .split(',')
            .map(str::trim)
            .filter(|name| return !name.is_empty())
            .collect();
    }

    /// The `"name (type)"` form references are recorded under.
    pub fn display_name(&self) -> String {
        return format!("{} ({})", self.name, self.kind);
    }
}
