//! The remote Tooling API surface the scan consumes.
//!
//! `ToolingApi` is the seam between scan logic and the wire: the HTTP
//! implementation lives in `http`, and tests drive the same trait with an
//! in-memory fake. Record and status types here mirror the remote JSON
//! shapes; domain types live in `types`.

use serde::Deserialize;

use crate::error::Error;

/// SOQL for all non-namespaced classes, pre-encoded for a query URL.
/// Namespace exclusion happens server-side; no local filtering.
pub const CLASS_SOQL: &str = "SELECT+Id,Name,Body+FROM+ApexClass+WHERE+NamespacePrefix=NULL";

/// Status document for an asynchronous compile request.
#[derive(Debug, Clone, Deserialize)]
pub struct AsyncRequestStatus {
    /// Per-component compile results, present once the request resolves.
    #[serde(default, rename = "DeployDetails")]
    pub deploy_details: DeployDetails,
    /// Top-level error message, when the request itself failed.
    #[serde(default, rename = "ErrorMsg")]
    pub error_msg: Option<String>,
    /// Current request state.
    #[serde(rename = "State")]
    pub state: CompileState,
}

/// A fetched class record, fields named as the wire names them.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassRecord {
    /// Class source body.
    #[serde(default, rename = "Body")]
    pub body: Option<String>,
    /// Remote record id.
    #[serde(rename = "Id")]
    pub id: String,
    /// Class name.
    #[serde(rename = "Name")]
    pub name: String,
}

/// Remote compile request states. Everything except `InProgress` is terminal.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[allow(
    clippy::arbitrary_source_item_ordering,
    reason = "serde(other) must be on the last variant"
)]
pub enum CompileState {
    /// The request was aborted before completing.
    Aborted,
    /// The compile succeeded; symbol tables are available.
    Completed,
    /// The request errored out.
    Error,
    /// The compile ran and failed.
    Failed,
    /// The request was invalidated by a conflicting change.
    Invalidated,
    /// Any non-terminal state the server reports (`Queued` and friends).
    #[serde(other)]
    InProgress,
}

impl CompileState {
    /// Whether polling should stop on observing this state.
    pub fn is_terminal(self) -> bool {
        return !matches!(self, Self::InProgress);
    }
}

/// One component's result inside the deploy details.
#[derive(Debug, Clone, Deserialize)]
pub struct ComponentMessage {
    /// Component name, as reported by the compiler.
    #[serde(default, rename = "fullName")]
    pub full_name: String,
    /// Failure description; empty on success.
    #[serde(default)]
    pub problem: String,
    /// Whether this component compiled cleanly.
    #[serde(default)]
    pub success: bool,
}

/// Compile results broken down per component.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeployDetails {
    /// One message per component in the workspace.
    #[serde(default, rename = "allComponentMessages")]
    pub all_component_messages: Vec<ComponentMessage>,
}

/// One page of query results, with the server's continuation cursor.
#[derive(Debug, Deserialize)]
pub struct Page<R> {
    /// Continuation path; absent on the final page.
    #[serde(default, rename = "nextRecordsUrl")]
    pub next_records_url: Option<String>,
    /// Records in server order.
    #[serde(default = "Vec::new")]
    pub records: Vec<R>,
}

/// Which template entity a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateEntity {
    /// Reusable components.
    Component,
    /// Full pages.
    Page,
}

impl TemplateEntity {
    /// The remote entity name used in queries.
    pub fn api_name(self) -> &'static str {
        return match self {
            Self::Component => "ApexComponent",
            Self::Page => "ApexPage",
        };
    }

    /// The kind tag templates of this entity carry.
    pub fn kind(self) -> crate::types::TemplateKind {
        return match self {
            Self::Component => crate::types::TemplateKind::Component,
            Self::Page => crate::types::TemplateKind::Page,
        };
    }

    /// SOQL for all non-namespaced templates of this entity, pre-encoded.
    pub fn soql(self) -> String {
        return format!(
            "SELECT+Id,Name,Markup,ControllerKey,ControllerType+FROM+{}+WHERE+NamespacePrefix=NULL",
            self.api_name()
        );
    }
}

/// A fetched page or component record.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateRecord {
    /// Declared controller name, when one is set.
    #[serde(default, rename = "ControllerKey")]
    pub controller_key: Option<String>,
    /// Controller kind discriminator; `"2"` marks a custom Apex controller.
    #[serde(default, rename = "ControllerType")]
    pub controller_type: Option<String>,
    /// Remote record id.
    #[serde(rename = "Id")]
    pub id: String,
    /// Template markup.
    #[serde(default, rename = "Markup")]
    pub markup: Option<String>,
    /// Template name.
    #[serde(rename = "Name")]
    pub name: String,
}

/// Every remote call the scan makes, in submission-protocol order of use.
/// All calls are synchronous request/response; any failure is fatal to the
/// scan (no retries).
pub trait ToolingApi {
    /// Fetch the current status of an async compile request.
    ///
    /// # Errors
    ///
    /// Returns transport or non-success HTTP failures.
    fn async_request_status(&self, request_id: &str) -> Result<AsyncRequestStatus, Error>;

    /// Fetch one page of class records. `cursor` is `None` for the first
    /// page and the server-supplied continuation path afterwards.
    ///
    /// # Errors
    ///
    /// Returns transport or non-success HTTP failures.
    fn class_page(&self, cursor: Option<&str>) -> Result<Page<ClassRecord>, Error>;

    /// Request a check-only compile of the workspace; returns the request id.
    ///
    /// # Errors
    ///
    /// Returns transport or non-success HTTP failures.
    fn create_async_request(&self, container_id: &str) -> Result<String, Error>;

    /// Create the ephemeral workspace scoping this scan's edits.
    ///
    /// # Errors
    ///
    /// Returns transport or non-success HTTP failures.
    fn create_container(&self, name: &str) -> Result<String, Error>;

    /// Submit one class body into the workspace; returns the member id.
    ///
    /// # Errors
    ///
    /// Returns transport or non-success HTTP failures.
    fn create_member(&self, container_id: &str, content_id: &str, body: &str)
    -> Result<String, Error>;

    /// Fetch a submitted member's compiled symbol table. `None` when the
    /// compiler produced no table or the document is malformed.
    ///
    /// # Errors
    ///
    /// Returns transport or non-success HTTP failures.
    fn member_symbol_table(
        &self,
        member_id: &str,
    ) -> Result<Option<crate::symbols::SymbolTable>, Error>;

    /// Fetch one page of template records for the given entity.
    ///
    /// # Errors
    ///
    /// Returns transport or non-success HTTP failures.
    fn template_page(
        &self,
        entity: TemplateEntity,
        cursor: Option<&str>,
    ) -> Result<Page<TemplateRecord>, Error>;
}

/// Follow continuation cursors until the server stops supplying one,
/// accumulating records in request order.
///
/// # Errors
///
/// Propagates the first page-fetch failure; partial results are discarded.
fn drain_pages<R>(
    first: impl FnOnce() -> Result<Page<R>, Error>,
    mut next: impl FnMut(&str) -> Result<Page<R>, Error>,
) -> Result<Vec<R>, Error> {
    let mut page = first()?;
    let mut records = page.records;
    while let Some(cursor) = page.next_records_url {
        page = next(&cursor)?;
        records.append(&mut page.records);
    }
    return Ok(records);
}

/// Fetch every non-namespaced class record, following pagination.
///
/// # Errors
///
/// Propagates the first page-fetch failure.
pub fn fetch_all_classes(api: &dyn ToolingApi) -> Result<Vec<ClassRecord>, Error> {
    return drain_pages(
        || return api.class_page(None),
        |cursor| return api.class_page(Some(cursor)),
    );
}

/// Fetch every non-namespaced template record of one entity, following
/// pagination.
///
/// # Errors
///
/// Propagates the first page-fetch failure.
pub fn fetch_all_templates(
    api: &dyn ToolingApi,
    entity: TemplateEntity,
) -> Result<Vec<TemplateRecord>, Error> {
    return drain_pages(
        || return api.template_page(entity, None),
        |cursor| return api.template_page(entity, Some(cursor)),
    );
}
