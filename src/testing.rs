//! In-memory `ToolingApi` fake shared by the orchestration tests.
//!
//! Pages and statuses are queues the test seeds up front; call counters
//! let tests assert exactly how many requests a phase issued. Member ids
//! are derived from content ids (`member-{content id}`) so symbol tables
//! can be seeded per class without threading state through the fake.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

use crate::error::Error;
use crate::symbols::SymbolTable;
use crate::tooling::{
    AsyncRequestStatus, ClassRecord, CompileState, DeployDetails, Page, TemplateEntity,
    TemplateRecord, ToolingApi,
};

/// Scripted in-memory org.
pub struct FakeTooling {
    /// Queued class query pages, popped per request.
    pub class_pages: RefCell<VecDeque<Page<ClassRecord>>>,
    /// Queued component query pages.
    pub component_pages: RefCell<VecDeque<Page<TemplateRecord>>>,
    /// Names passed to container creation, for asserting the length cap.
    pub container_names: RefCell<Vec<String>>,
    /// When set, every class query fails with a transport error.
    pub fail_class_queries: Cell<bool>,
    /// `(container id, content id)` per submitted member, in order.
    pub member_log: RefCell<Vec<(String, String)>>,
    /// Queued page query pages.
    pub page_pages: RefCell<VecDeque<Page<TemplateRecord>>>,
    /// Number of status requests issued.
    pub status_requests: Cell<u32>,
    /// Queued compile statuses; when exhausted the fake reports
    /// `InProgress` forever, like a wedged org.
    pub statuses: RefCell<VecDeque<AsyncRequestStatus>>,
    /// Symbol tables keyed by content id.
    pub symbol_tables: RefCell<HashMap<String, SymbolTable>>,
}

impl FakeTooling {
    /// An org with nothing in it.
    pub fn new() -> Self {
        return Self {
            class_pages: RefCell::new(VecDeque::new()),
            component_pages: RefCell::new(VecDeque::new()),
            container_names: RefCell::new(Vec::new()),
            fail_class_queries: Cell::new(false),
            member_log: RefCell::new(Vec::new()),
            page_pages: RefCell::new(VecDeque::new()),
            status_requests: Cell::new(0),
            statuses: RefCell::new(VecDeque::new()),
            symbol_tables: RefCell::new(HashMap::new()),
        };
    }

    /// Seed one page of classes as the complete query result.
    pub fn seed_classes(&self, records: Vec<ClassRecord>) {
        self.class_pages.borrow_mut().push_back(single_page(records));
    }

    /// Seed one page of templates for the given entity.
    pub fn seed_templates(&self, entity: TemplateEntity, records: Vec<TemplateRecord>) {
        let queue = match entity {
            TemplateEntity::Component => &self.component_pages,
            TemplateEntity::Page => &self.page_pages,
        };
        queue.borrow_mut().push_back(single_page(records));
    }
}

impl ToolingApi for FakeTooling {
    fn async_request_status(&self, _request_id: &str) -> Result<AsyncRequestStatus, Error> {
        self.status_requests.set(self.status_requests.get().saturating_add(1));
        let next = self.statuses.borrow_mut().pop_front();
        return Ok(next.unwrap_or_else(|| status_with_state(CompileState::InProgress)));
    }

    fn class_page(&self, _cursor: Option<&str>) -> Result<Page<ClassRecord>, Error> {
        if self.fail_class_queries.get() {
            return Err(Error::Transport {
                context: "class query".to_string(),
                reason: "connection refused".to_string(),
            });
        }
        return Ok(self
            .class_pages
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| single_page(Vec::new())));
    }

    fn create_async_request(&self, _container_id: &str) -> Result<String, Error> {
        return Ok("async-request-1".to_string());
    }

    fn create_container(&self, name: &str) -> Result<String, Error> {
        self.container_names.borrow_mut().push(name.to_string());
        return Ok("container-1".to_string());
    }

    fn create_member(
        &self,
        container_id: &str,
        content_id: &str,
        _body: &str,
    ) -> Result<String, Error> {
        self.member_log
            .borrow_mut()
            .push((container_id.to_string(), content_id.to_string()));
        return Ok(format!("member-{content_id}"));
    }

    fn member_symbol_table(&self, member_id: &str) -> Result<Option<SymbolTable>, Error> {
        let content_id = member_id.strip_prefix("member-").unwrap_or(member_id);
        return Ok(self.symbol_tables.borrow().get(content_id).cloned());
    }

    fn template_page(
        &self,
        entity: TemplateEntity,
        _cursor: Option<&str>,
    ) -> Result<Page<TemplateRecord>, Error> {
        let queue = match entity {
            TemplateEntity::Component => &self.component_pages,
            TemplateEntity::Page => &self.page_pages,
        };
        return Ok(queue
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| single_page(Vec::new())));
    }
}

/// A class record with the given wire fields.
pub fn class_record(id: &str, name: &str, body: &str) -> ClassRecord {
    return ClassRecord {
        body: Some(body.to_string()),
        id: id.to_string(),
        name: name.to_string(),
    };
}

/// A terminal page (no continuation cursor).
pub fn single_page<R>(records: Vec<R>) -> Page<R> {
    return Page {
        next_records_url: None,
        records,
    };
}

/// A status document in the given state with no errors attached.
pub fn status_with_state(state: CompileState) -> AsyncRequestStatus {
    return AsyncRequestStatus {
        deploy_details: DeployDetails::default(),
        error_msg: None,
        state,
    };
}

/// A template record with no custom controller declared.
pub fn template_record(id: &str, name: &str, markup: &str) -> TemplateRecord {
    return TemplateRecord {
        controller_key: None,
        controller_type: None,
        id: id.to_string(),
        markup: Some(markup.to_string()),
        name: name.to_string(),
    };
}
