//! End-to-end scan sequencing: fetch, submit, compile, poll, invert.
//!
//! Each phase hands its results directly to the next — there is no storage
//! round-trip mid-scan. Any remote failure aborts the run and lands on the
//! job as its error text; the job status is the sole external signal.

use time::OffsetDateTime;

use crate::compiler::{self, PollPolicy};
use crate::error::Error;
use crate::graph;
use crate::markup;
use crate::tooling::{self, CompileState, TemplateEntity, TemplateRecord, ToolingApi};
use crate::types::{CodeUnit, JobStatus, ScanJob, UiTemplate};

/// Run all scan phases, leaving results on the job.
///
/// # Errors
///
/// Returns `Error::CompileFailed` with the aggregated compiler output when
/// the remote compile resolves to anything but `Completed`, or the first
/// remote/poll failure otherwise.
fn execute(api: &dyn ToolingApi, job: &mut ScanJob, policy: &PollPolicy) -> Result<(), Error> {
    // A rerun starts from a clean slate.
    job.error = None;
    job.finished_at = None;
    job.templates.clear();
    job.units.clear();

    let container_id = compiler::create_workspace(api)?;

    job.units = fetch_code_units(api)?;
    compiler::submit_members(api, &container_id, &mut job.units)?;

    job.templates = fetch_templates(api)?;

    let request_id = compiler::request_compile(api, &container_id)?;
    let status = compiler::poll_to_terminal(api, &request_id, policy)?;
    if status.state != CompileState::Completed {
        return Err(Error::CompileFailed {
            message: compiler::aggregate_compile_errors(&status),
        });
    }

    compiler::attach_symbol_tables(api, &mut job.units)?;
    graph::build_reference_graph(&mut job.units, &job.templates);

    return Ok(());
}

/// Fetch every class record and lift it into a code unit.
///
/// # Errors
///
/// Propagates query failures.
fn fetch_code_units(api: &dyn ToolingApi) -> Result<Vec<CodeUnit>, Error> {
    return Ok(tooling::fetch_all_classes(api)?
        .into_iter()
        .map(|record| {
            return CodeUnit::new(record.id, record.name, record.body.unwrap_or_default());
        })
        .collect());
}

/// Fetch all templates, pages first then components, resolving each one's
/// controller list as it lands.
///
/// # Errors
///
/// Propagates query failures.
fn fetch_templates(api: &dyn ToolingApi) -> Result<Vec<UiTemplate>, Error> {
    let mut templates = Vec::new();
    for entity in [TemplateEntity::Page, TemplateEntity::Component] {
        for mut record in tooling::fetch_all_templates(api, entity)? {
            let body = record.markup.take().unwrap_or_default();
            let controller = resolve_controllers(&record, entity, &body);
            templates.push(UiTemplate {
                body,
                controller,
                id: record.id,
                kind: entity.kind(),
                name: record.name,
            });
        }
    }
    return Ok(templates);
}

/// A template's effective controller list: the declared controller field
/// when it names a custom controller, unioned with markup extensions for
/// pages. Comma-joined; `None` when empty.
fn resolve_controllers(
    record: &TemplateRecord,
    entity: TemplateEntity,
    body: &str,
) -> Option<String> {
    let mut controllers: Vec<String> = Vec::new();

    // ControllerType "2" marks a custom Apex controller; standard and null
    // controllers never enter the graph.
    if record.controller_type.as_deref() == Some("2")
        && let Some(key) = &record.controller_key
        && !key.is_empty()
        && !key.contains("NullController")
    {
        controllers.push(key.clone());
    }

    if entity == TemplateEntity::Page {
        controllers.extend(markup::extract_extensions(body));
    }

    if controllers.is_empty() {
        return None;
    }
    return Some(controllers.join(","));
}

/// Run one scan to completion, recording the outcome on the job. The job
/// ends `Finished` with a completion timestamp, or `Error` carrying the
/// failure text — compile failures land verbatim, everything else with a
/// `Scan failed:` prefix.
pub fn run(api: &dyn ToolingApi, job: &mut ScanJob, policy: &PollPolicy) {
    job.status = JobStatus::Running;
    match execute(api, job, policy) {
        Err(Error::CompileFailed { message }) => {
            job.error = Some(message);
            job.status = JobStatus::Error;
        },
        Err(err) => {
            job.error = Some(format!("Scan failed: {err}"));
            job.status = JobStatus::Error;
        },
        Ok(()) => {
            job.finished_at = Some(OffsetDateTime::now_utc());
            job.status = JobStatus::Finished;
        },
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::symbols::{Citation, ExternalReference, MemberReference, Symbol, SymbolTable};
    use crate::testing::{FakeTooling, class_record, status_with_state, template_record};
    use crate::tooling::{ComponentMessage, DeployDetails};
    use crate::types::TemplateKind;

    /// Never sleeps, never cancels.
    fn eager_policy() -> PollPolicy {
        PollPolicy::new(Duration::ZERO, 50)
    }

    /// The two-unit, one-template scenario: A calls B.foo() at line 3
    /// column 1 and declares a method bar used by page P.
    fn seeded_org() -> FakeTooling {
        let fake = FakeTooling::new();
        fake.seed_classes(vec![
            class_record("01pA", "A", "public class A {}"),
            class_record("01pB", "B", "public class B {}"),
        ]);
        fake.seed_templates(
            TemplateEntity::Page,
            vec![TemplateRecord {
                controller_key: Some("A".to_string()),
                controller_type: Some("2".to_string()),
                id: "066P".to_string(),
                markup: Some("<apex:page controller=\"A\">{!bar}</apex:page>".to_string()),
                name: "P".to_string(),
            }],
        );
        fake.statuses
            .borrow_mut()
            .push_back(status_with_state(CompileState::Completed));

        let table_a = SymbolTable {
            external_references: vec![ExternalReference {
                methods: vec![MemberReference {
                    name: "foo".to_string(),
                    references: vec![Citation { column: 1, line: 3 }],
                }],
                name: "B".to_string(),
                namespace: None,
                references: Vec::new(),
                variables: Vec::new(),
            }],
            methods: vec![Symbol { name: "bar".to_string() }],
            properties: Vec::new(),
        };
        fake.symbol_tables.borrow_mut().insert("01pA".to_string(), table_a);
        fake.symbol_tables
            .borrow_mut()
            .insert("01pB".to_string(), SymbolTable::default());
        return fake;
    }

    #[test]
    fn end_to_end_scan_builds_the_expected_graph() {
        let fake = seeded_org();
        let mut job = ScanJob::new();
        run(&fake, &mut job, &eager_policy());

        assert_eq!(job.status, JobStatus::Finished);
        assert!(job.finished_at.is_some());
        assert!(job.error.is_none());

        let a = job.units.iter().find(|u| u.name == "A").unwrap();
        let a_refs = a.references.as_ref().unwrap();
        assert_eq!(a_refs.visualforce, vec!["P (Page)".to_string()]);
        assert!(a_refs.methods.get("bar").is_some_and(|hits| !hits.is_empty()));
        assert!(!a.is_referenced_externally);

        let b = job.units.iter().find(|u| u.name == "B").unwrap();
        let b_refs = b.references.as_ref().unwrap();
        assert_eq!(
            b_refs.methods.get("foo").unwrap().get("A").unwrap(),
            &vec!["Line 3 Column 1".to_string()]
        );
        assert!(b.is_referenced_externally);
    }

    #[test]
    fn members_are_submitted_into_the_created_workspace() {
        let fake = seeded_org();
        let mut job = ScanJob::new();
        run(&fake, &mut job, &eager_policy());

        let log = fake.member_log.borrow();
        assert_eq!(
            log.as_slice(),
            &[
                ("container-1".to_string(), "01pA".to_string()),
                ("container-1".to_string(), "01pB".to_string()),
            ]
        );
    }

    #[test]
    fn compile_failure_marks_the_job_with_the_aggregate() {
        let fake = FakeTooling::new();
        fake.seed_classes(vec![class_record("01pA", "A", "public class A {}")]);
        fake.statuses.borrow_mut().push_back(crate::tooling::AsyncRequestStatus {
            deploy_details: DeployDetails {
                all_component_messages: vec![ComponentMessage {
                    full_name: "A".to_string(),
                    problem: "Unexpected token".to_string(),
                    success: false,
                }],
            },
            error_msg: Some("X".to_string()),
            state: CompileState::Failed,
        });

        let mut job = ScanJob::new();
        run(&fake, &mut job, &eager_policy());

        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(
            job.error.as_deref(),
            Some("Code compilation error:\n- X\n- A: Unexpected token")
        );
        // No partial graph work after a failed compile.
        assert!(job.units.iter().all(|unit| unit.references.is_none()));
        assert!(job.finished_at.is_none());
    }

    #[test]
    fn transport_failure_marks_the_job_with_the_cause() {
        let fake = FakeTooling::new();
        fake.fail_class_queries.set(true);

        let mut job = ScanJob::new();
        run(&fake, &mut job, &eager_policy());

        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(
            job.error.as_deref(),
            Some("Scan failed: class query failed: connection refused")
        );
    }

    #[test]
    fn rerun_replaces_prior_results() {
        let fake = seeded_org();
        let mut job = ScanJob::new();
        run(&fake, &mut job, &eager_policy());
        assert_eq!(job.units.len(), 2);

        // Second run against an org that now reports a single class.
        let smaller = FakeTooling::new();
        smaller.seed_classes(vec![class_record("01pC", "C", "public class C {}")]);
        smaller
            .statuses
            .borrow_mut()
            .push_back(status_with_state(CompileState::Completed));
        run(&smaller, &mut job, &eager_policy());

        assert_eq!(job.status, JobStatus::Finished);
        assert_eq!(job.units.len(), 1);
        assert_eq!(job.units.first().unwrap().name, "C");
        assert!(job.templates.is_empty());
    }

    #[test]
    fn templates_fetch_pages_before_components() {
        let fake = FakeTooling::new();
        fake.seed_templates(
            TemplateEntity::Page,
            vec![template_record("066P", "P", "<apex:page/>")],
        );
        fake.seed_templates(
            TemplateEntity::Component,
            vec![template_record("099C", "C", "<apex:component/>")],
        );

        let templates = fetch_templates(&fake).unwrap();
        let kinds: Vec<TemplateKind> = templates.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TemplateKind::Page, TemplateKind::Component]);
    }

    #[test]
    fn controller_resolution_rules() {
        // Custom controller plus page extensions, comma-joined in order.
        let page = TemplateRecord {
            controller_key: Some("Ctrl".to_string()),
            controller_type: Some("2".to_string()),
            id: "066".to_string(),
            markup: None,
            name: "P".to_string(),
        };
        let body = r#"<apex:page extensions="ExtA,ExtB"></apex:page>"#;
        assert_eq!(
            resolve_controllers(&page, TemplateEntity::Page, body).as_deref(),
            Some("Ctrl,ExtA,ExtB")
        );

        // Standard controllers (type != "2") are ignored.
        let standard = TemplateRecord {
            controller_type: Some("0".to_string()),
            ..page.clone()
        };
        assert_eq!(resolve_controllers(&standard, TemplateEntity::Page, "<apex:page/>"), None);

        // Null controllers are ignored.
        let null_ctrl = TemplateRecord {
            controller_key: Some("Apex.NullController".to_string()),
            ..page.clone()
        };
        assert_eq!(
            resolve_controllers(&null_ctrl, TemplateEntity::Page, "<apex:page/>"),
            None
        );

        // Components never contribute markup extensions.
        assert_eq!(
            resolve_controllers(&page, TemplateEntity::Component, body).as_deref(),
            Some("Ctrl")
        );
    }
}
