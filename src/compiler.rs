//! Remote compile orchestration: workspace creation, member submission,
//! async compile request, and polling to a terminal state.
//!
//! The poll loop is the one intentional blocking point in a scan. Unlike
//! the remote protocol, which would happily stay pending forever, the loop
//! carries an attempt budget and a cancellation flag so an operator is
//! never stuck waiting on a wedged org.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use uuid::Uuid;

use crate::error::Error;
use crate::tooling::{AsyncRequestStatus, ToolingApi};
use crate::types::CodeUnit;

/// Remote identifier limit for container names.
const CONTAINER_NAME_LEN: usize = 32;

/// Bounds and cancellation for the status poll loop.
pub struct PollPolicy {
    /// Set externally (ctrl-c) to abandon the wait.
    pub cancel: Arc<AtomicBool>,
    /// Fixed delay between status checks.
    pub interval: Duration,
    /// Status checks issued before giving up on the remote compile.
    pub max_attempts: u32,
}

impl PollPolicy {
    /// A policy with the given bounds and a fresh, unset cancel flag.
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        return Self {
            cancel: Arc::new(AtomicBool::new(false)),
            interval,
            max_attempts,
        };
    }
}

/// Collapse a failed compile status into one display-ready message: the
/// request's own error first, then `name: problem` per failed component.
pub fn aggregate_compile_errors(status: &AsyncRequestStatus) -> String {
    let mut errors: Vec<String> = Vec::new();

    if let Some(message) = &status.error_msg
        && !message.is_empty()
    {
        errors.push(message.clone());
    }

    for component in &status.deploy_details.all_component_messages {
        if !component.success {
            errors.push(format!("{}: {}", component.full_name, component.problem));
        }
    }

    return format!("Code compilation error:\n- {}", errors.join("\n- "));
}

/// Pull the compiled symbol table for every submitted unit and attach it.
/// Units the compiler produced no table for stay bare — they still count
/// as reference targets, just not as sources.
///
/// # Errors
///
/// Returns transport or non-success HTTP failures from the member fetches.
pub fn attach_symbol_tables(api: &dyn ToolingApi, units: &mut [CodeUnit]) -> Result<(), Error> {
    for unit in units.iter_mut() {
        let Some(member_id) = &unit.member_id else {
            continue;
        };
        unit.symbol_table = api.member_symbol_table(member_id)?;
    }
    return Ok(());
}

/// Create the scan's ephemeral workspace under a unique name, truncated to
/// the remote 32-character identifier limit.
///
/// # Errors
///
/// Returns transport or non-success HTTP failures from the create call.
pub fn create_workspace(api: &dyn ToolingApi) -> Result<String, Error> {
    let mut name = Uuid::new_v4().to_string();
    name.truncate(CONTAINER_NAME_LEN);
    return api.create_container(&name);
}

/// Poll the async request at a fixed interval until it reaches a terminal
/// state, the attempt budget runs out, or cancellation is requested.
///
/// # Errors
///
/// Returns `Error::Cancelled` when the cancel flag is set,
/// `Error::PollBudgetExhausted` when the budget runs out, or any status
/// fetch failure.
pub fn poll_to_terminal(
    api: &dyn ToolingApi,
    request_id: &str,
    policy: &PollPolicy,
) -> Result<AsyncRequestStatus, Error> {
    let mut attempts: u32 = 0;
    loop {
        if policy.cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }
        if attempts >= policy.max_attempts {
            return Err(Error::PollBudgetExhausted { attempts });
        }

        std::thread::sleep(policy.interval);
        attempts = attempts.saturating_add(1);

        let status = api.async_request_status(request_id)?;
        if status.state.is_terminal() {
            return Ok(status);
        }
    }
}

/// Request a check-only compile of the workspace; returns the async
/// request id to poll.
///
/// # Errors
///
/// Returns transport or non-success HTTP failures from the create call.
pub fn request_compile(api: &dyn ToolingApi, container_id: &str) -> Result<String, Error> {
    return api.create_async_request(container_id);
}

/// Submit every unit's body into the workspace, capturing the returned
/// member id on the unit.
///
/// # Errors
///
/// Returns transport or non-success HTTP failures from the create calls.
pub fn submit_members(
    api: &dyn ToolingApi,
    container_id: &str,
    units: &mut [CodeUnit],
) -> Result<(), Error> {
    for unit in units.iter_mut() {
        let member_id = api.create_member(container_id, &unit.id, &unit.body)?;
        unit.member_id = Some(member_id);
    }
    return Ok(());
}
