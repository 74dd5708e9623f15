/// Crate-level error types for orgscan.
///
/// All errors carry enough context to produce a useful diagnostic without a
/// debugger. Remote failures name the call that failed; a compile failure
/// carries the full aggregated compiler output.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The user interrupted the scan while it was waiting on the remote org.
    #[error("scan cancelled while waiting for the remote compile")]
    Cancelled,

    /// The remote compile reached a terminal state other than `Completed`.
    /// The message is the aggregated, display-ready compiler output.
    #[error("{message}")]
    CompileFailed {
        /// Aggregated top-level error plus one line per failed component.
        message: String,
    },

    /// The remote org answered, but the body was not what the call expected.
    #[error("unexpected response from {context}: {reason}")]
    InvalidResponse {
        /// Which remote call produced the response.
        context: String,
        /// Why the body could not be used.
        reason: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// A create call succeeded but returned no record id.
    #[error("create {entity} returned no id")]
    MissingRecordId {
        /// The remote entity that was being created.
        entity: String,
    },

    /// The compile poll loop ran out of attempts before a terminal state.
    #[error("remote compile still pending after {attempts} status checks")]
    PollBudgetExhausted {
        /// How many status checks were issued before giving up.
        attempts: u32,
    },

    /// The remote org returned a non-success HTTP status.
    #[error("{context} failed: HTTP {status}: {body}")]
    RemoteStatus {
        /// Response body, as returned by the org.
        body: String,
        /// Which remote call failed.
        context: String,
        /// HTTP status code.
        status: u16,
    },

    /// TOML deserialization failed while loading `.orgscan.toml`.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// The remote call never produced a response.
    #[error("{context} failed: {reason}")]
    Transport {
        /// Which remote call failed.
        context: String,
        /// Transport-level failure description.
        reason: String,
    },
}
