//! HTTP implementation of `ToolingApi` over the org's REST endpoints.
//!
//! One shared agent with fixed timeouts; every call carries the bearer
//! credential. Non-2xx responses and transport failures map onto the crate
//! error variants — the scan treats both as fatal, so no retries here.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::error::Error;
use crate::symbols::SymbolTable;
use crate::tooling::{
    AsyncRequestStatus, CLASS_SOQL, ClassRecord, Page, TemplateEntity, TemplateRecord, ToolingApi,
};

/// Connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Response read timeout; symbol tables for large classes can be slow.
const READ_TIMEOUT: Duration = Duration::from_secs(120);
/// Request write timeout.
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Envelope of a create call; the org echoes the new record id.
#[derive(Debug, Deserialize)]
struct CreateResponse {
    /// Id of the created record, absent on some error shapes.
    #[serde(default)]
    id: Option<String>,
}

/// `ToolingApi` over the wire.
pub struct HttpTooling {
    /// Bearer credential attached to every request.
    access_token: String,
    /// Shared agent with consistent timeouts.
    agent: ureq::Agent,
    /// Org base URL, without a trailing slash. Continuation cursors are
    /// resolved against this.
    instance_url: String,
    /// Versioned tooling base, ending in a slash.
    tooling_url: String,
}

/// Member record envelope; only the symbol table matters here.
#[derive(Debug, Deserialize)]
struct MemberRecord {
    /// The compiled symbol table document, possibly null.
    #[serde(default, rename = "SymbolTable")]
    symbol_table: Option<serde_json::Value>,
}

impl HttpTooling {
    /// Build a client for one org endpoint and credential.
    pub fn new(instance_url: &str, access_token: &str, api_version: u32) -> Self {
        let instance_url = instance_url.trim_end_matches('/').to_string();
        let tooling_url = format!("{instance_url}/services/data/v{api_version}.0/tooling/");
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .timeout_write(WRITE_TIMEOUT)
            .build();
        return Self {
            access_token: access_token.to_string(),
            agent,
            instance_url,
            tooling_url,
        };
    }

    /// POST a create payload to a tooling sobject and return the new id.
    fn create(&self, entity: &str, payload: serde_json::Value) -> Result<String, Error> {
        let url = format!("{}sobjects/{entity}", self.tooling_url);
        let context = format!("create {entity}");
        let response: CreateResponse = self.post_json(&url, payload, &context)?;
        return response.id.ok_or_else(|| {
            return Error::MissingRecordId {
                entity: entity.to_string(),
            };
        });
    }

    /// GET a JSON document with auth headers.
    fn get_json<T: DeserializeOwned>(&self, url: &str, context: &str) -> Result<T, Error> {
        let request = self
            .agent
            .get(url)
            .set("Accept", "application/json")
            .set("Authorization", &format!("Bearer {}", self.access_token));
        return read_json(request.call(), context);
    }

    /// POST a JSON payload and decode the JSON response.
    fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        payload: serde_json::Value,
        context: &str,
    ) -> Result<T, Error> {
        let request = self
            .agent
            .post(url)
            .set("Accept", "application/json")
            .set("Authorization", &format!("Bearer {}", self.access_token))
            .set("Content-Type", "application/json");
        return read_json(request.send_json(payload), context);
    }

    /// First-page query URL, or the instance-relative continuation path.
    fn query_url(&self, soql: &str, cursor: Option<&str>) -> String {
        return match cursor {
            None => format!("{}query/?q={soql}", self.tooling_url),
            Some(path) => format!("{}{path}", self.instance_url),
        };
    }
}

impl ToolingApi for HttpTooling {
    fn async_request_status(&self, request_id: &str) -> Result<AsyncRequestStatus, Error> {
        let url = format!("{}sobjects/ContainerAsyncRequest/{request_id}", self.tooling_url);
        return self.get_json(&url, "compile status");
    }

    fn class_page(&self, cursor: Option<&str>) -> Result<Page<ClassRecord>, Error> {
        return self.get_json(&self.query_url(CLASS_SOQL, cursor), "class query");
    }

    fn create_async_request(&self, container_id: &str) -> Result<String, Error> {
        return self.create(
            "ContainerAsyncRequest",
            json!({"IsCheckOnly": true, "MetadataContainerId": container_id}),
        );
    }

    fn create_container(&self, name: &str) -> Result<String, Error> {
        return self.create("MetadataContainer", json!({"Name": name}));
    }

    fn create_member(
        &self,
        container_id: &str,
        content_id: &str,
        body: &str,
    ) -> Result<String, Error> {
        return self.create(
            "ApexClassMember",
            json!({
                "Body": body,
                "ContentEntityId": content_id,
                "MetadataContainerId": container_id,
            }),
        );
    }

    fn member_symbol_table(&self, member_id: &str) -> Result<Option<SymbolTable>, Error> {
        let url = format!("{}sobjects/ApexClassMember/{member_id}", self.tooling_url);
        let record: MemberRecord = self.get_json(&url, "symbol table fetch")?;
        // A null or malformed table means the unit contributes no outgoing
        // references; it is not a scan failure.
        return Ok(record
            .symbol_table
            .and_then(|value| return serde_json::from_value(value).ok()));
    }

    fn template_page(
        &self,
        entity: TemplateEntity,
        cursor: Option<&str>,
    ) -> Result<Page<TemplateRecord>, Error> {
        return self.get_json(&self.query_url(&entity.soql(), cursor), "template query");
    }
}

/// Decode a ureq result into `T`, mapping failures onto crate errors.
fn read_json<T: DeserializeOwned>(
    result: Result<ureq::Response, ureq::Error>,
    context: &str,
) -> Result<T, Error> {
    return match result {
        Ok(response) => response.into_json::<T>().map_err(|err| {
            return Error::InvalidResponse {
                context: context.to_string(),
                reason: err.to_string(),
            };
        }),
        Err(ureq::Error::Status(status, response)) => Err(Error::RemoteStatus {
            body: response.into_string().unwrap_or_default(),
            context: context.to_string(),
            status,
        }),
        Err(err) => Err(Error::Transport {
            context: context.to_string(),
            reason: err.to_string(),
        }),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_url_builds_first_page_and_continuation() {
        let client = HttpTooling::new("https://na1.example.com/", "token", 45);
        assert_eq!(
            client.query_url("SELECT+Id+FROM+ApexClass", None),
            "https://na1.example.com/services/data/v45.0/tooling/query/?q=SELECT+Id+FROM+ApexClass"
        );
        assert_eq!(
            client.query_url("ignored", Some("/services/data/v45.0/tooling/query/01g-2")),
            "https://na1.example.com/services/data/v45.0/tooling/query/01g-2"
        );
    }

    #[test]
    fn create_response_tolerates_missing_id() {
        let with_id: CreateResponse =
            serde_json::from_str(r#"{"id": "1dc000000000001", "success": true}"#).unwrap();
        assert_eq!(with_id.id.as_deref(), Some("1dc000000000001"));

        let without: CreateResponse = serde_json::from_str("{}").unwrap();
        assert!(without.id.is_none());
    }

    #[test]
    fn malformed_symbol_table_reads_as_absent() {
        let record: MemberRecord =
            serde_json::from_str(r#"{"SymbolTable": "not an object"}"#).unwrap();
        let table: Option<SymbolTable> =
            record.symbol_table.and_then(|value| serde_json::from_value(value).ok());
        assert!(table.is_none());
    }
}
