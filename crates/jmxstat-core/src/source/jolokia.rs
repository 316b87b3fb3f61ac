//! Jolokia attribute source.
//!
//! Jolokia exposes JMX over HTTP/JSON. A connection is validated with a
//! `GET <base>/version`; attributes are read with a `POST <base>` carrying a
//! `read` request:
//!
//! ```text
//! → {"type":"read","mbean":"java.lang:type=Memory","attribute":"HeapMemoryUsage"}
//! ← {"request":{...},"value":{"init":..,"used":..},"status":200,"timestamp":..}
//! ← {"error_type":"javax.management.InstanceNotFoundException","error":"...","status":404}
//! ```
//!
//! Jolokia reports read errors inside a `200 OK` body, so the embedded
//! `status` decides success.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::{Connection, ConnectionError, Connector, Credentials, FetchError};
use crate::config::ConfigError;
use crate::resource::ResourceId;
use crate::value::AttributeValue;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct ReadRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    mbean: &'a str,
    attribute: &'a str,
}

#[derive(Deserialize)]
struct JolokiaResponse {
    status: u16,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Connects to a Jolokia agent.
#[derive(Debug, Clone)]
pub struct JolokiaConnector {
    base: Url,
    credentials: Option<Credentials>,
    timeout: Duration,
}

impl JolokiaConnector {
    /// Validates the agent URL, e.g. `http://localhost:8778/jolokia`.
    pub fn new(address: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base: parse_endpoint(address)?,
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }
}

impl Connector for JolokiaConnector {
    type Connection = JolokiaConnection;

    fn connect(&self) -> Result<JolokiaConnection, ConnectionError> {
        let agent = ureq::AgentBuilder::new().timeout(self.timeout).build();
        let authorization = self.credentials.as_ref().map(basic_auth);

        let version_url = self
            .base
            .join("version")
            .map_err(|e| ConnectionError::Protocol(e.to_string()))?;
        let mut request = agent.get(version_url.as_str());
        if let Some(auth) = &authorization {
            request = request.set("Authorization", auth);
        }

        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code @ (401 | 403), _)) => {
                return Err(ConnectionError::AuthenticationRejected(format!(
                    "HTTP {} from {}",
                    code, version_url
                )));
            }
            Err(ureq::Error::Status(code, _)) => {
                return Err(ConnectionError::Protocol(format!(
                    "HTTP {} from {}",
                    code, version_url
                )));
            }
            Err(ureq::Error::Transport(t)) => {
                return Err(ConnectionError::Unreachable(t.to_string()));
            }
        };

        let body: JolokiaResponse = response
            .into_json()
            .map_err(|e| ConnectionError::Protocol(format!("not a Jolokia agent: {}", e)))?;
        if body.status != 200 {
            return Err(ConnectionError::Protocol(format!(
                "version request returned status {}: {}",
                body.status,
                body.error.unwrap_or_default()
            )));
        }
        let agent_version = body
            .value
            .get("agent")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        debug!(agent = %agent_version, "Jolokia agent answered");

        Ok(JolokiaConnection {
            agent,
            base: self.base.clone(),
            authorization,
        })
    }

    fn endpoint(&self) -> String {
        self.base.to_string()
    }
}

/// Open connection to a Jolokia agent.
pub struct JolokiaConnection {
    agent: ureq::Agent,
    base: Url,
    authorization: Option<String>,
}

impl Connection for JolokiaConnection {
    fn fetch(
        &mut self,
        resource: &ResourceId,
        attribute: &str,
    ) -> Result<AttributeValue, FetchError> {
        let mut request = self
            .agent
            .post(self.base.as_str())
            .set("Content-Type", "application/json");
        if let Some(auth) = &self.authorization {
            request = request.set("Authorization", auth);
        }

        let body = ReadRequest {
            kind: "read",
            mbean: resource.as_str(),
            attribute,
        };
        match request.send_json(&body) {
            Ok(response) => {
                let text = response
                    .into_string()
                    .map_err(|e| FetchError::Transport(e.to_string()))?;
                decode_read_response(&text)
            }
            Err(ureq::Error::Status(code, response)) => {
                // Some agent setups answer errors with a real HTTP status but
                // still carry a Jolokia body.
                let text = response.into_string().unwrap_or_default();
                match decode_read_response(&text) {
                    Err(e @ FetchError::Remote { .. }) => Err(e),
                    _ => Err(FetchError::Remote {
                        status: code,
                        error_type: None,
                        message: format!("HTTP {}", code),
                    }),
                }
            }
            Err(ureq::Error::Transport(t)) => Err(FetchError::Transport(t.to_string())),
        }
    }

    fn close(self) -> Result<(), ConnectionError> {
        // HTTP is stateless; dropping the agent releases pooled sockets.
        drop(self.agent);
        Ok(())
    }
}

/// Validates an agent URL and normalizes its path to end with `/`, so that
/// relative joins (`version`) stay below it.
pub fn parse_endpoint(address: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEndpoint {
        input: address.to_string(),
        reason,
    };

    let mut url = Url::parse(address).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme '{}'", other))),
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// `Authorization` header value for HTTP Basic auth.
pub fn basic_auth(credentials: &Credentials) -> String {
    let token = STANDARD.encode(format!("{}:{}", credentials.username, credentials.password));
    format!("Basic {}", token)
}

/// Decodes the body of a `read` response.
pub fn decode_read_response(body: &str) -> Result<AttributeValue, FetchError> {
    let response: JolokiaResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    if response.status != 200 {
        return Err(FetchError::Remote {
            status: response.status,
            error_type: response.error_type,
            message: response.error.unwrap_or_default(),
        });
    }
    Ok(AttributeValue::from(response.value))
}
