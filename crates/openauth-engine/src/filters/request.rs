//! Request filter: delegates the decision to a remote validation service.
//!
//! The filter forwards a whitelisted subset of the JSON body to the service
//! with one `POST`. A 200 answer must be an object with a boolean `allow`.
//! Its remaining fields are merged into the collected data. Anything else
//! (non-200, transport failure, timeout, unparseable answer) is a rejection.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;
use serde_json::{Map, Value};
use tracing::debug;

use openauth_core::RequestFilterSpec;

use crate::error::{RejectReason, UpstreamError};
use crate::filters::{FilterEnvironment, FilterOutcome};
use crate::request::{FilterContext, RequestView};

/// Field of the remote answer carrying the decision.
pub const ALLOW_FIELD: &str = "allow";

/// Remote validation filter.
#[derive(Debug, Clone)]
pub struct RequestFilter {
    name: String,
    endpoint: Url,
    headers: HeaderMap,
    fields_to_forward: Vec<String>,
    client: reqwest::Client,
    timeout: Duration,
}

impl RequestFilter {
    /// Build from a spec, sharing the environment's HTTP client.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the endpoint is not an
    /// `http(s)` URL, a header name or value is invalid, or no fields are
    /// forwarded.
    pub fn new(name: String, spec: &RequestFilterSpec, env: &FilterEnvironment) -> Result<Self, String> {
        let endpoint = Url::parse(&spec.remote_endpoint)
            .map_err(|e| format!("invalid remote_endpoint `{}`: {e}", spec.remote_endpoint))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(format!(
                "remote_endpoint `{}` must be http or https",
                spec.remote_endpoint
            ));
        }

        let mut headers = HeaderMap::new();
        for (key, value) in &spec.outbound_headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| format!("invalid header name `{key}`"))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| format!("invalid value for header `{key}`"))?;
            headers.insert(name, value);
        }

        if spec.fields_to_forward.is_empty() {
            return Err("fields_to_forward must not be empty".to_string());
        }

        Ok(Self {
            name,
            endpoint,
            headers,
            fields_to_forward: spec.fields_to_forward.clone(),
            client: env.client().clone(),
            timeout: env.timeout(),
        })
    }

    /// Filter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The outbound payload for a request body: exactly the forwarded
    /// fields that are present.
    #[must_use]
    pub fn outbound_payload(&self, body: &Map<String, Value>) -> Map<String, Value> {
        self.fields_to_forward
            .iter()
            .filter_map(|field| body.get(field).map(|v| (field.clone(), v.clone())))
            .collect()
    }

    /// Run the filter. Issues at most one outbound call and never retries.
    pub async fn process(&self, req: &RequestView, ctx: &mut FilterContext) -> FilterOutcome {
        let Some(body) = req.json_object() else {
            return FilterOutcome::Reject(RejectReason::MalformedBody);
        };

        match self.call(&self.outbound_payload(&body)).await {
            Ok(Some(extra)) => {
                debug!(filter = %self.name, "Remote validation allowed request");
                ctx.collected.extend(extra);
                FilterOutcome::Allow
            }
            Ok(None) => {
                debug!(filter = %self.name, "Remote validation denied request");
                FilterOutcome::Reject(RejectReason::Denied)
            }
            Err(e) => {
                debug!(filter = %self.name, error = %e, "Remote validation failed");
                FilterOutcome::Reject(RejectReason::Upstream(e))
            }
        }
    }

    /// Returns the extra answer fields when allowed, `None` when denied.
    async fn call(&self, payload: &Map<String, Value>) -> Result<Option<Map<String, Value>>, UpstreamError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(self.headers.clone())
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UpstreamError::Timeout
                } else {
                    UpstreamError::Transport(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(UpstreamError::Status(status));
        }

        let answer = response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout
            } else {
                UpstreamError::InvalidResponse(e.to_string())
            }
        })?;

        let Value::Object(mut answer) = answer else {
            return Err(UpstreamError::InvalidResponse("answer is not an object".to_string()));
        };

        match answer.remove(ALLOW_FIELD) {
            Some(Value::Bool(true)) => Ok(Some(answer)),
            Some(Value::Bool(false)) => Ok(None),
            _ => Err(UpstreamError::InvalidResponse(format!(
                "answer has no boolean `{ALLOW_FIELD}` field"
            ))),
        }
    }
}
