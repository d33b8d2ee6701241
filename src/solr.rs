//! Solr update client.
//!
//! One fixed-shape update command per document. Documents become searchable
//! within the `commitWithin` window rather than being committed
//! synchronously.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::error::PipelineError;

pub struct SolrClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct UpdateEnvelope<'a> {
    add: AddCommand<'a>,
}

#[derive(Serialize)]
struct AddCommand<'a> {
    doc: &'a Value,
    boost: f64,
    overwrite: bool,
    #[serde(rename = "commitWithin")]
    commit_within: u64,
}

/// Outcome of one submission attempt that reached Solr and got a response.
#[derive(Debug)]
pub struct SubmissionOutcome {
    /// `responseHeader.status` from the response body; 0 means success.
    pub status: i64,
    /// Full response body, for failure logging.
    pub body: Value,
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        self.status == 0
    }

    /// Response rendered as `key=value` pairs, the form failures are logged
    /// in.
    pub fn detail(&self) -> String {
        match &self.body {
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(", "),
            other => other.to_string(),
        }
    }
}

impl SolrClient {
    /// Build a client for the Solr instance at `base_url`, with a per-request
    /// timeout so one unreachable endpoint cannot hang the whole batch.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Update endpoint for a core.
    pub fn update_url(&self, core: &str) -> String {
        format!("{}/solr/{}/update", self.base_url, core)
    }

    /// Submit one document to `core`.
    ///
    /// Transport failures (connect errors, timeouts) and unparseable
    /// responses are `Submission` errors; a response with a non-zero status
    /// is returned as a non-success outcome for the caller to log and count.
    /// Neither is retried here.
    pub async fn submit(
        &self,
        core: &str,
        key: &str,
        doc: &Value,
    ) -> std::result::Result<SubmissionOutcome, PipelineError> {
        let envelope = UpdateEnvelope {
            add: AddCommand {
                doc,
                boost: 1.0,
                overwrite: true,
                commit_within: 1000,
            },
        };

        let response = self
            .client
            .post(self.update_url(core))
            .json(&envelope)
            .send()
            .await
            .map_err(|e| PipelineError::Submission {
                key: key.to_string(),
                detail: e.to_string(),
            })?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| PipelineError::Submission {
                key: key.to_string(),
                detail: format!("unparseable response: {e}"),
            })?;

        let status = body
            .pointer("/responseHeader/status")
            .and_then(Value::as_i64)
            .ok_or_else(|| PipelineError::Submission {
                key: key.to_string(),
                detail: format!("response without responseHeader.status: {body}"),
            })?;

        Ok(SubmissionOutcome { status, body })
    }
}
