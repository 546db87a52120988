// src/services/submission.rs
//
// Client for the profile API that receives the flattened present/permanent
// address payload pair on form submission.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::address::models::AddressPayload;
use crate::common::generate_submission_id;

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("submission request failed: {0}")]
    RequestFailed(String),

    #[error("profile API rejected submission with status {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub id: String,
    pub submitted_at: DateTime<Utc>,
}

pub struct SubmissionService {
    http: Client,
    base_url: String,
    present_type_id: String,
    permanent_type_id: String,
}

impl SubmissionService {
    pub fn new(
        http: Client,
        base_url: String,
        present_type_id: String,
        permanent_type_id: String,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            present_type_id,
            permanent_type_id,
        }
    }

    /// Address-type identifiers tagged onto the (present, permanent) payloads.
    pub fn address_type_ids(&self) -> (&str, &str) {
        (&self.present_type_id, &self.permanent_type_id)
    }

    pub async fn submit_address(
        &self,
        payloads: &[AddressPayload],
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let url = format!("{}/user/profile/address", self.base_url);

        debug!(count = payloads.len(), "Forwarding address submission");

        let response = self
            .http
            .post(&url)
            .json(payloads)
            .send()
            .await
            .map_err(|e| SubmissionError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SubmissionError::Rejected { status, body });
        }

        let receipt = SubmissionReceipt {
            id: generate_submission_id(),
            submitted_at: Utc::now(),
        };

        info!(receipt_id = %receipt.id, "Address submission accepted");

        Ok(receipt)
    }
}
