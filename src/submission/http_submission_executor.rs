use std::time::Duration;

use reqwest::{Client, StatusCode, header::CONTENT_TYPE};
use url::Url;

use crate::{ConstructionError, Document, SubmissionError, SubmissionExecutor};

/// Endpoint used when [`GatewayOptions::endpoint`](crate::GatewayOptions::endpoint) is not set.
pub const DEFAULT_ENDPOINT: &str = "https://ismp.crpt.ru/api/v3/lk/documents/create";

/// [`SubmissionExecutor`] that POSTs the document as JSON over HTTP.
///
/// Sends `Content-Type: application/json` and `Authorization: Bearer <token>`.
/// Only `200 OK` counts as success.
#[derive(Clone, Debug)]
pub struct HttpSubmissionExecutor {
    client: Client,
    endpoint: Url,
}

impl HttpSubmissionExecutor {
    /// Builds an executor for `endpoint`.
    ///
    /// `request_timeout` bounds each whole exchange; `None` means no timeout.
    ///
    /// # Errors
    ///
    /// [`ConstructionError::HttpClient`] if the client cannot be built.
    pub fn new(endpoint: Url, request_timeout: Option<Duration>) -> Result<Self, ConstructionError> {
        let mut builder = Client::builder();

        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(ConstructionError::HttpClient)?;

        Ok(Self { client, endpoint })
    }

    /// Target URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl SubmissionExecutor for HttpSubmissionExecutor {
    async fn execute(&self, token: &str, document: &Document) -> Result<(), SubmissionError> {
        let body = document.to_json()?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .bearer_auth(token)
            .body(body)
            .send()
            .await?;

        let status = response.status();

        tracing::debug!(
            status = status.as_u16(),
            doc_id = %document.doc_id,
            "document submission answered"
        );

        if status != StatusCode::OK {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());

            return Err(SubmissionError::RemoteRejected {
                status_code: status.as_u16(),
                body,
            });
        }

        Ok(())
    } // end method execute
}
