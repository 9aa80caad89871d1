//! Instrumented HTTP client.
//!
//! Wraps `reqwest` so every outbound call is timed, tagged with an
//! `x-trace-id` header and recorded in the [`MetricsAggregator`]. Transport
//! failures are recorded too, with status 0 and the error message.

use std::sync::Arc;
use std::time::Instant;

use reqwest::{Client, Method, Response};
use tracing::debug;

use crate::domain::{CallOutcome, TraceId};
use crate::error::Result;
use crate::service::MetricsAggregator;

/// Header carrying the per-call trace id.
pub const TRACE_HEADER: &str = "x-trace-id";

/// HTTP client that feeds every call into a [`MetricsAggregator`].
#[derive(Clone)]
pub struct InstrumentedClient {
    client: Client,
    aggregator: Arc<MetricsAggregator>,
    /// Extra attempts after a transport failure or 5xx response.
    max_retries: u32,
}

impl InstrumentedClient {
    #[must_use]
    pub fn new(aggregator: Arc<MetricsAggregator>) -> Self {
        Self {
            client: Client::new(),
            aggregator,
            max_retries: 0,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// `GET url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails at the transport level.
    pub async fn get(&self, url: &str) -> Result<Response> {
        self.execute(Method::GET, url, None).await
    }

    /// Send a request and record exactly one call for it.
    ///
    /// Retries share the trace id; the recorded duration spans all attempts.
    /// HTTP error statuses are returned as responses, not errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the final attempt fails at the transport level.
    pub async fn execute(&self, method: Method, url: &str, body: Option<Vec<u8>>) -> Result<Response> {
        let trace_id = TraceId::generate();
        let started = Instant::now();
        let mut retries = 0;

        loop {
            let mut request = self
                .client
                .request(method.clone(), url)
                .header(TRACE_HEADER, trace_id.as_str());
            if let Some(body) = &body {
                request = request.body(body.clone());
            }

            let result = request.send().await;
            let retryable = match &result {
                Ok(response) => response.status().is_server_error(),
                Err(_) => true,
            };
            if retryable && retries < self.max_retries {
                retries += 1;
                debug!(%method, url, retries, trace_id = %trace_id, "Retrying request");
                continue;
            }

            let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
            let mut outcome = match &result {
                Ok(response) => {
                    let outcome =
                        CallOutcome::new(method.as_str(), url, response.status().as_u16(), duration_ms);
                    match response.content_length() {
                        Some(bytes) => outcome.with_response_size(bytes),
                        None => outcome,
                    }
                }
                Err(e) => CallOutcome::new(method.as_str(), url, 0, duration_ms)
                    .with_error_message(e.to_string()),
            }
            .with_trace_id(trace_id.clone());

            if let Some(body) = &body {
                outcome = outcome.with_request_size(body.len() as u64);
            }
            if retries > 0 {
                outcome = outcome.with_retry_count(retries);
            }
            self.aggregator.record_call(outcome);

            return Ok(result?);
        }
    }
}
