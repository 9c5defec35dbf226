use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::models::{Cdp, InitializeSummary};
use crate::orchestrator::{Category, Dispatch, OpState, Orchestrator, Ticket};

pub const INITIALIZE_FAILED: &str = "Failed to initialize documentation. Please try again.";

impl Orchestrator {
    /// Ask the backend to (re)build the index for `cdp`. Rejected while
    /// another initialize or query is pending. On success the health status
    /// is refreshed once. The backend call and refresh finish even if the
    /// returned future is dropped.
    #[instrument(skip(self))]
    pub async fn initialize(&self, cdp: Cdp) -> Dispatch {
        let ticket = match self
            .begin_exclusive(Category::Initialize, |ui| {
                ui.error = None;
                ui.notice = None;
            })
            .await
        {
            Ok(ticket) => ticket,
            Err(rejection) => {
                debug!("Initialize {} rejected: {:?}", cdp, rejection);
                return Dispatch::Rejected(rejection);
            }
        };

        info!("Initializing documentation for {}", cdp);
        let this = self.clone();
        self.detach(Category::Initialize, async move {
            this.run_initialize(ticket, cdp).await
        })
        .await
    }

    async fn run_initialize(&self, ticket: Ticket, cdp: Cdp) -> Dispatch {
        let start_time = std::time::Instant::now();
        let path = format!("/initialize/{}", cdp);
        match self.inner.gateway.call(&path, Method::POST, None).await {
            Ok(body) => {
                let summary = summary_from(cdp, &body);
                let notice = body
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        format!("Indexed {} documents for {}", summary.document_count, cdp)
                    });
                info!(
                    "Indexed {} documents for {} in {:?}",
                    summary.document_count,
                    cdp,
                    start_time.elapsed()
                );

                let dispatch = self
                    .complete(ticket, |ui| {
                        ui.set_op(Category::Initialize, OpState::Succeeded);
                        ui.notice = Some(notice);
                        ui.last_initialized = Some(summary);
                    })
                    .await;

                // Document counts changed on the backend either way.
                self.poll_health().await;
                dispatch
            }
            Err(e) => {
                warn!(
                    status = ?e.status,
                    backend_message = ?e.backend_message(),
                    suggestions = ?e.suggestions(),
                    "Initialize {} failed: {}",
                    cdp,
                    e
                );
                self.complete(ticket, |ui| {
                    ui.set_op(Category::Initialize, OpState::Failed);
                    ui.error = Some(INITIALIZE_FAILED.to_string());
                })
                .await
            }
        }
    }
}

fn summary_from(cdp: Cdp, body: &Value) -> InitializeSummary {
    let details = body.get("details");
    InitializeSummary {
        cdp,
        document_count: details
            .and_then(|d| d.get("document_count"))
            .and_then(Value::as_u64)
            .unwrap_or(0),
        timestamp: details
            .and_then(|d| d.get("timestamp"))
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}
