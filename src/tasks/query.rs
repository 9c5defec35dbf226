use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::models::Cdp;
use crate::normalize::normalize;
use crate::orchestrator::{Category, Dispatch, OpState, Orchestrator, Rejection, Ticket};

pub const QUERY_FAILED: &str = "Failed to get a response. Please try again.";
pub const NO_RESULTS: &str = "No results found. Try rephrasing your question.";

impl Orchestrator {
    /// Search `cdp` for `text`. The previous result and error are cleared as
    /// soon as the call starts.
    #[instrument(skip(self))]
    pub async fn query(&self, cdp: Cdp, text: &str) -> Dispatch {
        let text = text.trim();
        if text.is_empty() {
            return Dispatch::Rejected(Rejection::EmptyQuery);
        }

        let ticket = match self
            .begin_exclusive(Category::Query, |ui| {
                ui.result = None;
                ui.error = None;
                ui.notice = None;
            })
            .await
        {
            Ok(ticket) => ticket,
            Err(rejection) => {
                debug!("Query on {} rejected: {:?}", cdp, rejection);
                return Dispatch::Rejected(rejection);
            }
        };

        let body = json!({ "cdp": cdp, "query": text });
        let this = self.clone();
        self.detach(Category::Query, async move { this.run_query(ticket, cdp, body).await })
            .await
    }

    async fn run_query(&self, ticket: Ticket, cdp: Cdp, body: Value) -> Dispatch {
        let start_time = std::time::Instant::now();

        match self.inner.gateway.call("/query", Method::POST, Some(body)).await {
            Ok(payload) => match payload.get("response").filter(|r| !r.is_null()) {
                Some(raw) => {
                    let result = normalize(raw);
                    info!(
                        "Query on {} answered in {:?}: {}",
                        cdp,
                        start_time.elapsed(),
                        result.title
                    );
                    self.complete(ticket, |ui| {
                        ui.set_op(Category::Query, OpState::Succeeded);
                        ui.result = Some(result);
                    })
                    .await
                }
                None => {
                    let backend_error = payload.get("error").and_then(Value::as_str);
                    debug!(
                        backend_error = ?backend_error,
                        "Query on {} returned no response",
                        cdp
                    );
                    self.complete(ticket, |ui| {
                        ui.set_op(Category::Query, OpState::Failed);
                        ui.error = Some(NO_RESULTS.to_string());
                    })
                    .await
                }
            },
            Err(e) => {
                warn!(
                    status = ?e.status,
                    backend_message = ?e.backend_message(),
                    "Query on {} failed: {}",
                    cdp,
                    e
                );
                self.complete(ticket, |ui| {
                    ui.set_op(Category::Query, OpState::Failed);
                    ui.error = Some(QUERY_FAILED.to_string());
                })
                .await
            }
        }
    }
}
