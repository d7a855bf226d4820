//! Network event listener for a browser page.

use crate::capture::{is_static_resource, truncate_body, CapturedRequest, CapturedResponse, TrafficLog};
use crate::error::Result;
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent, EventResponseReceived,
    GetRequestPostDataParams, GetResponseBodyParams, RequestId,
};
use chromiumoxide::Page;
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use tokio::task::JoinHandle;

/// Response metadata waiting for its body to finish loading.
#[derive(Debug, Clone, PartialEq)]
struct PendingResponse {
    url: String,
    status: i64,
    headers: serde_json::Value,
}

/// Pairs `responseReceived` with `loadingFinished` per request id.
///
/// The two events come from separate listeners, so either may be seen
/// first. An entry leaves the tracker once its body is ready or its load
/// fails.
#[derive(Debug, Default)]
struct ResponseTracker {
    /// Non-static requests that have not finished or failed yet.
    open: HashSet<String>,
    /// Metadata received, body still loading.
    pending: HashMap<String, PendingResponse>,
    /// Body finished before its metadata arrived.
    finished_early: HashSet<String>,
}

impl ResponseTracker {
    fn on_request(&mut self, id: &str) {
        self.open.insert(id.to_string());
    }

    /// Returns the metadata when the body is already complete.
    fn on_response(&mut self, id: &str, meta: PendingResponse) -> Option<PendingResponse> {
        if self.finished_early.remove(id) {
            self.open.remove(id);
            return Some(meta);
        }
        self.pending.insert(id.to_string(), meta);
        None
    }

    /// Returns the metadata when it was received before the body finished.
    fn on_finished(&mut self, id: &str) -> Option<PendingResponse> {
        if let Some(meta) = self.pending.remove(id) {
            self.open.remove(id);
            return Some(meta);
        }
        if self.open.contains(id) {
            self.finished_early.insert(id.to_string());
        }
        None
    }

    /// Drop everything known about `id`.
    fn forget(&mut self, id: &str) {
        self.open.remove(id);
        self.pending.remove(id);
        self.finished_early.remove(id);
    }

    fn is_empty(&self) -> bool {
        self.open.is_empty() && self.pending.is_empty() && self.finished_early.is_empty()
    }
}

/// Start recording `page`'s non-static traffic into `log`.
///
/// The returned task runs until the page closes; abort it to stop early.
pub async fn start_recording(page: &Page, log: TrafficLog) -> Result<JoinHandle<()>> {
    let mut requests = page.event_listener::<EventRequestWillBeSent>().await?;
    let mut responses = page.event_listener::<EventResponseReceived>().await?;
    let mut failed = page.event_listener::<EventLoadingFailed>().await?;
    let mut finished = page.event_listener::<EventLoadingFinished>().await?;
    let page = page.clone();

    let handle = tokio::spawn(async move {
        let mut tracker = ResponseTracker::default();

        loop {
            // Drain metadata before completions so a finished body usually
            // finds its response already pending.
            let ready = tokio::select! {
                biased;

                Some(event) = requests.next() => {
                    let request = &event.request;
                    if is_static_resource(&request.url) {
                        continue;
                    }
                    tracker.on_request(event.request_id.inner());

                    let post_data = if request.method == "POST" {
                        request_post_data(&page, &event.request_id).await
                    } else {
                        None
                    };

                    println!("\nREQUEST: {} {}", request.method, request.url);
                    if let Some(data) = &post_data {
                        println!("   Data: {}...", data.chars().take(200).collect::<String>());
                    }

                    log.record_request(CapturedRequest {
                        url: request.url.clone(),
                        method: request.method.clone(),
                        headers: request.headers.inner().clone(),
                        post_data,
                    });
                    continue;
                }
                Some(event) = responses.next() => {
                    let response = &event.response;
                    let id = event.request_id.inner();
                    if is_static_resource(&response.url) {
                        tracker.forget(id);
                        continue;
                    }
                    let meta = PendingResponse {
                        url: response.url.clone(),
                        status: response.status,
                        headers: response.headers.inner().clone(),
                    };
                    tracker.on_response(id, meta).map(|meta| (event.request_id.clone(), meta))
                }
                Some(event) = failed.next() => {
                    tracing::debug!(
                        "Request {} failed: {}",
                        event.request_id.inner(),
                        event.error_text
                    );
                    tracker.forget(event.request_id.inner());
                    continue;
                }
                Some(event) = finished.next() => {
                    tracker
                        .on_finished(event.request_id.inner())
                        .map(|meta| (event.request_id.clone(), meta))
                }
                else => break,
            };

            if let Some((request_id, meta)) = ready {
                record_body(&page, &log, request_id, meta).await;
            }
        }

        tracing::debug!("Network listeners closed");
    });

    Ok(handle)
}

async fn record_body(page: &Page, log: &TrafficLog, request_id: RequestId, meta: PendingResponse) {
    let body = match page.execute(GetResponseBodyParams::new(request_id)).await {
        Ok(reply) => reply.result.body.clone(),
        Err(e) => {
            tracing::debug!("Could not read body of {}: {}", meta.url, e);
            return;
        }
    };

    println!("RESPONSE: {} {}", meta.status, meta.url);
    if !body.is_empty() && body.chars().count() < 1000 {
        println!("   Body: {}...", body.chars().take(300).collect::<String>());
    }

    log.record_response(CapturedResponse {
        url: meta.url,
        status: meta.status,
        headers: meta.headers,
        body: truncate_body(&body),
    });
}

async fn request_post_data(page: &Page, request_id: &RequestId) -> Option<String> {
    match page
        .execute(GetRequestPostDataParams::new(request_id.clone()))
        .await
    {
        Ok(reply) => Some(reply.result.post_data.clone()),
        Err(e) => {
            tracing::debug!("No post data for request {}: {}", request_id.inner(), e);
            None
        }
    }
}
