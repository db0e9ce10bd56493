use std::time::Duration;

use reqwest::Client;
use tokio::time::sleep;
use tracing::warn;

/// Fixed pause between consecutive requests, to stay polite with the mirror.
pub const REQUEST_DELAY: Duration = Duration::from_millis(500);

const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;

/// Fetch one filing document. An empty URL short-circuits to an empty string
/// without a request, and any failure left after retries also yields an empty
/// string: a missing document is a per-filing condition, not a batch error.
pub async fn fetch_document(client: &Client, url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }

    for attempt in 0..=MAX_RETRIES {
        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(text) => return text,
                Err(err) => warn!(url, %err, "failed to read response body"),
            },
            Ok(resp) if retryable(resp.status()) => {
                warn!(url, status = %resp.status(), "retryable HTTP status");
            }
            Ok(resp) => {
                warn!(url, status = %resp.status(), "HTTP error, skipping document");
                return String::new();
            }
            Err(err) => warn!(url, %err, "request failed"),
        }
        if attempt < MAX_RETRIES {
            sleep(Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt))).await;
        }
    }

    warn!(url, "exhausted retries, treating document as missing");
    String::new()
}

fn retryable(status: reqwest::StatusCode) -> bool {
    status.as_u16() == 429 || status.is_server_error()
}

// ── Tests ──
