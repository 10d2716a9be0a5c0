use futures::StreamExt;
use std::time::Duration;

use super::FetchError;

const DEFAULT_USER_AGENT: &str = "rss-builder";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_PAGE_BYTES: usize = 5 * 1024 * 1024; // 5MB

/// Immutable HTTP configuration shared by every source.
///
/// Sources build their own client from it on each fetch, so no connection
/// state is shared between concurrently running sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    /// Sent as the `User-Agent` header on every request
    pub user_agent: String,
    /// Whole-request timeout, including the body
    pub timeout: Duration,
    /// Largest body accepted, in bytes
    pub max_page_bytes: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_page_bytes: DEFAULT_MAX_PAGE_BYTES,
        }
    }
}

impl HttpSettings {
    pub fn client(&self) -> Result<reqwest::Client, FetchError> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.as_str())
            .timeout(self.timeout)
            .build()
            .map_err(FetchError::Client)
    }
}

/// GET `url` and return the body as text.
///
/// # Errors
///
/// - [`FetchError::Network`] / [`FetchError::Timeout`] - transport failures
/// - [`FetchError::HttpStatus`] - anything but 200 OK
/// - [`FetchError::ResponseTooLarge`] - body over `limit` bytes
/// - [`FetchError::IncompleteResponse`] - body shorter than Content-Length
pub(crate) async fn get_page(
    client: &reqwest::Client,
    url: &str,
    limit: usize,
) -> Result<String, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(FetchError::from_request)?;

    if response.status() != reqwest::StatusCode::OK {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    let bytes = read_limited_bytes(response, limit).await?;
    Ok(decode_body(bytes, url))
}

/// Invalid UTF-8 sequences become U+FFFD rather than failing the page.
fn decode_body(bytes: Vec<u8>, url: &str) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "Body is not valid UTF-8, replacing invalid bytes");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::from_request)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
