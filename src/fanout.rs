//! Bounded-concurrency batch fetcher
//!
//! [`Dispatcher::dispatch`] issues one GET per URL through a shared client,
//! keeping at most `max_concurrent` requests in flight regardless of batch
//! size. Results are placed by input index, so the output order matches the
//! input order independent of completion order.
//!
//! The batch is all-or-nothing: the first failed fetch makes `dispatch`
//! return immediately with that error. Dropping the buffered stream cancels
//! every in-flight request at its next I/O suspension point and prevents
//! queued ones from starting. There are no retries.

use std::time::Duration;

use anyhow::Result;
use futures::{StreamExt, stream};
use reqwest::Client;

use crate::error::FetchError;

/// Concurrent fan-out dispatcher over a shared HTTP client
pub struct Dispatcher {
    client: Client,
    max_concurrent: usize,
}

impl Dispatcher {
    /// Create a dispatcher whose outbound calls are each bounded by
    /// `timeout`, with at most `max_concurrent` of them in flight.
    pub fn new(timeout: Duration, max_concurrent: usize) -> Result<Self> {
        anyhow::ensure!(max_concurrent > 0, "max_concurrent must be at least 1");

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Dispatcher {
            client,
            max_concurrent,
        })
    }

    /// Fetch every URL and return the bodies in input order
    ///
    /// # Errors
    ///
    /// Returns the first [`FetchError`] encountered; under simultaneous
    /// failures whichever completes first wins. On error no partial results
    /// are returned and outstanding fetches are cancelled.
    pub async fn dispatch(&self, urls: &[String]) -> Result<Vec<String>, FetchError> {
        let mut bodies = vec![String::new(); urls.len()];

        let mut fetches = stream::iter(urls.iter().cloned().enumerate())
            .map(|(i, url)| {
                let client = self.client.clone();
                async move {
                    let body = fetch_one(&client, &url).await?;
                    Ok::<_, FetchError>((i, body))
                }
            })
            .buffer_unordered(self.max_concurrent);

        while let Some(fetched) = fetches.next().await {
            // Returning here drops the stream, cancelling everything still
            // in flight and everything not yet started.
            let (i, body) = fetched?;
            bodies[i] = body;
        }

        Ok(bodies)
    }
}

/// Issue one GET and return the response body
///
/// A non-2xx status, transport error, or body-read error all count as a
/// failed fetch.
async fn fetch_one(client: &Client, url: &str) -> Result<String, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status,
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

    Ok(String::from_utf8_lossy(&body).into_owned())
}
