// src/fetch/mod.rs
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info, instrument};
use url::Url;

use crate::process::RawTable;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid URL {0:?}: {1}")]
    Url(String, url::ParseError),

    #[error("GET {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not parse CSV from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: anyhow::Error,
    },
}

/// HTTP client with a whole-request timeout.
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

/// Download `url` and parse the body as a CSV with a header row.
/// Non-2xx responses and timeouts are errors; there are no retries.
#[instrument(level = "info", skip(client))]
pub async fn download_csv(client: &Client, url: &str) -> Result<RawTable, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::Url(url.to_string(), e))?;
    let request_err = |source| FetchError::Request {
        url: url.to_string(),
        source,
    };

    let bytes = client
        .get(parsed)
        .send()
        .await
        .map_err(request_err)?
        .error_for_status()
        .map_err(request_err)?
        .bytes()
        .await
        .map_err(request_err)?;
    debug!(bytes = bytes.len(), "downloaded");

    let table = RawTable::from_reader(bytes.as_ref()).map_err(|source| FetchError::Parse {
        url: url.to_string(),
        source,
    })?;
    info!(
        columns = table.headers.len(),
        rows = table.rows.len(),
        "parsed CSV"
    );
    Ok(table)
}
