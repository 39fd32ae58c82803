use std::time::Duration;

use capbot_contracts::error::CommandError;
use reqwest::blocking::Client;

/// Thin blocking downloader. One GET per call, no retries; transport
/// errors, timeouts and non-2xx statuses all collapse into a single fetch
/// error for the command boundary to report.
#[derive(Debug, Clone)]
pub(crate) struct Fetcher {
    http: Client,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    pub fn fetch(&self, url: &str) -> Result<Vec<u8>, CommandError> {
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|err| CommandError::Fetch(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(CommandError::Fetch(format!("HTTP status {status}")));
        }
        let bytes = response
            .bytes()
            .map_err(|err| CommandError::Fetch(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}
