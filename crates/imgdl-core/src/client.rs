//! Shared HTTP client setup

use crate::error::ImgdlError;
use imgdl_types::Settings;
use reqwest::{Client, Response};
use std::time::Duration;

/// Build the client used for every outbound request.
///
/// Connecting, and each wait for response data, is capped by
/// `fetch_timeout_secs`. A slow transfer that keeps delivering bytes is
/// never cut off. There is no retry.
pub fn build_client(settings: &Settings) -> Result<Client, ImgdlError> {
    let timeout = Duration::from_secs(settings.fetch_timeout_secs);
    let client = Client::builder()
        .user_agent(settings.user_agent.as_str())
        .connect_timeout(timeout)
        .read_timeout(timeout)
        .build()?;
    Ok(client)
}

/// Turn a non-2xx response into [`ImgdlError::ServerError`]
pub fn check_status(response: Response) -> Result<Response, ImgdlError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    Err(ImgdlError::ServerError {
        status: status.as_u16(),
        message: status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string(),
    })
}
