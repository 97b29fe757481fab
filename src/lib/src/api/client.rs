//! # API Client - For talking to a RestoreDB server
//!

use crate::config::ApiConfig;
use crate::constants;
use crate::error::RestoreError;
use crate::view::ErrorResponse;
pub use reqwest::Url;
use reqwest::{header, Client, ClientBuilder};
use std::time;

pub mod large_uploads;

const VERSION: &str = crate::constants::RESTOREDB_VERSION;
const USER_AGENT: &str = "RestoreDB";

/// One client per config, reuse it across requests for keep-alive
pub fn new_for_config(config: &ApiConfig) -> Result<Client, RestoreError> {
    match builder_for_config(config)?
        .timeout(time::Duration::from_secs(constants::DEFAULT_TIMEOUT_SECS))
        .build()
    {
        Ok(client) => Ok(client),
        Err(reqwest_err) => Err(RestoreError::HTTP(reqwest_err)),
    }
}

pub fn builder_for_config(config: &ApiConfig) -> Result<ClientBuilder, RestoreError> {
    let builder = builder();

    let Some(api_key) = config.api_key.as_deref() else {
        log::trace!("No api key configured for host: {}", config.host);
        return Ok(builder);
    };

    log::debug!("Setting api key for host: {}", config.host);
    let mut key_value = match header::HeaderValue::from_str(api_key) {
        Ok(header) => header,
        Err(err) => {
            log::debug!("api::client::builder_for_config invalid header value: {}", err);
            return Err(RestoreError::basic_str(
                "Error setting request api key. Please check your RestoreDB config.",
            ));
        }
    };
    key_value.set_sensitive(true);
    let key_name = header::HeaderName::from_bytes(constants::API_KEY_HEADER.as_bytes())
        .map_err(|err| RestoreError::basic_str(format!("Invalid api key header name: {err}")))?;
    let mut headers = header::HeaderMap::new();
    headers.insert(key_name, key_value);
    Ok(builder.default_headers(headers))
}

fn builder() -> ClientBuilder {
    Client::builder().user_agent(user_agent())
}

fn user_agent() -> String {
    format!("{USER_AGENT}/{VERSION} ({})", std::env::consts::OS)
}

/// Returns the body of a 2xx response, otherwise an error carrying the
/// server's message.
pub async fn parse_json_body(url: &str, res: reqwest::Response) -> Result<String, RestoreError> {
    let status = res.status();
    let body = res.text().await?;

    log::debug!("url: {url}\nstatus: {status}\nbody: {body}");

    if status.is_success() {
        return Ok(body);
    }
    Err(RestoreError::remote(status, url, error_message(status, &body)))
}

/// The `error` field of a JSON error body, the raw body otherwise
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(response) = serde_json::from_str::<ErrorResponse>(body) {
        if let Some(msg) = response.error_or_msg() {
            return msg;
        }
    }
    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}

/// Deserialize a successful body, naming the endpoint when it does not fit
pub fn deserialize_body<T: serde::de::DeserializeOwned>(
    url: &str,
    body: &str,
) -> Result<T, RestoreError> {
    match serde_json::from_str(body) {
        Ok(val) => Ok(val),
        Err(err) => Err(RestoreError::unexpected_response(
            url,
            format!("could not deserialize [{err}]\n{body}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_with_api_key() {
        let config = ApiConfig::new("http://localhost:8080", Some("secret_123".to_string()));
        let builder = builder_for_config(&config);
        assert!(builder.is_ok());
        assert!(builder.unwrap().build().is_ok());
    }

    #[test]
    fn test_builder_without_api_key() {
        let config = ApiConfig::new("http://localhost:8080", None);
        assert!(new_for_config(&config).is_ok());
    }

    #[test]
    fn test_builder_invalid_api_key() {
        let config = ApiConfig::new("http://localhost:8080", Some("bad\nkey".to_string()));
        let err = builder_for_config(&config).unwrap_err();
        assert!(err.to_string().contains("Error setting request api key"));
    }

    #[test]
    fn test_error_message_prefers_json_error_field() {
        let status = reqwest::StatusCode::BAD_REQUEST;
        assert_eq!(
            error_message(status, r#"{"error": "Invalid chunk checksum"}"#),
            "Invalid chunk checksum"
        );
        assert_eq!(error_message(status, "upstream timed out"), "upstream timed out");
        assert_eq!(error_message(status, ""), "Bad Request");
    }

    #[test]
    fn test_user_agent_carries_version() {
        assert!(user_agent().starts_with(&format!("RestoreDB/{VERSION}")));
    }
}
