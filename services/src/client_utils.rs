use crate::ServiceError;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

/// Create a JSON request, parse the response.
/// Throws error on non OK status code.
pub(crate) async fn send_json<T: Serialize, R: DeserializeOwned>(
    client: &Client,
    url: &str,
    data: &T,
    headers: reqwest::header::HeaderMap,
) -> Result<R, ServiceError> {
    let response = client.post(url).headers(headers).json(data).send().await?;
    if response.status().is_success() {
        Ok(response.json::<R>().await?)
    } else {
        Err(ServiceError::StatusCode(
            response.status(),
            response.text().await.unwrap_or_default(),
        ))
    }
}

pub(crate) fn bearer_headers(
    api_key: &str,
    provider: &'static str,
) -> Result<reqwest::header::HeaderMap, ServiceError> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::AUTHORIZATION,
        format!("Bearer {api_key}").parse().map_err(|_| {
            ServiceError::Invariant(provider, "API key is not a valid header value".to_string())
        })?,
    );
    Ok(headers)
}
