use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::config::Config;
use crate::utils::AppError;

/// Cliente do Supabase (PostgREST em `/rest/v1`, GoTrue em `/auth/v1`).
///
/// Only talks HTTP; the typed operations live in the services that wrap it.
#[derive(Clone)]
pub struct Supabase {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl Supabase {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
        })
    }

    /// Request against a PostgREST table. Without a user token the anon key
    /// is used as bearer, which is what the public display reads with.
    pub fn rest(&self, method: Method, table: &str, access_token: Option<&str>) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        let bearer = access_token.unwrap_or(&self.anon_key);

        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
            .header(header::ACCEPT, "application/json")
    }

    pub fn auth(&self, method: Method, path: &str, access_token: Option<&str>) -> RequestBuilder {
        let url = format!("{}/auth/v1/{}", self.base_url, path.trim_start_matches('/'));
        let request = self
            .client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .header(header::ACCEPT, "application/json");

        match access_token {
            Some(token) => request.header(header::AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }

    /// Sends the request and decodes a JSON body, mapping non-2xx answers
    /// into `AppError`.
    pub async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, AppError> {
        let response = Self::send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| AppError::Network(format!("Failed to parse backend response: {}", e)))
    }

    pub async fn send(request: RequestBuilder) -> Result<Response, AppError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(error_from_status(status.as_u16(), &body))
    }
}

/// Corpo de erro do PostgREST (`message`) ou do GoTrue
/// (`error_description`, `msg`, `error`).
#[derive(Debug, Deserialize, Default)]
struct BackendErrorBody {
    message: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
    error: Option<String>,
}

pub(crate) fn error_from_status(status: u16, body: &str) -> AppError {
    let parsed: BackendErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .or(parsed.error_description)
        .or(parsed.msg)
        .or(parsed.error)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("HTTP {}", status)
            } else {
                body.trim().to_string()
            }
        });

    match status {
        401 | 403 => AppError::Unauthorized(message),
        404 => AppError::NotFound(message),
        _ => AppError::Backend { status, message },
    }
}
