//! Implements the `ApiClient` trait against the Monzo REST API using `reqwest`.

use crate::api::files::SecretFile;
use crate::api::oauth::{self, OAuthEndpoints};
use crate::api::{ApiClient, ApiResponse, WHOAMI};
use crate::{ClientError, Config, Result};
use anyhow::Context;
use reqwest::RequestBuilder;
use serde_json::Value;
use tracing::{debug, trace};

/// Talks to the Monzo API with a bearer token obtained through the OAuth flow.
pub(super) struct MonzoClient {
    config: Config,
    secret: SecretFile,
    http: reqwest::Client,
    access_token: Option<String>,
}

impl MonzoClient {
    /// Loads the client credentials. No request is made until `start_auth` is called.
    pub(super) async fn new(config: Config) -> Result<Self> {
        let secret = SecretFile::load(&config.client_secret_path()).await?;
        // The token endpoint must not be followed through redirects.
        let http = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Unable to build the HTTP client")?;
        Ok(Self {
            config,
            secret,
            http,
            access_token: None,
        })
    }

    fn token(&self) -> Result<&str> {
        Ok(self.access_token.as_deref().ok_or(ClientError::NotReady)?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url().trim_end_matches('/'), path)
    }
}

#[async_trait::async_trait]
impl ApiClient for MonzoClient {
    async fn start_auth(&mut self) -> Result<()> {
        let redirect_uri = self.config.redirect_uri();
        let endpoints = OAuthEndpoints {
            auth_url: self.config.auth_url(),
            token_url: self.config.token_url(),
            redirect_port: self.config.redirect_port(),
            redirect_uri: &redirect_uri,
        };
        let token = oauth::run_oauth_flow(&endpoints, &self.secret, &self.http).await?;
        self.access_token = Some(token);
        Ok(())
    }

    async fn test_api_call(&mut self) -> Result<Value> {
        let response = self.get(WHOAMI, &[]).await?;
        if !response.success {
            return Err(ClientError::request("Test API call", response.status, response.body).into());
        }
        Ok(response.body)
    }

    async fn get(&mut self, path: &str, params: &[(&str, &str)]) -> Result<ApiResponse> {
        trace!("GET {path} {params:?}");
        let request = self
            .http
            .get(self.url(path))
            .bearer_auth(self.token()?)
            .query(params);
        send(request, "GET", path).await
    }

    async fn put(&mut self, path: &str, body: &Value) -> Result<ApiResponse> {
        trace!("PUT {path} {body}");
        let request = self
            .http
            .put(self.url(path))
            .bearer_auth(self.token()?)
            .json(body);
        send(request, "PUT", path).await
    }
}

/// Sends `request` and folds the response into an `ApiResponse`. Only transport failures are
/// returned as `Err`.
async fn send(request: RequestBuilder, method: &str, path: &str) -> Result<ApiResponse> {
    let response = request
        .send()
        .await
        .with_context(|| format!("Failed to send {method} {path}"))?;
    let status = response.status();
    let text = response
        .text()
        .await
        .with_context(|| format!("Failed to read the response body of {method} {path}"))?;
    debug!("{method} {path} returned {status}");
    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
    Ok(ApiResponse {
        success: status.is_success(),
        status: status.as_u16(),
        body,
    })
}
