//! OAuth 2.0 authorization-code flow against the Monzo auth server.
//!
//! This module handles:
//! - Building the authorization URL with a random CSRF state
//! - Receiving the browser redirect on a one-shot local callback server
//! - Exchanging the authorization code for an access token
//!
//! The token is only held in memory. There is no refresh token handling.

use crate::api::files::SecretFile;
use crate::config::REDIRECT_HOST;
use crate::Result;
use anyhow::{bail, Context};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl,
    TokenResponse, TokenUrl,
};
use std::convert::Infallible;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, trace};

const CALLBACK_PATH: &str = "/callback";

/// Where the OAuth flow should send the user and where it expects them back.
pub(super) struct OAuthEndpoints<'a> {
    pub(super) auth_url: &'a str,
    pub(super) token_url: &'a str,
    pub(super) redirect_port: u16,
    pub(super) redirect_uri: &'a str,
}

/// Runs the complete OAuth consent flow and returns the access token.
///
/// This function:
/// 1. Starts a local HTTP listener on `127.0.0.1:<redirect_port>`
/// 2. Prints the Monzo authorization URL for the user to open
/// 3. Waits for the redirect carrying the authorization code
/// 4. Exchanges the code for an access token
/// 5. Waits for the user to approve API access in the Monzo app
///
/// # Errors
/// Returns an error if any step fails (port in use, state mismatch, denied consent, network
/// errors, rejected code, etc.)
pub(super) async fn run_oauth_flow(
    endpoints: &OAuthEndpoints<'_>,
    secret: &SecretFile,
    http: &reqwest::Client,
) -> Result<String> {
    info!("Starting OAuth2 flow...");

    let client = BasicClient::new(ClientId::new(secret.client_id().to_string()))
        .set_client_secret(ClientSecret::new(secret.client_secret().to_string()))
        .set_auth_type(AuthType::RequestBody)
        .set_auth_uri(AuthUrl::new(endpoints.auth_url.to_string()).context("Invalid auth URL")?)
        .set_token_uri(
            TokenUrl::new(endpoints.token_url.to_string()).context("Invalid token URL")?,
        )
        .set_redirect_uri(
            RedirectUrl::new(endpoints.redirect_uri.to_string()).context("Invalid redirect URI")?,
        );

    let listener = TcpListener::bind((REDIRECT_HOST, endpoints.redirect_port))
        .await
        .with_context(|| {
            format!(
                "Unable to listen for the OAuth callback on port {}",
                endpoints.redirect_port
            )
        })?;

    let (authorize_url, csrf_state) = client.authorize_url(CsrfToken::new_random).url();
    info!("Open this URL in your browser to authorise access:");
    println!("\n{authorize_url}\n");
    info!("Waiting for the redirect on {}", endpoints.redirect_uri);

    let callback = wait_for_callback(listener).await?;
    let code = callback.authorization_code(csrf_state.secret())?;
    debug!("Received the authorization code, exchanging it for a token");

    let token = client
        .exchange_code(AuthorizationCode::new(code))
        .request_async(http)
        .await
        .context("Failed to exchange the authorization code for a token")?;

    info!("Authorisation successful! Approve API access in the Monzo app, then press Enter.");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Unable to read from stdin")?;

    Ok(token.access_token().secret().to_string())
}

/// The query parameters of the OAuth redirect.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Callback {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

impl Callback {
    /// Parses the redirect. Returns `None` for requests to any other path, e.g. `/favicon.ico`.
    fn parse(path: &str, query: Option<&str>) -> Option<Self> {
        if path != CALLBACK_PATH {
            return None;
        }
        let mut callback = Callback::default();
        for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            match key.as_ref() {
                "code" => callback.code = Some(value.into_owned()),
                "state" => callback.state = Some(value.into_owned()),
                "error" => callback.error = Some(value.into_owned()),
                _ => {}
            }
        }
        Some(callback)
    }

    /// Checks the CSRF state and returns the authorization code.
    fn authorization_code(self, expected_state: &str) -> Result<String> {
        if let Some(error) = self.error {
            bail!("The authorisation was not granted: {error}");
        }
        if self.state.as_deref() != Some(expected_state) {
            bail!("The OAuth state in the redirect does not match, refusing the authorization code");
        }
        self.code
            .context("The OAuth redirect did not include an authorization code")
    }
}

/// Serves connections on `listener` until one of them is the OAuth redirect. Each connection is
/// served on its own task, so an idle connection opened ahead of time by the browser does not hold
/// up the redirect. Connections still open when the redirect arrives are aborted.
async fn wait_for_callback(listener: TcpListener) -> Result<Callback> {
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) =
                    accepted.context("Failed to accept the OAuth callback connection")?;
                trace!("OAuth callback connection from {peer}");
                connections.spawn(serve_connection(stream));
            }
            Some(joined) = connections.join_next() => match joined {
                Ok(Some(callback)) => return Ok(callback),
                Ok(None) => {}
                Err(e) => debug!("OAuth callback connection task failed: {e}"),
            },
        }
    }
}

/// Answers the requests on a single connection. Returns the redirect once the response to it has
/// been written, or `None` if the connection carried something else.
async fn serve_connection(stream: TcpStream) -> Option<Callback> {
    let (tx, mut rx) = mpsc::channel::<Callback>(1);
    let service = service_fn(move |req: Request<Incoming>| {
        let tx = tx.clone();
        async move {
            let callback = Callback::parse(req.uri().path(), req.uri().query());
            let (status, text) = match callback {
                Some(callback) => {
                    let _ = tx.try_send(callback);
                    (
                        StatusCode::OK,
                        "Monzo authorisation received. You can close this window.",
                    )
                }
                None => (StatusCode::NOT_FOUND, "Not found"),
            };
            let mut response = Response::new(text.to_string());
            *response.status_mut() = status;
            Ok::<_, Infallible>(response)
        }
    });

    if let Err(e) = http1::Builder::new()
        .keep_alive(false)
        .serve_connection(TokioIo::new(stream), service)
        .await
    {
        debug!("OAuth callback connection error: {e}");
    }
    rx.try_recv().ok()
}
