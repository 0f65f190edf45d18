//! Google OAuth2 authorization
//!
//! Implements the installed-app authorization code flow and token refresh.
//! A loopback listener on an ephemeral port receives the OAuth callback.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result, bail};
use chrono::{Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{TcpListener, TcpStream};
use std::time::{Duration, Instant};
use url::Url;

use crate::config::ClientSecrets;
use crate::credentials::Authorizer;
use crate::models::Credential;

/// Authorizer backed by Google's OAuth2 endpoints
pub struct GoogleAuthorizer {
    client_id: String,
    client_secret: String,
    callback_timeout: Duration,
    interactive: bool,
}

/// Token response from Google
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    /// Space-separated granted scopes
    scope: Option<String>,
    token_type: Option<String>,
}

impl TokenResponse {
    fn into_credential(self, requested_scopes: &[String]) -> Credential {
        let scopes = match &self.scope {
            Some(scope) => scope.split_whitespace().map(str::to_string).collect(),
            None => requested_scopes.to_vec(),
        };

        Credential {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self
                .expires_in
                .map(|secs| Utc::now() + ChronoDuration::seconds(secs)),
            scopes,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
        }
    }
}

impl GoogleAuthorizer {
    /// OAuth2 endpoints
    const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    /// How long to wait for the user to finish the consent flow
    pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

    const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);
    const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(secrets: ClientSecrets) -> Self {
        Self {
            client_id: secrets.client_id,
            client_secret: secrets.client_secret,
            callback_timeout: Self::DEFAULT_CALLBACK_TIMEOUT,
            interactive: true,
        }
    }

    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = timeout;
        self
    }

    /// Refuse the consent flow (headless environments); refresh still works
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Build the consent URL the user opens in a browser
    fn authorization_url(&self, redirect_uri: &str, scopes: &[String], state: &str) -> Result<Url> {
        let scope = scopes.join(" ");
        Url::parse_with_params(
            Self::AUTH_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )
        .context("Failed to build authorization URL")
    }

    /// Bind the loopback listener on an ephemeral port
    fn start_local_server(&self) -> Result<(TcpListener, u16)> {
        let listener =
            TcpListener::bind("127.0.0.1:0").context("Failed to bind local callback listener")?;
        let port = listener
            .local_addr()
            .context("Failed to read callback listener address")?
            .port();
        Ok((listener, port))
    }

    /// Wait for the browser redirect, bounded by the callback timeout
    fn wait_for_callback(&self, listener: TcpListener, expected_state: &str) -> Result<String> {
        let mut stream = self.accept_with_deadline(&listener)?;

        let request_line = {
            let mut reader = BufReader::new(&stream);
            let mut line = String::new();
            reader
                .read_line(&mut line)
                .context("Failed to read callback request")?;
            line
        };

        let result = parse_callback(&request_line, expected_state);

        let (status, body) = match &result {
            Ok(_) => ("200 OK", "Authentication successful! You can close this window."),
            Err(_) => ("400 Bad Request", "Authentication failed. Please try again."),
        };
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n<html><body><h1>{}</h1></body></html>",
            status, body
        );
        if let Err(e) = stream.write_all(response.as_bytes()) {
            log::debug!("Failed to answer OAuth callback: {}", e);
        }

        result
    }

    fn accept_with_deadline(&self, listener: &TcpListener) -> Result<TcpStream> {
        listener
            .set_nonblocking(true)
            .context("Failed to configure callback listener")?;
        let deadline = Instant::now() + self.callback_timeout;

        loop {
            match listener.accept() {
                Ok((stream, _)) => {
                    stream
                        .set_nonblocking(false)
                        .context("Failed to configure callback connection")?;
                    stream
                        .set_read_timeout(Some(Self::REQUEST_READ_TIMEOUT))
                        .context("Failed to configure callback connection")?;
                    return Ok(stream);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        bail!(
                            "Timed out after {}s waiting for authorization",
                            self.callback_timeout.as_secs()
                        );
                    }
                    std::thread::sleep(Self::ACCEPT_POLL_INTERVAL);
                }
                Err(e) => return Err(e).context("Failed to accept callback connection"),
            }
        }
    }

    fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenResponse> {
        let mut response = ureq::post(Self::TOKEN_URL)
            .send_form([
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri),
            ])
            .context("Failed to exchange authorization code")?;

        response
            .body_mut()
            .read_json()
            .context("Failed to parse token response")
    }
}

impl Authorizer for GoogleAuthorizer {
    fn refresh(&self, credential: &Credential) -> Result<Credential> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .context("Credential has no refresh token")?;

        let mut response = ureq::post(Self::TOKEN_URL)
            .send_form([
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .context("Failed to refresh access token")?;

        let mut token: TokenResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse refresh token response")?;

        // Preserve the refresh token if not returned
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token.to_string());
        }

        Ok(token.into_credential(&credential.scopes))
    }

    fn authorize(&self, scopes: &[String]) -> Result<Credential> {
        if !self.interactive {
            bail!("Interactive authorization is disabled");
        }

        let (listener, port) = self.start_local_server()?;
        let redirect_uri = format!("http://localhost:{}", port);
        let state = random_state();
        let auth_url = self.authorization_url(&redirect_uri, scopes, &state)?;

        eprintln!("\n=== Gmail Authentication Required ===");
        eprintln!("Opening browser for authentication...");
        eprintln!("If the browser doesn't open, visit: {}", auth_url);

        if let Err(e) = open::that(auth_url.as_str()) {
            log::warn!("Failed to open browser: {}. Please open the URL manually.", e);
        }

        log::info!("Waiting for authorization on port {}", port);
        let code = self.wait_for_callback(listener, &state)?;

        log::info!("Exchanging authorization code for tokens");
        let token = self.exchange_code(&code, &redirect_uri)?;
        Ok(token.into_credential(scopes))
    }
}

/// Extract the authorization code from the callback request line.
///
/// Format: `GET /?state=...&code=AUTH_CODE&scope=... HTTP/1.1`
fn parse_callback(request_line: &str, expected_state: &str) -> Result<String> {
    let target = request_line
        .split_whitespace()
        .nth(1)
        .context("Malformed callback request")?;
    let url = Url::parse("http://localhost")
        .and_then(|base| base.join(target))
        .context("Malformed callback URL")?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(err) = error {
        bail!("OAuth error: {}", err);
    }
    if state.as_deref() != Some(expected_state) {
        bail!("OAuth state mismatch");
    }
    code.context("No authorization code received")
}

/// Unpredictable value for the OAuth `state` parameter
fn random_state() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..16).map(|_| format!("{:02x}", rng.r#gen::<u8>())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authorizer() -> GoogleAuthorizer {
        GoogleAuthorizer::new(ClientSecrets {
            client_id: "client-id.apps.googleusercontent.com".to_string(),
            client_secret: "secret".to_string(),
        })
    }

    #[test]
    fn test_parse_callback_extracts_code() {
        let line = "GET /?state=abc&code=4%2F0Adeu5B&scope=https%3A%2F%2Fmail HTTP/1.1\r\n";
        assert_eq!(parse_callback(line, "abc").unwrap(), "4/0Adeu5B");
    }

    #[test]
    fn test_parse_callback_reports_oauth_error() {
        let line = "GET /?error=access_denied&state=abc HTTP/1.1\r\n";
        let err = parse_callback(line, "abc").unwrap_err();
        assert!(err.to_string().contains("access_denied"));
    }

    #[test]
    fn test_parse_callback_rejects_state_mismatch() {
        let line = "GET /?state=other&code=xyz HTTP/1.1\r\n";
        assert!(parse_callback(line, "abc").is_err());
    }

    #[test]
    fn test_parse_callback_without_code() {
        let line = "GET /favicon.ico HTTP/1.1\r\n";
        assert!(parse_callback(line, "abc").is_err());
        assert!(parse_callback("", "abc").is_err());
    }

    #[test]
    fn test_authorization_url_parameters() {
        let url = authorizer()
            .authorization_url(
                "http://localhost:5555",
                &["scope-a".to_string(), "scope-b".to_string()],
                "xyz",
            )
            .unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let get = |k: &str| {
            pairs
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
        };

        assert!(url.as_str().starts_with(GoogleAuthorizer::AUTH_URL));
        assert_eq!(get("client_id"), Some("client-id.apps.googleusercontent.com"));
        assert_eq!(get("redirect_uri"), Some("http://localhost:5555"));
        assert_eq!(get("scope"), Some("scope-a scope-b"));
        assert_eq!(get("access_type"), Some("offline"));
        assert_eq!(get("state"), Some("xyz"));
    }

    #[test]
    fn test_non_interactive_refuses_authorization() {
        let err = authorizer()
            .with_interactive(false)
            .authorize(&["scope".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }

    #[test]
    fn test_random_state_is_fresh_hex() {
        let first = random_state();
        let second = random_state();
        assert_eq!(first.len(), 32);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }

    #[test]
    fn test_refresh_requires_refresh_token() {
        assert!(authorizer().refresh(&Credential::new("access")).is_err());
    }

    #[test]
    fn test_callback_times_out() {
        let auth = authorizer().with_callback_timeout(Duration::from_millis(200));
        let (listener, _port) = auth.start_local_server().unwrap();
        let err = auth.wait_for_callback(listener, "state").unwrap_err();
        assert!(err.to_string().contains("Timed out"));
    }

    #[test]
    fn test_callback_round_trip_over_loopback() {
        let auth = authorizer();
        let (listener, port) = auth.start_local_server().unwrap();

        let browser = std::thread::spawn(move || {
            let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
            stream
                .write_all(b"GET /?state=s1&code=the-code HTTP/1.1\r\n")
                .unwrap();
            let mut reply = String::new();
            std::io::Read::read_to_string(&mut stream, &mut reply).unwrap();
            reply
        });

        assert_eq!(auth.wait_for_callback(listener, "s1").unwrap(), "the-code");
        assert!(browser.join().unwrap().starts_with("HTTP/1.1 200 OK"));
    }

    #[test]
    fn test_token_response_into_credential() {
        let token: TokenResponse = serde_json::from_str(
            r#"{"access_token":"ya29","expires_in":3599,"scope":"a b","token_type":"Bearer"}"#,
        )
        .unwrap();
        let credential = token.into_credential(&["requested".to_string()]);
        assert_eq!(credential.access_token, "ya29");
        assert_eq!(credential.scopes, vec!["a".to_string(), "b".to_string()]);
        assert!(credential.is_valid());
        assert!(credential.refresh_token.is_none());
    }

    #[test]
    fn test_token_response_keeps_requested_scopes() {
        let token: TokenResponse = serde_json::from_str(r#"{"access_token":"ya29"}"#).unwrap();
        let credential = token.into_credential(&["requested".to_string()]);
        assert_eq!(credential.scopes, vec!["requested".to_string()]);
        assert!(credential.expires_at.is_none());
    }
}
