//! One-shot localhost server for the OAuth2 redirect
//!
//! Listens on the host and port of the redirect URI and waits until the
//! browser is sent back with an authorization code. Requests for any other
//! path (browsers like to ask for `/favicon.ico`) get a 404 and are
//! otherwise ignored.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Parameters extracted from the OAuth2 callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    /// The authorization code
    pub code: String,
    /// The CSRF state parameter
    pub state: String,
}

/// Local HTTP server receiving the authorization redirect
pub struct LocalCallbackServer {
    listener: TcpListener,
    path: String,
}

impl LocalCallbackServer {
    /// Binds to the host and port named in `redirect_uri`
    ///
    /// Port `0` picks a free port; see [`local_addr`](Self::local_addr).
    pub async fn bind(redirect_uri: &str) -> Result<Self> {
        let url = url::Url::parse(redirect_uri).context("Invalid redirect URI")?;
        let host = url
            .host_str()
            .ok_or_else(|| anyhow!("Redirect URI {redirect_uri} has no host"))?;
        let port = url.port_or_known_default().unwrap_or(80);

        let listener = TcpListener::bind((host, port))
            .await
            .with_context(|| format!("Failed to bind callback server to {host}:{port}"))?;
        info!(host, port, "Listening for OAuth callback");

        Ok(Self {
            listener,
            path: url.path().to_string(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Callback server has no local address")
    }

    /// Waits for the redirect and returns the authorization code
    ///
    /// Fails when the provider reports an error or the `state` parameter does
    /// not match `expected_state`.
    pub async fn wait_for_code(self, expected_state: &str) -> Result<String> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Result<CallbackParams, String>>();
        let path: Arc<str> = Arc::from(self.path.as_str());
        let expected: Arc<str> = Arc::from(expected_state);

        loop {
            tokio::select! {
                outcome = rx.recv() => {
                    let outcome = outcome
                        .ok_or_else(|| anyhow!("Callback server stopped without a result"))?;
                    return match outcome {
                        Ok(params) => {
                            info!("Received OAuth callback with authorization code");
                            Ok(params.code)
                        }
                        Err(message) => bail!("Authorization failed: {message}"),
                    };
                }
                accepted = self.listener.accept() => {
                    let (stream, addr) =
                        accepted.context("Failed to accept connection on callback server")?;
                    debug!(%addr, "Callback connection");
                    serve_connection(stream, tx.clone(), path.clone(), expected.clone());
                }
            }
        }
    }
}

fn serve_connection(
    stream: tokio::net::TcpStream,
    tx: mpsc::UnboundedSender<Result<CallbackParams, String>>,
    path: Arc<str>,
    expected_state: Arc<str>,
) {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req: Request<hyper::body::Incoming>| {
        let tx = tx.clone();
        let path = path.clone();
        let expected_state = expected_state.clone();
        async move {
            if req.uri().path() != &*path {
                return Ok::<_, hyper::Error>(html_response(
                    StatusCode::NOT_FOUND,
                    error_html("Not found"),
                ));
            }

            let uri = req.uri().to_string();
            let response = match parse_callback(&uri) {
                Some(Ok(params)) if params.state == *expected_state => {
                    let _ = tx.send(Ok(params));
                    html_response(StatusCode::OK, success_html())
                }
                Some(Ok(_)) => {
                    let _ = tx.send(Err("state parameter mismatch".to_string()));
                    html_response(StatusCode::BAD_REQUEST, error_html("State mismatch"))
                }
                Some(Err(message)) => {
                    let page = error_html(&message);
                    let _ = tx.send(Err(message));
                    html_response(StatusCode::BAD_REQUEST, page)
                }
                None => html_response(
                    StatusCode::BAD_REQUEST,
                    error_html("Missing authorization code in callback"),
                ),
            };
            Ok(response)
        }
    });

    tokio::spawn(async move {
        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
            warn!(error = %e, "Callback server connection error");
        }
    });
}

/// Extracts the code and state, or the provider's error, from a callback URI
///
/// Returns `None` when the request carries neither.
fn parse_callback(uri: &str) -> Option<Result<CallbackParams, String>> {
    let url = url::Url::parse(&format!("http://localhost{uri}")).ok()?;
    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut description = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.to_string()),
            "state" => state = Some(value.to_string()),
            "error" => error = Some(value.to_string()),
            "error_description" => description = Some(value.to_string()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Some(Err(match description {
            Some(description) => format!("{error}: {description}"),
            None => error,
        }));
    }

    Some(Ok(CallbackParams {
        code: code?,
        state: state.unwrap_or_default(),
    }))
}

fn html_response(status: StatusCode, html: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(html)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

fn success_html() -> String {
    r#"<!DOCTYPE html>
<html>
<head><title>cloudmirror - Authentication Successful</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authentication Successful</h1>
    <p>You can close this window and return to cloudmirror.</p>
</body>
</html>"#
        .to_string()
}

fn error_html(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>cloudmirror - Authentication Error</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authentication Error</h1>
    <p>{message}</p>
    <p>Please close this window and try again.</p>
</body>
</html>"#
    )
}
