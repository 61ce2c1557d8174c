//! OAuth2 callback server
//!
//! A temporary local HTTP listener that captures the authorization code
//! from the browser redirect.

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;
use crate::Result;
use crate::error::Error;

const SUCCESS_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>toolgate | Authorization Successful</title></head>
<body style="font-family: system-ui, sans-serif; text-align: center; margin-top: 15vh;">
    <h1>Authorization Successful</h1>
    <p>You can close this window and return to your terminal.</p>
</body>
</html>"#;

const ERROR_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>toolgate | Authorization Failed</title></head>
<body style="font-family: system-ui, sans-serif; text-align: center; margin-top: 15vh;">
    <h1>Authorization Failed</h1>
    <p>Something went wrong. Check your terminal and try again.</p>
</body>
</html>"#;

/// Authorization code result from the callback
#[derive(Debug, Clone)]
pub struct AuthorizationResult {
    pub code: String,
    pub state: Option<String>,
}

/// Redirect URI registered for the installed-app flow
pub fn redirect_uri(port: u16) -> String {
    format!("http://localhost:{}/", port)
}

/// Local listener bound before the user is sent to the authorization URL
pub struct CallbackServer {
    listener: TcpListener,
}

impl CallbackServer {
    pub async fn bind(port: u16) -> Result<Self> {
        let addr = format!("127.0.0.1:{}", port);
        let listener = TcpListener::bind(&addr).await
            .map_err(|e| Error::OAuth(format!("Failed to start callback server on {}: {}", addr, e)))?;
        tracing::info!("Callback server listening on http://{}", addr);
        Ok(Self { listener })
    }

    pub fn port(&self) -> Result<u16> {
        Ok(self.listener.local_addr()?.port())
    }

    /// Wait for the redirect carrying the authorization code.
    ///
    /// Requests without OAuth parameters (favicon probes and the like) get a
    /// 404 and the listener keeps waiting until `timeout` elapses.
    pub async fn wait_for_code(self, expected_state: Option<&str>, timeout: Duration) -> Result<AuthorizationResult> {
        tokio::time::timeout(timeout, self.accept_loop(expected_state))
            .await
            .map_err(|_| Error::Timeout(format!(
                "no OAuth redirect received within {}s", timeout.as_secs()
            )))?
    }

    async fn accept_loop(&self, expected_state: Option<&str>) -> Result<AuthorizationResult> {
        loop {
            let (mut socket, _) = self.listener.accept().await
                .map_err(|e| Error::OAuth(format!("Failed to accept connection: {}", e)))?;

            let mut buffer = vec![0u8; 8192];
            let n = socket.read(&mut buffer).await
                .map_err(|e| Error::OAuth(format!("Failed to read request: {}", e)))?;
            let request = String::from_utf8_lossy(&buffer[..n]);

            let result = match parse_callback_request(&request, expected_state) {
                Some(result) => result,
                None => {
                    respond(&mut socket, "404 Not Found", "").await;
                    continue;
                }
            };

            let (status, body) = match &result {
                Ok(_) => ("200 OK", SUCCESS_HTML),
                Err(_) => ("400 Bad Request", ERROR_HTML),
            };
            respond(&mut socket, status, body).await;
            return result;
        }
    }
}

async fn respond(socket: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Extract the authorization code from a raw HTTP request.
///
/// Returns `None` when the request carries neither `code` nor `error`.
fn parse_callback_request(request: &str, expected_state: Option<&str>) -> Option<Result<AuthorizationResult>> {
    let first_line = request.lines().next()?;

    // GET /?code=xxx&state=yyy HTTP/1.1
    let path = first_line.split_whitespace().nth(1)?;
    let url = Url::parse(&format!("http://localhost{}", path)).ok()?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut error_description = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.to_string()),
            "state" => state = Some(value.to_string()),
            "error" => error = Some(value.to_string()),
            "error_description" => error_description = Some(value.to_string()),
            _ => {}
        }
    }

    if code.is_none() && error.is_none() {
        return None;
    }

    if let Some(err) = error {
        let description = error_description.unwrap_or_else(|| "Unknown error".to_string());
        return Some(Err(Error::OAuth(format!("Authorization failed: {} - {}", err, description))));
    }

    if let Some(expected) = expected_state {
        match &state {
            Some(s) if s == expected => {}
            Some(s) => return Some(Err(Error::OAuth(format!("State mismatch: expected {}, got {}", expected, s)))),
            None => return Some(Err(Error::OAuth("Missing state parameter".to_string()))),
        }
    }

    code.map(|code| Ok(AuthorizationResult { code, state }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_callback_success() {
        let request = "GET /?code=abc123&state=xyz789 HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let result = parse_callback_request(request, Some("xyz789")).unwrap().unwrap();

        assert_eq!(result.code, "abc123");
        assert_eq!(result.state.as_deref(), Some("xyz789"));
    }

    #[test]
    fn test_parse_callback_without_state() {
        let request = "GET /?code=abc123 HTTP/1.1\r\n\r\n";
        let result = parse_callback_request(request, None).unwrap().unwrap();

        assert_eq!(result.code, "abc123");
        assert!(result.state.is_none());
    }

    #[test]
    fn test_parse_callback_error() {
        let request = "GET /?error=access_denied&error_description=User+denied HTTP/1.1\r\n\r\n";
        let err = parse_callback_request(request, None).unwrap().unwrap_err();
        assert!(err.to_string().contains("access_denied"));
    }

    #[test]
    fn test_parse_callback_state_mismatch() {
        let request = "GET /?code=abc&state=wrong HTTP/1.1\r\n\r\n";
        let err = parse_callback_request(request, Some("expected")).unwrap().unwrap_err();
        assert!(err.to_string().contains("mismatch"));
    }

    #[test]
    fn test_parse_ignores_unrelated_requests() {
        let request = "GET /favicon.ico HTTP/1.1\r\n\r\n";
        assert!(parse_callback_request(request, Some("s")).is_none());
    }

    #[test]
    fn test_redirect_uri() {
        assert_eq!(redirect_uri(8080), "http://localhost:8080/");
    }

    #[tokio::test]
    async fn test_server_captures_code_after_unrelated_request() {
        let server = CallbackServer::bind(0).await.unwrap();
        let port = server.port().unwrap();
        let waiter = tokio::spawn(async move {
            server.wait_for_code(Some("st"), Duration::from_secs(10)).await
        });

        let client = reqwest::Client::new();
        let probe = client.get(format!("http://127.0.0.1:{}/favicon.ico", port)).send().await.unwrap();
        assert_eq!(probe.status(), 404);

        let ok = client.get(format!("http://127.0.0.1:{}/?code=c0de&state=st", port)).send().await.unwrap();
        assert_eq!(ok.status(), 200);

        let result = waiter.await.unwrap().unwrap();
        assert_eq!(result.code, "c0de");
    }

    #[tokio::test]
    async fn test_server_times_out() {
        let server = CallbackServer::bind(0).await.unwrap();
        let err = server.wait_for_code(None, Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test]
    async fn test_second_bind_on_same_port_fails() {
        let server = CallbackServer::bind(0).await.unwrap();
        let port = server.port().unwrap();
        assert!(matches!(CallbackServer::bind(port).await, Err(Error::OAuth(_))));
    }
}
