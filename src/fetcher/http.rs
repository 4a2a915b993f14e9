// The real transport: reqwest over rustls, one shared client for every
// source so connections and TLS sessions get reused.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::ContentFetcher;
use crate::errors::FetchCause;

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, location: &Url) -> Result<String, FetchCause> {
        let response = self.client.get(location.clone()).send().await?;
        let status = response.status();

        // Bail before touching the body; an error page is not a TLD list.
        if status.is_client_error() || status.is_server_error() {
            return Err(FetchCause::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let body = response.text().await?;
        debug!(source = %location, bytes = body.len(), "Listing downloaded");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP/1.1 response on loopback and return its URL.
    async fn serve_once(response: &'static str) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        Url::parse(&format!("http://{addr}/tlds.txt")).unwrap()
    }

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(5), "tld_harvester-test").unwrap()
    }

    #[tokio::test]
    async fn test_success_returns_body() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 8\r\nConnection: close\r\n\r\nCOM\nORG\n",
        )
        .await;
        let body = fetcher().fetch(&url).await.unwrap();
        assert_eq!(body, "COM\nORG\n");
    }

    #[tokio::test]
    async fn test_not_found_is_a_status_error() {
        let url = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\nConnection: close\r\n\r\nnot found",
        )
        .await;
        let err = fetcher().fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchCause::Status { code: 404, .. }), "got {err:?}");
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let url = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let err = fetcher().fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchCause::Status { code: 503, .. }), "got {err:?}");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_refused_connection_is_a_transport_error() {
        // Grab a free port, then close it so nothing is listening there.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("http://{addr}/tlds.txt")).unwrap();
        let err = fetcher().fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchCause::Transport(_)), "got {err:?}");
        assert!(err.is_retryable());
    }
}
