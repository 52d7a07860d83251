use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::utf8_percent_encode;
use regen_ocr_core::Pid;
use regen_ocr_fedora::PATH_SEGMENT;
use reqwest::{Client, Url, redirect};
use tracing::{debug, instrument};

use crate::error::GeneratorError;

/// Something that can ask for an object's OCR text to be rebuilt.
#[async_trait]
pub trait OcrTrigger: Send + Sync {
    /// Request regeneration for `pid` and return the HTTP status received.
    async fn trigger(&self, pid: &Pid) -> Result<u16, GeneratorError>;
}

/// Client for the OCR generation endpoint: `GET {base}/{pid}`.
///
/// Redirects are not followed, so a 3xx reaches the caller and is counted as
/// accepted.
#[derive(Debug, Clone)]
pub struct OcrGeneratorClient {
    client: Client,
    base_url: String,
}

impl OcrGeneratorClient {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, GeneratorError> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        let parsed = Url::parse(&base_url).map_err(|e| GeneratorError::InvalidUrl {
            url: base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(GeneratorError::InvalidUrl {
                url: base_url,
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let mut builder = Client::builder().redirect(redirect::Policy::none());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| GeneratorError::Configuration(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/{pid}`, with the pid escaped the same way as repository URLs.
    pub fn regeneration_url(&self, pid: &Pid) -> String {
        format!(
            "{}/{}",
            self.base_url,
            utf8_percent_encode(pid.as_str(), PATH_SEGMENT)
        )
    }
}

#[async_trait]
impl OcrTrigger for OcrGeneratorClient {
    #[instrument(skip(self, pid), fields(pid = %pid))]
    async fn trigger(&self, pid: &Pid) -> Result<u16, GeneratorError> {
        let response = self.client.get(self.regeneration_url(pid)).send().await?;
        let status = response.status().as_u16();
        debug!(status, "regenerate OCR response");
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    struct MockOcrService {
        listener: tokio::net::TcpListener,
        base_url: String,
    }

    impl MockOcrService {
        async fn start() -> Self {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("failed to bind mock server");
            let port = listener.local_addr().unwrap().port();
            let base_url = format!("http://127.0.0.1:{port}/ocr/");
            Self { listener, base_url }
        }

        async fn respond_once(self, status_line: &str, extra_headers: &str) -> String {
            let (mut stream, _) = self.listener.accept().await.unwrap();

            let mut buf = vec![0u8; 16384];
            let n = stream.read(&mut buf).await.unwrap();
            buf.truncate(n);

            let response = format!(
                "HTTP/1.1 {status_line}\r\n\
                 {extra_headers}\
                 Content-Length: 0\r\n\
                 Connection: close\r\n\
                 \r\n"
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();

            String::from_utf8_lossy(&buf).into_owned()
        }
    }

    fn pid() -> Pid {
        Pid::parse("test:pid").unwrap()
    }

    #[test]
    fn builds_regeneration_url() {
        let client = OcrGeneratorClient::new("http://localhost:8080/ocr/", None).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/ocr");
        assert_eq!(
            client.regeneration_url(&pid()),
            "http://localhost:8080/ocr/test:pid"
        );
    }

    #[test]
    fn escapes_pid_like_repository_urls() {
        let client = OcrGeneratorClient::new("http://localhost:8080/ocr", None).unwrap();
        let pid = Pid::parse("ns:a#b c/d").unwrap();
        assert_eq!(
            client.regeneration_url(&pid),
            "http://localhost:8080/ocr/ns:a%23b%20c%2Fd"
        );
    }

    #[test]
    fn rejects_bad_url() {
        assert!(matches!(
            OcrGeneratorClient::new("not a url", None),
            Err(GeneratorError::InvalidUrl { .. })
        ));
        assert!(OcrGeneratorClient::new("file:///tmp/ocr", None).is_err());
    }

    #[tokio::test]
    async fn returns_status_without_credentials() {
        let server = MockOcrService::start().await;
        let client = OcrGeneratorClient::new(&server.base_url, None).unwrap();
        let handle = tokio::spawn(async move { server.respond_once("204 No Content", "").await });

        let status = client.trigger(&pid()).await.unwrap();
        let request = handle.await.unwrap();

        assert_eq!(status, 204);
        assert!(request.starts_with("GET /ocr/test:pid HTTP/1.1"));
        assert!(!request.to_ascii_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn does_not_follow_redirects() {
        let server = MockOcrService::start().await;
        let client = OcrGeneratorClient::new(&server.base_url, None).unwrap();
        let handle = tokio::spawn(async move {
            server
                .respond_once("302 Found", "Location: http://127.0.0.1:1/elsewhere\r\n")
                .await
        });

        let status = client.trigger(&pid()).await.unwrap();
        handle.await.unwrap();

        assert_eq!(status, 302);
    }

    #[tokio::test]
    async fn unreachable_service_is_an_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = OcrGeneratorClient::new(&format!("http://127.0.0.1:{port}/ocr"), None).unwrap();
        assert!(matches!(
            client.trigger(&pid()).await,
            Err(GeneratorError::Http(_))
        ));
    }
}
