use std::time::Duration;
use async_trait::async_trait;
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, Url};
use tracing::debug;
use crate::constants::{DEFAULT_REQUEST_TIMEOUT_SECS, MAX_SOURCE_CONTENT_LENGTH};
use crate::error::FetchError;

/// ソース画像を取得するポート
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// HTTP(S) でソース画像を取得する
pub struct HttpImageFetcher {
    client: Client,
    max_bytes: u64,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration, user_agent: &str, max_bytes: u64) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client, max_bytes })
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }
}

impl Default for HttpImageFetcher {
    fn default() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            max_bytes: MAX_SOURCE_CONTENT_LENGTH,
        }
    }
}

// http/https 以外のスキームは拒否
pub fn parse_source_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(FetchError::InvalidUrl(format!(
            "サポートされていないスキーム: {}",
            other
        ))),
    }
}

// 上限を超えたら TooLarge
fn ensure_within_limit(size: u64, max: u64) -> Result<(), FetchError> {
    if size > max {
        return Err(FetchError::TooLarge { size, max });
    }
    Ok(())
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let url = parse_source_url(url)?;

        let mut response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // 宣言されたサイズで先に判定（本文はダウンロードしない）
        let declared = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        if let Some(len) = declared {
            ensure_within_limit(len, self.max_bytes)?;
        }

        // Content-Length が無い・不正確な場合に備えて受信量でも判定
        let mut body = Vec::with_capacity(declared.unwrap_or(0) as usize);
        while let Some(chunk) = response.chunk().await? {
            ensure_within_limit((body.len() + chunk.len()) as u64, self.max_bytes)?;
            body.extend_from_slice(&chunk);
        }

        debug!(url = %url, bytes = body.len(), "ソース画像を取得");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockServer;

    #[test]
    fn accepts_http_and_https() {
        assert!(parse_source_url("http://example.com/a.png").is_ok());
        assert!(parse_source_url("https://example.com/a.png").is_ok());
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert!(matches!(
            parse_source_url("file:///etc/passwd"),
            Err(FetchError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_source_url("not a url"),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[test]
    fn size_limit_is_inclusive() {
        assert!(ensure_within_limit(10, 10).is_ok());
        assert!(matches!(
            ensure_within_limit(11, 10),
            Err(FetchError::TooLarge { size: 11, max: 10 })
        ));
    }

    #[tokio::test]
    async fn invalid_url_fails_before_any_request() {
        let fetcher = HttpImageFetcher::default();
        assert_eq!(fetcher.max_bytes(), MAX_SOURCE_CONTENT_LENGTH);
        let err = fetcher.fetch_image("ftp://example.com/a.png").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    fn fetcher(max_bytes: u64) -> HttpImageFetcher {
        HttpImageFetcher::new(Duration::from_secs(5), "thumbnailer-test", max_bytes).unwrap()
    }

    #[tokio::test]
    async fn downloads_body_within_limit() {
        let server = MockServer::start(vec![
            "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
        ])
        .await;

        let body = fetcher(10)
            .fetch_image(&format!("{}/a.png", server.url))
            .await
            .unwrap();
        assert_eq!(body, b"hello");

        let requests = server.requests();
        assert!(requests[0].starts_with("get /a.png http/1.1"));
        assert!(requests[0].contains("user-agent: thumbnailer-test"));
    }

    #[tokio::test]
    async fn declared_length_over_limit_is_rejected() {
        // 本文は送らない（ヘッダーだけで判定されること）
        let server = MockServer::start(vec![
            "HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\n",
        ])
        .await;

        let err = fetcher(10)
            .fetch_image(&format!("{}/big.png", server.url))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { size: 100, max: 10 }));
    }

    #[tokio::test]
    async fn chunked_body_over_limit_is_rejected_mid_stream() {
        let server = MockServer::start(vec![
            "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n\
             8\r\n01234567\r\n8\r\n89abcdef\r\n0\r\n\r\n",
        ])
        .await;

        let err = fetcher(10)
            .fetch_image(&format!("{}/stream.png", server.url))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { max: 10, .. }));
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let server = MockServer::start(vec![
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        ])
        .await;

        let err = fetcher(10)
            .fetch_image(&format!("{}/missing.png", server.url))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }
}
