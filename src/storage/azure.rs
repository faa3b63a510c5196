use std::collections::BTreeMap;
use std::time::Duration;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_ENCODING, CONTENT_LANGUAGE,
    CONTENT_TYPE, DATE, IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_UNMODIFIED_SINCE, RANGE,
};
use reqwest::{Client, Method, Response, StatusCode, Url};
use sha2::Sha256;
use tracing::{debug, info};
use super::connection::{StorageAccount, StorageCredentials};
use super::{BlobStore, PUBLIC_ACCESS_BLOB};
use crate::error::StorageError;

const API_VERSION: &str = "2021-08-06";
const CONTENT_MD5: &str = "content-md5";
const ERROR_CODE: &str = "x-ms-error-code";
const CONTAINER_ALREADY_EXISTS: &str = "ContainerAlreadyExists";

/// Azure Blob Storage（REST API）
pub struct AzureBlobStore {
    client: Client,
    account: StorageAccount,
}

impl AzureBlobStore {
    pub fn new(account: StorageAccount, timeout: Duration) -> Result<Self, StorageError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, account })
    }

    pub fn from_connection_string(connection_string: &str, timeout: Duration) -> Result<Self, StorageError> {
        Self::new(StorageAccount::parse(connection_string)?, timeout)
    }

    pub fn account(&self) -> &StorageAccount {
        &self.account
    }

    // 認証情報を付与して送信
    async fn send(
        &self,
        method: Method,
        mut url: Url,
        mut headers: HeaderMap,
        body: Vec<u8>,
    ) -> Result<Response, StorageError> {
        headers.insert(header("x-ms-date"), value(&http_date())?);
        headers.insert(header("x-ms-version"), HeaderValue::from_static(API_VERSION));

        match &self.account.credentials {
            StorageCredentials::SharedKey(key) => {
                let to_sign = string_to_sign(
                    &method,
                    &url,
                    &headers,
                    body.len() as u64,
                    &self.account.account_name,
                );
                let signature = sign(key, &to_sign)?;
                headers.insert(
                    AUTHORIZATION,
                    value(&format!("SharedKey {}:{}", self.account.account_name, signature))?,
                );
            }
            StorageCredentials::SharedAccessSignature(sas) => {
                let query = match url.query() {
                    Some(existing) if !existing.is_empty() => format!("{}&{}", existing, sas),
                    _ => sas.clone(),
                };
                url.set_query(Some(&query));
            }
        }

        let response = self
            .client
            .request(method, url)
            .headers(headers)
            .body(body)
            .send()
            .await?;
        Ok(response)
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    async fn ensure_container(&self, container: &str) -> Result<(), StorageError> {
        let mut url = self.account.resource_url(&[container])?;
        url.set_query(Some("restype=container"));

        let mut headers = HeaderMap::new();
        headers.insert(header("x-ms-blob-public-access"), HeaderValue::from_static(PUBLIC_ACCESS_BLOB));

        let response = self.send(Method::PUT, url, headers, Vec::new()).await?;
        match response.status() {
            StatusCode::CREATED => {
                info!(container, "コンテナを作成（Blob 公開アクセス）");
                Ok(())
            }
            // 既存のコンテナは権限を変更しない。他の 409（公開不可・削除中など）はエラー
            StatusCode::CONFLICT if error_code(&response) == Some(CONTAINER_ALREADY_EXISTS) => {
                debug!(container, "コンテナは既に存在");
                Ok(())
            }
            _ => Err(request_error("コンテナ作成", response).await),
        }
    }

    async fn put_blob(
        &self,
        container: &str,
        name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let url = self.account.resource_url(&[container, name])?;

        let mut headers = HeaderMap::new();
        headers.insert(header("x-ms-blob-type"), HeaderValue::from_static("BlockBlob"));
        headers.insert(CONTENT_TYPE, value(content_type)?);
        headers.insert(
            header(CONTENT_MD5),
            value(&STANDARD.encode(md5::compute(&data).0))?,
        );

        let response = self.send(Method::PUT, url, headers, data).await?;
        if response.status() == StatusCode::CREATED {
            Ok(())
        } else {
            Err(request_error("Blob アップロード", response).await)
        }
    }
}

// RFC 1123 形式（例: "Sun, 19 Oct 2026 10:00:00 GMT"）
fn http_date() -> String {
    chrono::Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn header(name: &'static str) -> HeaderName {
    HeaderName::from_static(name)
}

fn value(v: &str) -> Result<HeaderValue, StorageError> {
    HeaderValue::from_str(v).map_err(|e| StorageError::Internal(format!("無効なヘッダー値: {}", e)))
}

fn error_code(response: &Response) -> Option<&str> {
    response.headers().get(ERROR_CODE).and_then(|v| v.to_str().ok())
}

async fn request_error(operation: &'static str, response: Response) -> StorageError {
    let status = response.status().as_u16();
    let code = error_code(&response).map(str::to_string);
    let message = match code {
        Some(code) => code,
        None => response.text().await.unwrap_or_default(),
    };
    StorageError::Request {
        operation,
        status,
        message,
    }
}

/// Shared Key 認証の署名対象文字列
pub(crate) fn string_to_sign(
    method: &Method,
    url: &Url,
    headers: &HeaderMap,
    content_length: u64,
    account_name: &str,
) -> String {
    let get = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string()
    };

    // 長さ0は空文字（API バージョン 2015-02-21 以降）
    let length = if content_length == 0 {
        String::new()
    } else {
        content_length.to_string()
    };

    let mut out = String::new();
    out.push_str(method.as_str());
    out.push('\n');
    for part in [
        get(CONTENT_ENCODING.as_str()),
        get(CONTENT_LANGUAGE.as_str()),
        length,
        get(CONTENT_MD5),
        get(CONTENT_TYPE.as_str()),
        get(DATE.as_str()),
        get(IF_MODIFIED_SINCE.as_str()),
        get(IF_MATCH.as_str()),
        get(IF_NONE_MATCH.as_str()),
        get(IF_UNMODIFIED_SINCE.as_str()),
        get(RANGE.as_str()),
    ] {
        out.push_str(&part);
        out.push('\n');
    }

    // x-ms-* ヘッダー（名前順）
    let ms_headers: BTreeMap<&str, &str> = headers
        .iter()
        .filter(|(name, _)| name.as_str().starts_with("x-ms-"))
        .filter_map(|(name, v)| v.to_str().ok().map(|v| (name.as_str(), v.trim())))
        .collect();
    for (name, v) in ms_headers {
        out.push_str(name);
        out.push(':');
        out.push_str(v);
        out.push('\n');
    }

    // リソース: "/{account}{path}" + クエリ（名前順、同名の値はカンマ区切り）
    out.push('/');
    out.push_str(account_name);
    out.push_str(url.path());

    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (k, v) in url.query_pairs() {
        params.entry(k.to_lowercase()).or_default().push(v.into_owned());
    }
    for (k, mut values) in params {
        values.sort();
        out.push('\n');
        out.push_str(&k);
        out.push(':');
        out.push_str(&values.join(","));
    }

    out
}

/// HMAC-SHA256 署名（Base64）
pub(crate) fn sign(key: &[u8], string_to_sign: &str) -> Result<String, StorageError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|e| StorageError::Internal(format!("署名キーエラー: {}", e)))?;
    mac.update(string_to_sign.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
