use std::collections::HashMap;
use std::fmt;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Url;
use crate::error::StorageError;

// ローカルエミュレーター（Azurite）の既知のアカウント
const DEV_ACCOUNT_NAME: &str = "devstoreaccount1";
const DEV_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const DEV_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

const DEFAULT_PROTOCOL: &str = "https";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// ストレージの認証情報
#[derive(Clone)]
pub enum StorageCredentials {
    /// デコード済みのアカウントキー
    SharedKey(Vec<u8>),
    /// 先頭の '?' を除いた SAS トークン
    SharedAccessSignature(String),
}

impl fmt::Debug for StorageCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SharedKey(_) => f.write_str("SharedKey(***)"),
            Self::SharedAccessSignature(_) => f.write_str("SharedAccessSignature(***)"),
        }
    }
}

/// 接続文字列から得たストレージアカウント情報
#[derive(Debug, Clone)]
pub struct StorageAccount {
    pub account_name: String,
    pub blob_endpoint: Url,
    pub credentials: StorageCredentials,
}

impl StorageAccount {
    /// "Key=Value;Key=Value" 形式の接続文字列を解析（キーは大文字小文字を区別しない）
    pub fn parse(connection_string: &str) -> Result<Self, StorageError> {
        let mut settings: HashMap<String, String> = HashMap::new();
        for part in connection_string.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                StorageError::InvalidConnectionString(format!("キーと値の組ではありません: {}", part))
            })?;
            settings.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        if settings.is_empty() {
            return Err(StorageError::InvalidConnectionString("空の接続文字列".to_string()));
        }

        let use_dev = settings
            .get("usedevelopmentstorage")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        if use_dev {
            return Ok(Self {
                account_name: DEV_ACCOUNT_NAME.to_string(),
                blob_endpoint: parse_endpoint(DEV_BLOB_ENDPOINT)?,
                credentials: StorageCredentials::SharedKey(decode_key(DEV_ACCOUNT_KEY)?),
            });
        }

        let explicit_endpoint = settings
            .get("blobendpoint")
            .map(|v| parse_endpoint(v))
            .transpose()?;

        let account_name = match settings.get("accountname") {
            Some(name) if !name.is_empty() => name.clone(),
            _ => explicit_endpoint
                .as_ref()
                .and_then(|u| u.host_str())
                .and_then(|h| h.split('.').next())
                .map(str::to_string)
                .ok_or_else(|| {
                    StorageError::InvalidConnectionString("AccountName がありません".to_string())
                })?,
        };

        let credentials = if let Some(key) = settings.get("accountkey") {
            StorageCredentials::SharedKey(decode_key(key)?)
        } else if let Some(sas) = settings.get("sharedaccesssignature") {
            StorageCredentials::SharedAccessSignature(sas.trim_start_matches('?').to_string())
        } else {
            return Err(StorageError::InvalidConnectionString(
                "AccountKey または SharedAccessSignature がありません".to_string(),
            ));
        };

        let blob_endpoint = match explicit_endpoint {
            Some(url) => url,
            None => {
                let protocol = settings
                    .get("defaultendpointsprotocol")
                    .map(String::as_str)
                    .unwrap_or(DEFAULT_PROTOCOL);
                let suffix = settings
                    .get("endpointsuffix")
                    .map(String::as_str)
                    .unwrap_or(DEFAULT_ENDPOINT_SUFFIX);
                parse_endpoint(&format!("{}://{}.blob.{}", protocol, account_name, suffix))?
            }
        };

        Ok(Self {
            account_name,
            blob_endpoint,
            credentials,
        })
    }

    /// コンテナ / Blob の URL を組み立てる
    pub fn resource_url(&self, segments: &[&str]) -> Result<Url, StorageError> {
        let mut url = self.blob_endpoint.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                StorageError::InvalidConnectionString(format!(
                    "Blob エンドポイントにパスを付与できません: {}",
                    self.blob_endpoint
                ))
            })?;
            path.pop_if_empty();
            for segment in segments {
                // Blob 名の '/' は仮想ディレクトリとしてそのまま残す
                for piece in segment.split('/') {
                    path.push(piece);
                }
            }
        }
        Ok(url)
    }
}

fn parse_endpoint(value: &str) -> Result<Url, StorageError> {
    let url = Url::parse(value)
        .map_err(|e| StorageError::InvalidConnectionString(format!("{}: {}", value, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(StorageError::InvalidConnectionString(format!(
            "サポートされていないプロトコル: {}",
            other
        ))),
    }
}

fn decode_key(key: &str) -> Result<Vec<u8>, StorageError> {
    STANDARD
        .decode(key)
        .map_err(|e| StorageError::InvalidConnectionString(format!("AccountKey のデコードに失敗: {}", e)))
}
