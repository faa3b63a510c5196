use std::path::Path;
use std::time::Duration;
use serde::Deserialize;
use crate::constants::{
    DEFAULT_CONTAINER, DEFAULT_REQUEST_TIMEOUT_SECS, MAX_SOURCE_CONTENT_LENGTH, STORAGE_ENV_VAR,
};
use crate::error::ConfigError;

/// サムネイル生成の設定（TOML）
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailerConfig {
    /// ストレージ接続文字列（未設定ならサムネイルは生成しない）
    pub storage: Option<String>,
    pub container: String,
    pub max_source_bytes: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ThumbnailerConfig {
    fn default() -> Self {
        Self {
            storage: None,
            container: DEFAULT_CONTAINER.to_string(),
            max_source_bytes: MAX_SOURCE_CONTENT_LENGTH,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            user_agent: format!("content-thumbnailer/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ThumbnailerConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// 設定ファイル（任意）を読み込み、環境変数で上書き
    pub fn load_with_env(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        Ok(config.with_storage_override(std::env::var(STORAGE_ENV_VAR).ok()))
    }

    // 空文字は無視
    pub fn with_storage_override(mut self, storage: Option<String>) -> Self {
        if let Some(storage) = storage.filter(|s| !s.trim().is_empty()) {
            self.storage = Some(storage);
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_container_name(&self.container)?;
        if self.max_source_bytes == 0 {
            return Err(ConfigError::Invalid("max_source_bytes は 1 以上".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs は 1 以上".to_string()));
        }
        Ok(())
    }
}

// コンテナ名: 3〜63文字、英小文字・数字・ハイフン（先頭末尾と連続ハイフンは不可）
pub fn validate_container_name(name: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid(format!("無効なコンテナ名 '{}': {}", name, reason));

    if !(3..=63).contains(&name.len()) {
        return Err(invalid("長さは3〜63文字"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid("英小文字・数字・ハイフンのみ"));
    }
    if name.starts_with('-') || name.ends_with('-') || name.contains("--") {
        return Err(invalid("ハイフンの位置が不正"));
    }
    Ok(())
}
