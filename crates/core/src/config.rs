//! 설정 관리 -- scangraph.toml 파싱 및 런타임 설정
//!
//! [`ScangraphConfig`]는 모든 크레이트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`SCANGRAPH_TENABLE_ACCESS_KEY=...` 형식)
//! 3. 설정 파일 (`scangraph.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), scangraph_core::error::ScangraphError> {
//! use scangraph_core::config::ScangraphConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드 + 검증
//! let config = ScangraphConfig::load("scangraph.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = ScangraphConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ScangraphError};

/// 기본 API 호스트
pub const DEFAULT_BASE_URL: &str = "https://cloud.tenable.com";

/// export 폴링 간격 하한 (밀리초)
pub const MIN_POLL_INTERVAL_MS: u64 = 100;

/// export 폴링 간격 상한 (밀리초)
pub const MAX_POLL_INTERVAL_MS: u64 = 60_000;

/// 취약점 export가 허용하는 상태 값
pub const VALID_VULN_STATES: [&str; 3] = ["open", "reopened", "fixed"];

/// scangraph 통합 설정
///
/// `scangraph.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScangraphConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// API 접속 설정
    #[serde(default)]
    pub tenable: TenableConfig,
    /// bulk export 설정
    #[serde(default)]
    pub export: ExportConfig,
    /// 동기화 단계 설정
    #[serde(default)]
    pub sync: SyncConfig,
}

impl ScangraphConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드 후 검증합니다.
    ///
    /// 자격 증명은 환경변수로만 주입될 수 있으므로 검증은 오버라이드 이후에 수행합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ScangraphError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드, 검증 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ScangraphError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScangraphError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ScangraphError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, ScangraphError> {
        toml::from_str(toml_str).map_err(|e| {
            ScangraphError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `SCANGRAPH_{SECTION}_{FIELD}`
    /// 예: `SCANGRAPH_TENABLE_SECRET_KEY=...`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "SCANGRAPH_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "SCANGRAPH_GENERAL_LOG_FORMAT");

        // Tenable
        override_string(&mut self.tenable.access_key, "SCANGRAPH_TENABLE_ACCESS_KEY");
        override_string(&mut self.tenable.secret_key, "SCANGRAPH_TENABLE_SECRET_KEY");
        override_string(&mut self.tenable.base_url, "SCANGRAPH_TENABLE_BASE_URL");
        override_u32(
            &mut self.tenable.retry_max_attempts,
            "SCANGRAPH_TENABLE_RETRY_MAX_ATTEMPTS",
        );
        override_u64(
            &mut self.tenable.request_timeout_secs,
            "SCANGRAPH_TENABLE_REQUEST_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.tenable.rate_limit_delay_ms,
            "SCANGRAPH_TENABLE_RATE_LIMIT_DELAY_MS",
        );

        // Export
        override_u32(
            &mut self.export.asset_chunk_size,
            "SCANGRAPH_EXPORT_ASSET_CHUNK_SIZE",
        );
        override_u32(
            &mut self.export.vuln_num_assets,
            "SCANGRAPH_EXPORT_VULN_NUM_ASSETS",
        );
        override_u64(
            &mut self.export.vuln_first_found,
            "SCANGRAPH_EXPORT_VULN_FIRST_FOUND",
        );
        override_csv(&mut self.export.vuln_states, "SCANGRAPH_EXPORT_VULN_STATES");
        override_u64(
            &mut self.export.poll_interval_ms,
            "SCANGRAPH_EXPORT_POLL_INTERVAL_MS",
        );

        // Sync
        override_bool(&mut self.sync.include_users, "SCANGRAPH_SYNC_INCLUDE_USERS");
        override_bool(&mut self.sync.include_assets, "SCANGRAPH_SYNC_INCLUDE_ASSETS");
        override_bool(
            &mut self.sync.include_containers,
            "SCANGRAPH_SYNC_INCLUDE_CONTAINERS",
        );
    }

    /// 설정값의 유효성을 검증합니다 (자격 증명 포함).
    pub fn validate(&self) -> Result<(), ScangraphError> {
        self.validate_settings()?;
        self.tenable.validate_credentials()?;
        Ok(())
    }

    /// 자격 증명을 제외한 설정값을 검증합니다.
    ///
    /// `config show`나 오프라인 검증처럼 API를 호출하지 않는 경로에서 사용합니다.
    pub fn validate_settings(&self) -> Result<(), ScangraphError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if !self.tenable.base_url.starts_with("http://")
            && !self.tenable.base_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                field: "tenable.base_url".to_owned(),
                reason: "must start with http:// or https://".to_owned(),
            }
            .into());
        }

        if self.tenable.retry_max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tenable.retry_max_attempts".to_owned(),
                reason: "must be at least 1".to_owned(),
            }
            .into());
        }

        if self.tenable.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tenable.request_timeout_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        // 플랫폼 제한: asset chunk 100..=10000, vuln num_assets 50..=5000
        if !(100..=10_000).contains(&self.export.asset_chunk_size) {
            return Err(ConfigError::InvalidValue {
                field: "export.asset_chunk_size".to_owned(),
                reason: "must be between 100 and 10000".to_owned(),
            }
            .into());
        }

        if !(50..=5_000).contains(&self.export.vuln_num_assets) {
            return Err(ConfigError::InvalidValue {
                field: "export.vuln_num_assets".to_owned(),
                reason: "must be between 50 and 5000".to_owned(),
            }
            .into());
        }

        if !(MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS).contains(&self.export.poll_interval_ms) {
            return Err(ConfigError::InvalidValue {
                field: "export.poll_interval_ms".to_owned(),
                reason: format!(
                    "must be between {MIN_POLL_INTERVAL_MS} and {MAX_POLL_INTERVAL_MS}"
                ),
            }
            .into());
        }

        if self.export.vuln_states.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "export.vuln_states".to_owned(),
                reason: "at least one state is required".to_owned(),
            }
            .into());
        }

        if let Some(bad) = self
            .export
            .vuln_states
            .iter()
            .find(|s| !VALID_VULN_STATES.contains(&s.as_str()))
        {
            return Err(ConfigError::InvalidValue {
                field: "export.vuln_states".to_owned(),
                reason: format!(
                    "unknown state '{bad}', must be one of: {}",
                    VALID_VULN_STATES.join(", ")
                ),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// API 접속 설정
///
/// `Debug` 출력에서 키 값은 가려집니다.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TenableConfig {
    /// API access key
    pub access_key: String,
    /// API secret key
    pub secret_key: String,
    /// API 호스트 (끝의 `/` 없이)
    pub base_url: String,
    /// 요청당 최대 시도 횟수 (첫 시도 포함)
    pub retry_max_attempts: u32,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
    /// 429 응답에 `Retry-After`가 없을 때 대기 시간 (밀리초)
    pub rate_limit_delay_ms: u64,
}

impl TenableConfig {
    /// access/secret key가 모두 설정되었는지 확인합니다.
    pub fn validate_credentials(&self) -> Result<(), ConfigError> {
        if self.access_key.trim().is_empty() {
            return Err(ConfigError::MissingCredentials {
                field: "tenable.access_key".to_owned(),
            });
        }
        if self.secret_key.trim().is_empty() {
            return Err(ConfigError::MissingCredentials {
                field: "tenable.secret_key".to_owned(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for TenableConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenableConfig")
            .field("access_key", &redact(&self.access_key))
            .field("secret_key", &redact(&self.secret_key))
            .field("base_url", &self.base_url)
            .field("retry_max_attempts", &self.retry_max_attempts)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("rate_limit_delay_ms", &self.rate_limit_delay_ms)
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() { "<empty>" } else { "<redacted>" }
}

impl Default for TenableConfig {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            secret_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            retry_max_attempts: 10,
            request_timeout_secs: 60,
            rate_limit_delay_ms: 1_000,
        }
    }
}

/// bulk export 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// asset export chunk 크기
    pub asset_chunk_size: u32,
    /// 취약점 export chunk당 asset 수
    pub vuln_num_assets: u32,
    /// 취약점 export `first_found` 필터 (unix 초)
    pub vuln_first_found: u64,
    /// 취약점 export 상태 필터
    pub vuln_states: Vec<String>,
    /// export 상태 폴링 간격 (밀리초)
    pub poll_interval_ms: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            asset_chunk_size: 100,
            vuln_num_assets: 50,
            // 2002-01-01T00:00:00Z
            vuln_first_found: 1_009_861_200,
            vuln_states: VALID_VULN_STATES.iter().map(|s| (*s).to_owned()).collect(),
            poll_interval_ms: 1_000,
        }
    }
}

/// 동기화 단계 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// 사용자 엔티티와 소유 관계 수집 여부
    pub include_users: bool,
    /// asset 엔티티 수집 여부
    pub include_assets: bool,
    /// 컨테이너 보안 리포트 수집 여부
    pub include_containers: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            include_users: true,
            include_assets: true,
            include_containers: false,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
