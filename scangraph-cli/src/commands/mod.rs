//! Command handlers -- one module per subcommand

pub mod config;
pub mod export;
pub mod sync;
pub mod validate;

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use scangraph_core::config::ScangraphConfig;
use scangraph_tenable::{HttpTenableClient, TenableClientConfig};

use crate::error::CliError;

/// 설정 파일을 읽고 환경변수 오버라이드를 적용한 뒤 자격 증명을 제외한 값을 검증합니다.
///
/// 자격 증명 검사는 API를 호출하는 명령이 각자 수행합니다.
pub(crate) async fn load_config(config_path: &Path) -> Result<ScangraphConfig, CliError> {
    debug!(path = %config_path.display(), "loading configuration");
    let mut config = ScangraphConfig::from_file(config_path).await?;
    config.apply_env_overrides();
    config.validate_settings()?;
    Ok(config)
}

/// 자격 증명을 확인하고 HTTP 클라이언트를 생성합니다.
pub(crate) fn connect(config: &ScangraphConfig) -> Result<Arc<HttpTenableClient>, CliError> {
    config
        .tenable
        .validate_credentials()
        .map_err(|e| CliError::Config(e.to_string()))?;

    let client = HttpTenableClient::new(TenableClientConfig::from_core(&config.tenable))?;
    info!(base_url = client.base_url(), "api client ready");
    Ok(Arc::new(client))
}

/// 값을 보기 좋은 JSON으로 파일에 씁니다.
pub(crate) async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CliError> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    tokio::fs::write(path, bytes).await?;
    info!(path = %path.display(), "output written");
    Ok(())
}
