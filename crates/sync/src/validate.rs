//! 실행 전 자격 증명 검증

use tracing::{info, warn};

use scangraph_core::config::TenableConfig;
use scangraph_tenable::{SessionInfo, TenableApi};

use crate::error::SyncError;

/// 자격 증명을 검증합니다.
///
/// 키가 비어 있으면 네트워크 호출 없이 [`SyncError::Config`]로 실패하고,
/// `/session` 호출이 실패하면 원래 에러를 담은 [`SyncError::Authentication`]을 반환합니다.
pub async fn validate_invocation<A: TenableApi>(
    config: &TenableConfig,
    api: &A,
) -> Result<SessionInfo, SyncError> {
    config.validate_credentials()?;

    match api.fetch_user_permissions().await {
        Ok(session) => {
            info!(
                username = session.username.as_deref().unwrap_or("<unknown>"),
                permissions = session.permissions,
                "credentials validated"
            );
            Ok(session)
        }
        Err(source) => {
            warn!(error = %source, "credential validation failed");
            Err(SyncError::Authentication { source })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTenableApi;
    use scangraph_core::error::ConfigError;

    fn config(access: &str, secret: &str) -> TenableConfig {
        TenableConfig {
            access_key: access.to_owned(),
            secret_key: secret.to_owned(),
            ..TenableConfig::default()
        }
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_network() {
        let api = MockTenableApi::builder().build();
        let err = validate_invocation(&config("", "secret"), &api)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::Config(ConfigError::MissingCredentials { .. })
        ));
        assert_eq!(api.session_calls(), 0);
    }

    #[tokio::test]
    async fn valid_credentials_return_session() {
        let api = MockTenableApi::builder().build();
        let session = validate_invocation(&config("access", "secret"), &api)
            .await
            .unwrap();
        assert_eq!(session.username.as_deref(), Some("admin@example.com"));
        assert_eq!(api.session_calls(), 1);
    }

    #[tokio::test]
    async fn rejected_credentials_become_authentication_error() {
        let api = MockTenableApi::builder().session_status(401).build();
        let err = validate_invocation(&config("access", "wrong"), &api)
            .await
            .unwrap_err();
        match err {
            SyncError::Authentication { source } => assert_eq!(source.status(), Some(401)),
            other => panic!("unexpected error: {other}"),
        }
    }
}
