//! `scangraph validate` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use scangraph_sync::validate_invocation;

use crate::cli::ValidateArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `validate` command.
///
/// 설정 파일 검증 후, `--offline`이 아니면 `/session` 호출로 자격 증명을 확인합니다.
/// 보고서는 실패한 경우에도 출력되며, 종료 코드는 실패 원인을 따릅니다.
pub async fn execute(
    args: ValidateArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let source = config_path.display().to_string();

    let config = match super::load_config(config_path).await {
        Ok(config) => config,
        Err(e) => {
            writer.render(&ValidationReport::failed(source, false, &e))?;
            return Err(e);
        }
    };

    if args.offline {
        if let Err(e) = config
            .tenable
            .validate_credentials()
            .map_err(|e| CliError::Config(e.to_string()))
        {
            writer.render(&ValidationReport::failed(source, true, &e))?;
            return Err(e);
        }
        info!(path = %source, "configuration is valid (offline)");
        writer.render(&ValidationReport {
            source,
            offline: true,
            valid: true,
            account: None,
            errors: Vec::new(),
        })?;
        return Ok(());
    }

    let result = match super::connect(&config) {
        Ok(client) => validate_invocation(&config.tenable, client.as_ref())
            .await
            .map_err(CliError::from),
        Err(e) => Err(e),
    };

    match result {
        Ok(session) => {
            writer.render(&ValidationReport {
                source,
                offline: false,
                valid: true,
                account: session.username,
                errors: Vec::new(),
            })?;
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "validation failed");
            writer.render(&ValidationReport::failed(source, false, &e))?;
            Err(e)
        }
    }
}

/// 검증 결과 보고서
#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub source: String,
    pub offline: bool,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn failed(source: String, offline: bool, error: &CliError) -> Self {
        Self {
            source,
            offline,
            valid: false,
            account: None,
            errors: vec![error.to_string()],
        }
    }
}

impl Render for ValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let mode = if self.offline { "offline" } else { "online" };
        writeln!(w, "Validation ({}): {}", mode, self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
            if let Some(account) = &self.account {
                writeln!(w, "  Account: {}", account)?;
            }
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}
