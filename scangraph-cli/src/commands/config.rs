//! `scangraph config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use scangraph_core::config::ScangraphConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

const REDACTED: &str = "***REDACTED***";
const SECTIONS: [&str; 4] = ["general", "tenable", "export", "sync"];

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Execute the config show subcommand.
///
/// Loads and displays the effective configuration (file + env overrides + defaults).
/// API 키는 항상 가려서 출력합니다.
///
/// # Errors
///
/// Returns `CliError::Core` if loading fails or `CliError::Command` if section name is invalid.
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let mut config = super::load_config(config_path).await?;
    redact_credentials(&mut config);

    let report = build_report(&config, config_path, section)?;
    writer.render(&report)
}

fn build_report(
    config: &ScangraphConfig,
    config_path: &Path,
    section: Option<String>,
) -> Result<ConfigReport, CliError> {
    let config_toml = match section.as_deref() {
        None => toml::to_string_pretty(config),
        Some("general") => toml::to_string_pretty(&config.general),
        Some("tenable") => toml::to_string_pretty(&config.tenable),
        Some("export") => toml::to_string_pretty(&config.export),
        Some("sync") => toml::to_string_pretty(&config.sync),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {} (expected: {})",
                other,
                SECTIONS.join(", ")
            )));
        }
    }
    .unwrap_or_else(|e| format!("(serialization error: {})", e));

    let value = match section.as_deref() {
        None => serde_json::to_value(config)?,
        Some("general") => serde_json::to_value(&config.general)?,
        Some("tenable") => serde_json::to_value(&config.tenable)?,
        Some("export") => serde_json::to_value(&config.export)?,
        Some(_) => serde_json::to_value(&config.sync)?,
    };

    Ok(ConfigReport {
        source: config_path.display().to_string(),
        section,
        config: value,
        config_toml,
    })
}

/// 비어 있지 않은 API 키를 가립니다.
fn redact_credentials(config: &mut ScangraphConfig) {
    for key in [&mut config.tenable.access_key, &mut config.tenable.secret_key] {
        if !key.is_empty() {
            *key = REDACTED.to_owned();
        }
    }
}

/// Configuration display report.
///
/// `config_toml` is only used for text rendering; JSON output carries `config`.
#[derive(Debug, Serialize)]
pub struct ConfigReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub config: serde_json::Value,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_keys() -> ScangraphConfig {
        let mut config = ScangraphConfig::default();
        config.tenable.access_key = "real-access".to_owned();
        config.tenable.secret_key = "real-secret".to_owned();
        config
    }

    #[test]
    fn test_redact_credentials_masks_keys() {
        let mut config = config_with_keys();
        redact_credentials(&mut config);
        assert_eq!(config.tenable.access_key, REDACTED);
        assert_eq!(config.tenable.secret_key, REDACTED);
    }

    #[test]
    fn test_redact_credentials_keeps_empty_keys_empty() {
        let mut config = ScangraphConfig::default();
        redact_credentials(&mut config);
        assert!(config.tenable.access_key.is_empty());
        assert!(config.tenable.secret_key.is_empty());
    }

    #[test]
    fn test_build_report_full_config() {
        let mut config = config_with_keys();
        redact_credentials(&mut config);
        let report = build_report(&config, Path::new("scangraph.toml"), None).expect("report");

        assert!(report.config_toml.contains("[tenable]"));
        assert!(report.config_toml.contains(REDACTED));
        assert!(!report.config_toml.contains("real-secret"));
        assert_eq!(report.config["export"]["asset_chunk_size"], config.export.asset_chunk_size);
    }

    #[test]
    fn test_build_report_single_section() {
        let config = ScangraphConfig::default();
        let report = build_report(&config, Path::new("scangraph.toml"), Some("sync".to_owned()))
            .expect("report");

        assert_eq!(report.section.as_deref(), Some("sync"));
        assert!(report.config_toml.contains("include_users"));
        assert!(!report.config_toml.contains("access_key"));
        assert_eq!(report.config["include_users"], true);
    }

    #[test]
    fn test_build_report_unknown_section_fails() {
        let config = ScangraphConfig::default();
        let err = build_report(&config, Path::new("scangraph.toml"), Some("nonexistent".to_owned()))
            .unwrap_err();
        assert!(err.to_string().contains("unknown section: nonexistent"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_config_report_render_text() {
        colored::control::set_override(false);
        let report = ConfigReport {
            source: "/etc/scangraph.toml".to_owned(),
            section: Some("export".to_owned()),
            config: serde_json::Value::Null,
            config_toml: "poll_interval_ms = 1000\n".to_owned(),
        };

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render should succeed");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("Configuration [export] (source: /etc/scangraph.toml)"));
        assert!(output.contains("poll_interval_ms = 1000"));
    }
}
