//! scangraph -- 스캔 데이터 그래프 동기화 명령줄 도구

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::process::ExitCode;

use clap::Parser;

use scangraph_core::config::{GeneralConfig, ScangraphConfig};

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let general = logging_config(&cli).await;
    if let Err(e) = logging::init_tracing(&general) {
        eprintln!("error: {e}");
        return ExitCode::from(2);
    }

    scangraph_core::metrics::describe_all();
    tracing::debug!(config = %cli.config.display(), "scangraph starting");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, exit_code = e.exit_code(), "command failed");
            eprintln!("error: {e}");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);
    let config_path = cli.config.as_path();

    match cli.command {
        Commands::Sync(args) => commands::sync::execute(args, config_path, &writer).await,
        Commands::Validate(args) => commands::validate::execute(args, config_path, &writer).await,
        Commands::Export(args) => commands::export::execute(args, config_path, &writer).await,
        Commands::Config(args) => commands::config::execute(args, config_path, &writer).await,
    }
}

/// 로깅 설정을 결정합니다.
///
/// 설정 파일을 읽을 수 없으면 기본값을 쓰고, 명령 실행 단계에서 같은 에러를 보고합니다.
/// `--log-level`은 파일과 환경변수보다 우선합니다.
async fn logging_config(cli: &Cli) -> GeneralConfig {
    let mut general = match ScangraphConfig::from_file(&cli.config).await {
        Ok(mut config) => {
            config.apply_env_overrides();
            config.general
        }
        Err(_) => GeneralConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        general.log_level = level.clone();
    }
    general
}
