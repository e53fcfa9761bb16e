//! tracing 구독자 초기화
//!
//! 로그는 stderr로 출력됩니다. stdout은 명령 결과(text/json) 전용입니다.
//! 기본 필터는 scangraph 크레이트에만 `log_level`을 적용하고
//! 나머지(reqwest, hyper 등 HTTP 스택)는 `warn`으로 둡니다.

use std::str::FromStr;

use anyhow::{Context, Result, bail};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use scangraph_core::config::GeneralConfig;

/// `log_level`이 적용되는 tracing target
const SCANGRAPH_TARGETS: [&str; 4] = [
    "scangraph",
    "scangraph_core",
    "scangraph_tenable",
    "scangraph_sync",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => bail!("unknown log format '{other}', expected 'json' or 'pretty'"),
        }
    }
}

fn default_directives(level: &str) -> String {
    SCANGRAPH_TARGETS
        .iter()
        .fold(String::from("warn"), |directives, target| {
            format!("{directives},{target}={level}")
        })
}

/// `RUST_LOG`가 설정되어 있으면 그 지시어를 그대로 쓰고, 잘못된 값은 에러입니다.
fn build_filter(level: &str) -> Result<EnvFilter> {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return EnvFilter::try_from_default_env().context("invalid RUST_LOG directives");
    }
    EnvFilter::try_new(default_directives(level))
        .with_context(|| format!("invalid log level '{level}'"))
}

/// 전역 tracing 구독자를 설치합니다. 프로세스당 한 번만 호출합니다.
///
/// # Formats
///
/// * `"json"` - 한 줄에 하나의 JSON 이벤트
/// * `"pretty"` - 사람이 읽는 여러 줄 출력
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let format: LogFormat = config.log_format.parse()?;
    let registry = tracing_subscriber::registry().with(build_filter(&config.log_level)?);

    let installed = match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
    };
    installed.with_context(|| format!("failed to initialize {format:?} tracing subscriber"))
}
