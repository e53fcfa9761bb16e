//! `scangraph export` command handler

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use scangraph_sync::export::{asset_options_from_core, vulnerability_options_from_core};
use scangraph_sync::{ExportCache, ExportCacheBuilder, ExportRequest, validate_invocation};

use crate::cli::{ExportArgs, ExportTarget};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `export` command.
///
/// 단일 bulk export를 끝까지 구동하고 캐시 통계를 출력합니다.
/// `--out`이 주어지면 캐시된 레코드를 JSON 배열로 저장합니다.
pub async fn execute(
    args: ExportArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = super::load_config(config_path).await?;
    let client = super::connect(&config)?;
    validate_invocation(&config.tenable, client.as_ref()).await?;

    let request = match args.kind {
        ExportTarget::Assets => ExportRequest::Assets(asset_options_from_core(&config.export)),
        ExportTarget::Vulnerabilities => {
            ExportRequest::Vulnerabilities(vulnerability_options_from_core(&config.export))
        }
    };

    info!(kind = %request.kind(), "running export");
    let cache = ExportCacheBuilder::new(client.as_ref())
        .poll_interval(Duration::from_millis(config.export.poll_interval_ms))
        .build_export_cache(&request)
        .await?;

    if let Some(out) = &args.out {
        match &cache {
            ExportCache::Assets(assets) => {
                super::write_json(out, &assets.iter().collect::<Vec<_>>()).await?
            }
            ExportCache::Vulnerabilities(vulns) => {
                super::write_json(out, &vulns.iter().collect::<Vec<_>>()).await?
            }
        }
    }

    writer.render(&ExportReport::new(&cache, args.out.as_deref()))
}

/// export 결과 보고서
#[derive(Debug, Serialize)]
pub struct ExportReport {
    pub kind: String,
    pub records: usize,
    pub duplicate_keys: usize,
    /// 취약점 export에서 레코드가 하나 이상인 asset 수
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
}

impl ExportReport {
    fn new(cache: &ExportCache, out: Option<&Path>) -> Self {
        let (duplicate_keys, assets) = match cache {
            ExportCache::Assets(c) => (c.duplicate_keys(), None),
            ExportCache::Vulnerabilities(c) => (c.duplicate_keys(), Some(c.asset_count())),
        };
        Self {
            kind: cache.kind().to_string(),
            records: cache.len(),
            duplicate_keys,
            assets,
            output_file: out.map(|p| p.display().to_string()),
        }
    }
}

impl Render for ExportReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Export: {}", self.kind.bold())?;
        writeln!(w, "  Records: {}", self.records)?;
        if let Some(assets) = self.assets {
            writeln!(w, "  Assets: {}", assets)?;
        }
        if self.duplicate_keys > 0 {
            writeln!(
                w,
                "  Duplicate keys: {}",
                self.duplicate_keys.to_string().yellow()
            )?;
        }
        if let Some(path) = &self.output_file {
            writeln!(w, "  Written to {}", path)?;
        }
        Ok(())
    }
}
