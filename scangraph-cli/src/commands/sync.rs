//! `scangraph sync` command handler

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use scangraph_core::MemoryGraphSink;
use scangraph_sync::{SyncEngine, SyncOptions, SyncSummary, validate_invocation};

use crate::cli::SyncArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `sync` command.
///
/// 자격 증명 검증 → 동기화 실행 → (선택) 그래프 스냅샷 저장 → 요약 출력 순서로 진행합니다.
pub async fn execute(
    args: SyncArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = super::load_config(config_path).await?;
    let client = super::connect(&config)?;
    let session = validate_invocation(&config.tenable, client.as_ref()).await?;

    let mut options = SyncOptions::from_core(&config);
    if args.containers {
        options.include_containers = true;
    }

    let engine = SyncEngine::new(Arc::clone(&client), options);
    let mut sink = MemoryGraphSink::new();
    let summary = engine.run(&mut sink).await?;

    let snapshot = sink.into_snapshot();
    if let Some(out) = &args.out {
        super::write_json(out, &snapshot).await?;
    }

    info!(
        run_id = %summary.run_id,
        entities = summary.entities,
        relationships = summary.relationships,
        "sync command finished"
    );

    writer.render(&SyncReport {
        account: session.username,
        output_file: args.out.map(|p| p.display().to_string()),
        summary,
    })
}

/// 동기화 결과 보고서
#[derive(Debug, Serialize)]
pub struct SyncReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    pub summary: SyncSummary,
}

impl Render for SyncReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let s = &self.summary;
        writeln!(w, "Sync run: {}", s.run_id.bold())?;
        if let Some(account) = &self.account {
            writeln!(w, "Account: {}", account)?;
        }
        writeln!(w)?;
        writeln!(w, "Users:          {}", s.users)?;
        writeln!(
            w,
            "Scans:          {} (completed: {}, forbidden: {}, archived: {})",
            s.scans, s.scans_completed, s.scans_forbidden, s.scans_archived
        )?;
        writeln!(w, "Hosts:          {}", s.hosts)?;
        writeln!(w, "Assets:         {}", s.assets)?;
        if s.duplicate_findings > 0 {
            writeln!(
                w,
                "Findings:       {} ({})",
                s.findings,
                format!("{} duplicates skipped", s.duplicate_findings).yellow()
            )?;
        } else {
            writeln!(w, "Findings:       {}", s.findings)?;
        }
        writeln!(w, "Vulnerabilities: {}", s.vulnerabilities)?;
        writeln!(
            w,
            "Asset cache:    {} hits / {} misses",
            s.asset_cache_hits, s.asset_cache_misses
        )?;
        writeln!(
            w,
            "Vuln cache:     {} hits / {} misses",
            s.vulnerability_cache_hits, s.vulnerability_cache_misses
        )?;
        if s.containers > 0 {
            writeln!(
                w,
                "Containers:     {} ({} reports)",
                s.containers, s.container_reports
            )?;
        }
        writeln!(w)?;
        writeln!(
            w,
            "Graph: {} entities, {} relationships ({} mapped)",
            s.entities.to_string().green().bold(),
            s.relationships.to_string().green().bold(),
            s.mapped_relationships
        )?;
        if let Some(path) = &self.output_file {
            writeln!(w, "Snapshot written to {}", path)?;
        }
        Ok(())
    }
}
