//! 동기화 엔진 -- 실행 한 번의 전체 흐름
//!
//! ```text
//! Init ─▶ Account ─▶ Users ─▶ Scans ─▶ Assets ─▶ Vulnerabilities ─▶ ScanIteration ─▶ HostProcessing ─▶ Containers ─▶ Done
//!  │                                                                   │
//!  └─ export 캐시 2개 (실패 시 중단)                                    └─ completed 스캔만, 입력 순서대로
//! ```
//!
//! 관계가 가리키는 취약점 엔티티(`tenable_vulnerability_{plugin_id}`)는 관계보다 먼저
//! 한 번만 기록됩니다. export 레코드가 있는 플러그인은 Vulnerabilities 단계에서,
//! 나머지는 스캔 결과의 플러그인 요약으로 처음 만나는 시점에 기록됩니다.
//!
//! 허용되는 실패는 두 가지뿐입니다: 접근 불가(403) 스캔은 건너뛰고,
//! 호스트 취약점 404는 빈 목록입니다. 그 외 실패는 모두 실행을 중단하며
//! 이미 싱크에 기록된 객체는 되돌리지 않습니다.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use scangraph_core::config::ScangraphConfig;
use scangraph_core::error::ConfigError;
use scangraph_core::metrics as m;
use scangraph_core::{Entity, GraphSink, Relationship};
use scangraph_tenable::{
    AssetExport, Container, ExportAssetsOptions, ExportVulnerabilitiesOptions, ScanDetailOutcome,
    ScanHost, ScanStatus, ScanSummary, TenableApi, User,
};

use crate::converters::{
    FindingSource, asset_key, create_account_asset_relationship,
    create_account_container_relationship, create_account_entity,
    create_account_user_relationship, create_asset_entity, create_asset_host_relationships,
    create_asset_vulnerability_relationship, create_container_entity,
    create_container_finding_entity, create_container_malware_entity,
    create_container_report_entity, create_container_report_relationship,
    create_container_unwanted_program_entity, create_exported_vulnerability_entity,
    create_finding_vulnerability_relationship, create_host_vulnerability_entity,
    create_report_identified_relationship, create_scan_entity, create_scan_finding_relationship,
    create_scan_vulnerability_entity, create_scan_vulnerability_relationship, create_user_entity,
    create_user_scan_relationship, create_vulnerability_cve_relationships,
    create_vulnerability_finding_entity, user_key,
};
use crate::error::SyncError;
use crate::export::{
    ExportCacheBuilder, ExportKind, asset_options_from_core, clamp_poll_interval,
    vulnerability_options_from_core,
};
use crate::index::{ExportIndex, IdentitySource};

/// 동기화 옵션
///
/// 생성 후 변경되지 않으며 엔진 생성자에 값으로 전달됩니다.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub include_users: bool,
    pub include_assets: bool,
    pub include_containers: bool,
    pub asset_export: ExportAssetsOptions,
    pub vulnerability_export: ExportVulnerabilitiesOptions,
    /// export 상태 폴링 간격 (`[100ms, 60s]`로 고정)
    pub poll_interval: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            include_users: true,
            include_assets: true,
            include_containers: false,
            asset_export: ExportAssetsOptions::default(),
            vulnerability_export: ExportVulnerabilitiesOptions::default(),
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl SyncOptions {
    /// 설정 파일의 `[export]`, `[sync]` 섹션에서 옵션을 만듭니다.
    pub fn from_core(config: &ScangraphConfig) -> Self {
        Self {
            include_users: config.sync.include_users,
            include_assets: config.sync.include_assets,
            include_containers: config.sync.include_containers,
            asset_export: asset_options_from_core(&config.export),
            vulnerability_export: vulnerability_options_from_core(&config.export),
            poll_interval: clamp_poll_interval(Duration::from_millis(
                config.export.poll_interval_ms,
            )),
        }
    }
}

/// 실행 결과 요약
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub run_id: String,
    /// 계정 엔티티 키 (세션에 식별자가 없으면 `None`)
    pub account: Option<String>,
    pub users: usize,
    pub scans: usize,
    pub scans_completed: usize,
    pub scans_forbidden: usize,
    pub scans_archived: usize,
    pub hosts: usize,
    pub findings: usize,
    pub duplicate_findings: usize,
    pub scan_vulnerabilities: usize,
    /// 기록된 플러그인 단위 취약점 엔티티 수
    pub vulnerabilities: usize,
    pub assets: usize,
    pub asset_cache_hits: usize,
    pub asset_cache_misses: usize,
    pub vulnerability_cache_hits: usize,
    pub vulnerability_cache_misses: usize,
    pub containers: usize,
    pub container_reports: usize,
    pub entities: usize,
    pub relationships: usize,
    /// `relationships` 중 다른 통합의 엔티티를 가리키는 매핑 관계 수
    pub mapped_relationships: usize,
}

/// 동기화 엔진 빌더
pub struct SyncEngineBuilder<A: TenableApi> {
    api: Option<Arc<A>>,
    options: SyncOptions,
}

impl<A: TenableApi> SyncEngineBuilder<A> {
    pub fn new() -> Self {
        Self {
            api: None,
            options: SyncOptions::default(),
        }
    }

    /// API 클라이언트를 설정합니다.
    pub fn api(mut self, api: Arc<A>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn include_users(mut self, include: bool) -> Self {
        self.options.include_users = include;
        self
    }

    pub fn include_assets(mut self, include: bool) -> Self {
        self.options.include_assets = include;
        self
    }

    pub fn include_containers(mut self, include: bool) -> Self {
        self.options.include_containers = include;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.options.poll_interval = clamp_poll_interval(interval);
        self
    }

    pub fn build(self) -> Result<SyncEngine<A>, SyncError> {
        let api = self.api.ok_or_else(|| ConfigError::InvalidValue {
            field: "api".to_owned(),
            reason: "api client must be provided".to_owned(),
        })?;
        Ok(SyncEngine::new(api, self.options))
    }
}

impl<A: TenableApi> Default for SyncEngineBuilder<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// 동기화 엔진
///
/// 한 번의 [`run`](Self::run)이 export 캐시를 새로 만들고 전체 그래프를 다시 계산합니다.
pub struct SyncEngine<A: TenableApi> {
    api: Arc<A>,
    options: SyncOptions,
}

impl<A: TenableApi> SyncEngine<A> {
    pub fn new(api: Arc<A>, options: SyncOptions) -> Self {
        Self { api, options }
    }

    pub fn builder() -> SyncEngineBuilder<A> {
        SyncEngineBuilder::new()
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// 실행 한 번을 수행하고 요약을 반환합니다.
    pub async fn run<S: GraphSink>(&self, sink: &mut S) -> Result<SyncSummary, SyncError> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("sync_run", run_id = %run_id);
        let mut run = Run {
            sink,
            account: None,
            summary: SyncSummary {
                run_id,
                ..SyncSummary::default()
            },
        };

        async {
            info!("sync run started");
            let index = self.build_index().await?;
            self.sync_account(&mut run).await?;

            let users = if self.options.include_users {
                self.sync_users(&mut run).await?
            } else {
                Vec::new()
            };

            let scans = self.api.fetch_scans().await?;
            self.sync_scans(&mut run, &scans, &users).await?;

            if self.options.include_assets {
                self.sync_assets(&mut run, index.assets().iter()).await?;
            }
            self.sync_vulnerabilities(&mut run, &index).await?;

            for scan in &scans {
                if scan.status != ScanStatus::Completed {
                    debug!(scan_id = scan.id, status = scan.status.as_str(), "scan not completed, skipping");
                    continue;
                }
                run.summary.scans_completed += 1;
                self.process_scan(&mut run, scan, &index).await?;
            }

            if self.options.include_containers {
                self.sync_containers(&mut run).await?;
            }

            let summary = &run.summary;
            info!(
                scans = summary.scans,
                scans_completed = summary.scans_completed,
                scans_forbidden = summary.scans_forbidden,
                hosts = summary.hosts,
                findings = summary.findings,
                vulnerabilities = summary.vulnerabilities,
                entities = summary.entities,
                relationships = summary.relationships,
                "sync run completed"
            );
            Ok::<(), SyncError>(())
        }
        .instrument(span)
        .await?;

        Ok(run.summary)
    }

    /// Init 단계: 두 export 캐시를 만들어 인덱스로 묶습니다.
    pub async fn build_index(&self) -> Result<ExportIndex, SyncError> {
        let builder =
            ExportCacheBuilder::new(self.api.as_ref()).poll_interval(self.options.poll_interval);
        let assets = builder.build_asset_cache(&self.options.asset_export).await?;
        let vulnerabilities = builder
            .build_vulnerability_cache(&self.options.vulnerability_export)
            .await?;
        info!(
            assets = assets.len(),
            vulnerabilities = vulnerabilities.len(),
            vulnerability_assets = vulnerabilities.asset_count(),
            "export index built"
        );
        Ok(ExportIndex::new(assets, vulnerabilities))
    }

    /// Account 단계: `/session` 응답으로 계정 엔티티를 기록합니다.
    async fn sync_account<S: GraphSink>(&self, run: &mut Run<'_, S>) -> Result<(), SyncError> {
        let session = self.api.fetch_user_permissions().await?;
        let Some(account) = create_account_entity(&session) else {
            warn!("session has no account identifier, account relationships are not created");
            return Ok(());
        };
        info!(account = %account.key, "account synchronized");
        run.summary.account = Some(account.key.clone());
        run.add_entity(account.clone()).await?;
        run.account = Some(account);
        Ok(())
    }

    async fn sync_users<S: GraphSink>(&self, run: &mut Run<'_, S>) -> Result<Vec<User>, SyncError> {
        let users = self.api.fetch_users().await?;
        for user in &users {
            run.add_entity(create_user_entity(user)).await?;
            run.summary.users += 1;
            if let Some(account) = &run.account {
                let relationship = create_account_user_relationship(account, user);
                run.add_relationship(relationship).await?;
            }
        }
        info!(users = users.len(), "users synchronized");
        Ok(users)
    }

    /// 스캔 엔티티와 소유자 관계
    ///
    /// 소유자 관계는 사용자 엔티티가 싱크에 기록된 경우에만 만듭니다.
    async fn sync_scans<S: GraphSink>(
        &self,
        run: &mut Run<'_, S>,
        scans: &[ScanSummary],
        users: &[User],
    ) -> Result<(), SyncError> {
        for scan in scans {
            run.add_entity(create_scan_entity(scan)).await?;
            run.summary.scans += 1;

            let Some(owner) = scan.owner.as_deref() else {
                continue;
            };
            let Some(user) = users.iter().find(|u| u.username == owner) else {
                continue;
            };
            if run.sink.find_entity(&user_key(user.id)).is_some() {
                run.add_relationship(create_user_scan_relationship(user, scan))
                    .await?;
            }
        }
        info!(scans = scans.len(), "scans synchronized");
        Ok(())
    }

    async fn sync_assets<'a, S: GraphSink>(
        &self,
        run: &mut Run<'_, S>,
        assets: impl Iterator<Item = &'a AssetExport>,
    ) -> Result<(), SyncError> {
        for asset in assets {
            if !run.add_entity_once(create_asset_entity(asset)).await? {
                debug!(asset_id = %asset.id, "asset entity already recorded");
                continue;
            }
            run.summary.assets += 1;

            if let Some(account) = &run.account {
                let relationship = create_account_asset_relationship(account, asset);
                run.add_relationship_once(relationship).await?;
            }
            for relationship in create_asset_host_relationships(asset) {
                run.add_relationship_once(relationship).await?;
            }
        }
        info!(assets = run.summary.assets, "assets synchronized");
        Ok(())
    }

    /// Vulnerabilities 단계: 취약점 export 레코드로 플러그인 단위 취약점 엔티티,
    /// CVE 매핑 관계, asset → 취약점 관계를 기록합니다.
    ///
    /// asset → 취약점 관계는 asset 엔티티가 싱크에 있을 때만 만듭니다.
    async fn sync_vulnerabilities<S: GraphSink>(
        &self,
        run: &mut Run<'_, S>,
        index: &ExportIndex,
    ) -> Result<(), SyncError> {
        for export in index.vulnerabilities().iter() {
            if run
                .add_vulnerability(create_exported_vulnerability_entity(export))
                .await?
            {
                for relationship in create_vulnerability_cve_relationships(&export.plugin) {
                    run.add_relationship_once(relationship).await?;
                }
            }

            if run.sink.find_entity(&asset_key(&export.asset.uuid)).is_some() {
                run.add_relationship_once(create_asset_vulnerability_relationship(export))
                    .await?;
            }
        }
        info!(
            vulnerabilities = run.summary.vulnerabilities,
            "vulnerabilities synchronized"
        );
        Ok(())
    }

    /// ScanIteration: completed 스캔 하나의 상세를 처리합니다.
    async fn process_scan<S: GraphSink>(
        &self,
        run: &mut Run<'_, S>,
        scan: &ScanSummary,
        index: &ExportIndex,
    ) -> Result<(), SyncError> {
        let detail = match self.api.fetch_scan_detail(scan.id).await? {
            ScanDetailOutcome::Found(detail) => detail,
            ScanDetailOutcome::Forbidden => {
                warn!(scan_id = scan.id, scan_uuid = ?scan.uuid, "scan detail forbidden, skipping scan");
                run.summary.scans_forbidden += 1;
                counter!(m::SYNC_SCANS_SKIPPED_TOTAL, m::LABEL_REASON => "forbidden").increment(1);
                return Ok(());
            }
        };

        if let Some(vulnerabilities) = &detail.vulnerabilities {
            info!(
                scan_id = scan.id,
                scan_vulnerabilities = vulnerabilities.len(),
                "processing vulnerabilities discovered by scan"
            );
            for vulnerability in vulnerabilities {
                run.add_vulnerability(create_scan_vulnerability_entity(vulnerability))
                    .await?;
                let relationship = create_scan_vulnerability_relationship(scan, vulnerability);
                if run.sink.has_key(&relationship.key) {
                    debug!(key = %relationship.key, "scan vulnerability already recorded");
                    continue;
                }
                run.add_relationship(relationship).await?;
                run.summary.scan_vulnerabilities += 1;
            }
        }

        let Some(hosts) = &detail.hosts else {
            return Ok(());
        };
        // 보관된 스캔의 호스트 상세는 404를 반환하므로 조회하지 않습니다.
        if detail.is_archived() {
            info!(scan_id = scan.id, hosts = hosts.len(), "scan is archived, skipping hosts");
            run.summary.scans_archived += 1;
            counter!(m::SYNC_SCANS_SKIPPED_TOTAL, m::LABEL_REASON => "archived").increment(1);
            return Ok(());
        }

        info!(scan_id = scan.id, hosts = hosts.len(), "processing scan hosts");
        for host in hosts {
            self.process_host(run, scan, host, index).await?;
        }
        Ok(())
    }

    /// HostProcessing: 호스트 하나의 취약점마다 Finding 1개와 관계 2개를 기록합니다.
    async fn process_host<S: GraphSink>(
        &self,
        run: &mut Run<'_, S>,
        scan: &ScanSummary,
        host: &ScanHost,
        index: &ExportIndex,
    ) -> Result<(), SyncError> {
        let vulnerabilities = self
            .api
            .fetch_scan_host_vulnerabilities(scan.id, host.host_id)
            .await?;
        run.summary.hosts += 1;

        let identity = index.resolve_host(host);
        match identity.source {
            IdentitySource::AssetExport => run.summary.asset_cache_hits += 1,
            IdentitySource::ScanHostUuid | IdentitySource::HostId => {
                info!(
                    scan_id = scan.id,
                    host_id = host.host_id,
                    host_uuid = ?host.uuid,
                    asset_uuid = %identity.asset_uuid,
                    "no asset export record for scan host, some details cannot be provided"
                );
                run.summary.asset_cache_misses += 1;
                counter!(m::SYNC_EXPORT_CACHE_MISSES_TOTAL, m::LABEL_EXPORT_KIND => ExportKind::Assets.as_str())
                    .increment(1);
            }
        }

        debug!(
            scan_id = scan.id,
            host_id = host.host_id,
            asset_uuid = %identity.asset_uuid,
            host_vulnerabilities = vulnerabilities.len(),
            "processing host vulnerabilities"
        );

        for vulnerability in &vulnerabilities {
            let export = index
                .find_vulnerability_by_asset_and_plugin(&identity.asset_uuid, vulnerability.plugin_id);
            if export.is_some() {
                run.summary.vulnerability_cache_hits += 1;
            } else {
                run.summary.vulnerability_cache_misses += 1;
                counter!(m::SYNC_EXPORT_CACHE_MISSES_TOTAL, m::LABEL_EXPORT_KIND => ExportKind::Vulnerabilities.as_str())
                    .increment(1);
            }

            let source = FindingSource {
                scan,
                host,
                asset_uuid: &identity.asset_uuid,
                asset: identity.asset,
                vulnerability,
                export,
            };
            let finding = create_vulnerability_finding_entity(&source);

            // 서로 다른 호스트가 같은 asset으로 해석되면 같은 키가 나옵니다.
            if run.sink.has_key(&finding.key) {
                warn!(
                    key = %finding.key,
                    host_id = host.host_id,
                    "finding already recorded for this scan and asset, skipping"
                );
                run.summary.duplicate_findings += 1;
                continue;
            }

            let finding_key = finding.key.clone();
            run.add_entity(finding).await?;
            run.add_vulnerability(create_host_vulnerability_entity(vulnerability))
                .await?;
            run.add_relationship(create_scan_finding_relationship(&source, &finding_key))
                .await?;
            run.add_relationship(create_finding_vulnerability_relationship(
                &source,
                &finding_key,
            ))
            .await?;
            run.summary.findings += 1;
            counter!(m::SYNC_FINDINGS_EMITTED_TOTAL).increment(1);
        }
        Ok(())
    }

    async fn sync_containers<S: GraphSink>(&self, run: &mut Run<'_, S>) -> Result<(), SyncError> {
        let containers = self.api.fetch_containers().await?;
        for container in &containers {
            self.sync_container(run, container).await?;
        }
        info!(
            containers = run.summary.containers,
            reports = run.summary.container_reports,
            "containers synchronized"
        );
        Ok(())
    }

    async fn sync_container<S: GraphSink>(
        &self,
        run: &mut Run<'_, S>,
        container: &Container,
    ) -> Result<(), SyncError> {
        let container_entity = create_container_entity(container);
        if !run.add_entity_once(container_entity.clone()).await? {
            return Ok(());
        }
        run.summary.containers += 1;
        if let Some(account) = &run.account {
            let relationship = create_account_container_relationship(account, container);
            run.add_relationship(relationship).await?;
        }

        let Some(digest) = container.digest.as_deref().filter(|d| !d.is_empty()) else {
            debug!(container_id = %container.id, "container has no digest, skipping report");
            return Ok(());
        };

        let report = self.api.fetch_report_by_image_digest(digest).await?;
        debug!(
            digest,
            findings = report.findings.len(),
            malware = report.malware.len(),
            unwanted_programs = report.potentially_unwanted_programs.len(),
            "container report fetched"
        );

        let report_entity = create_container_report_entity(&report, digest);
        if run.add_entity_once(report_entity.clone()).await? {
            run.summary.container_reports += 1;
        }
        run.add_relationship_once(create_container_report_relationship(
            &container_entity,
            &report_entity,
        ))
        .await?;

        let children = report
            .findings
            .iter()
            .map(create_container_finding_entity)
            .chain(report.malware.iter().map(create_container_malware_entity))
            .chain(
                report
                    .potentially_unwanted_programs
                    .iter()
                    .map(create_container_unwanted_program_entity),
            );
        for child in children {
            let Some(child) = child else {
                debug!(digest, "report item has no identifier, skipping");
                continue;
            };
            let relationship = create_report_identified_relationship(&report_entity, &child);
            run.add_entity_once(child).await?;
            run.add_relationship_once(relationship).await?;
        }
        Ok(())
    }
}

/// 실행 한 번의 가변 상태 (싱크 + 계정 + 카운터)
struct Run<'s, S: GraphSink> {
    sink: &'s mut S,
    account: Option<Entity>,
    summary: SyncSummary,
}

impl<S: GraphSink> Run<'_, S> {
    async fn add_entity(&mut self, entity: Entity) -> Result<(), SyncError> {
        self.sink.add_entity(entity).await?;
        self.summary.entities += 1;
        Ok(())
    }

    async fn add_relationship(&mut self, relationship: Relationship) -> Result<(), SyncError> {
        let mapped = relationship.is_mapped();
        self.sink.add_relationship(relationship).await?;
        self.summary.relationships += 1;
        if mapped {
            self.summary.mapped_relationships += 1;
        }
        Ok(())
    }

    /// 플러그인 단위 취약점 엔티티는 처음 만난 레코드로 한 번만 기록합니다.
    async fn add_vulnerability(&mut self, entity: Entity) -> Result<bool, SyncError> {
        let added = self.add_entity_once(entity).await?;
        if added {
            self.summary.vulnerabilities += 1;
        }
        Ok(added)
    }

    /// 같은 키가 이미 기록되어 있으면 건너뛰고 `false`를 반환합니다.
    async fn add_entity_once(&mut self, entity: Entity) -> Result<bool, SyncError> {
        if self.sink.has_key(&entity.key) {
            return Ok(false);
        }
        self.add_entity(entity).await?;
        Ok(true)
    }

    async fn add_relationship_once(&mut self, relationship: Relationship) -> Result<bool, SyncError> {
        if self.sink.has_key(&relationship.key) {
            return Ok(false);
        }
        self.add_relationship(relationship).await?;
        Ok(true)
    }
}
