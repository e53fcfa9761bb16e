//! 식별자 인덱스 -- export 캐시와 복합 키 조회
//!
//! 세 데이터셋(스캔 상세, asset export, 취약점 export)은 서로 다른 키로 연결됩니다.
//!
//! ```text
//! ScanHost.uuid ──▶ AssetExportCache (asset natural key)
//!                        │
//!                        ▼ asset.id
//! (asset_uuid, plugin_id) ──▶ VulnerabilityExportCache
//! ```
//!
//! 조회 실패는 정상 상황이며 `None`으로 표현됩니다.
//! 같은 키가 두 번 들어오면 나중 레코드가 이기고 중복 수가 기록됩니다.

use std::collections::HashMap;

use scangraph_tenable::{AssetExport, ScanHost, VulnerabilityExport};

/// asset export 캐시
///
/// 삽입 순서를 유지하여 asset 엔티티를 결정적인 순서로 내보낼 수 있습니다.
#[derive(Debug, Default)]
pub struct AssetExportCache {
    assets: Vec<AssetExport>,
    /// natural key → `assets` 위치
    index: HashMap<String, usize>,
    duplicate_keys: usize,
}

impl AssetExportCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 레코드를 추가합니다. 같은 키가 있으면 교체하고 `true`를 반환합니다.
    pub fn insert(&mut self, asset: AssetExport) -> bool {
        let key = asset.natural_key().to_owned();
        match self.index.get(&key) {
            Some(&pos) => {
                self.assets[pos] = asset;
                self.duplicate_keys += 1;
                true
            }
            None => {
                self.index.insert(key, self.assets.len());
                self.assets.push(asset);
                false
            }
        }
    }

    pub fn find_asset_by_uuid(&self, uuid: &str) -> Option<&AssetExport> {
        self.index.get(uuid).map(|&pos| &self.assets[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetExport> {
        self.assets.iter()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// 교체된(중복) 레코드 수
    pub fn duplicate_keys(&self) -> usize {
        self.duplicate_keys
    }
}

impl FromIterator<AssetExport> for AssetExportCache {
    fn from_iter<I: IntoIterator<Item = AssetExport>>(iter: I) -> Self {
        let mut cache = Self::new();
        for asset in iter {
            cache.insert(asset);
        }
        cache
    }
}

/// 취약점 export 캐시 -- `(asset.uuid, plugin.id)` 복합 키
#[derive(Debug, Default)]
pub struct VulnerabilityExportCache {
    by_asset: HashMap<String, HashMap<u64, VulnerabilityExport>>,
    len: usize,
    duplicate_keys: usize,
}

impl VulnerabilityExportCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 레코드를 추가합니다. 같은 키가 있으면 교체하고 `true`를 반환합니다.
    pub fn insert(&mut self, vulnerability: VulnerabilityExport) -> bool {
        let plugins = self
            .by_asset
            .entry(vulnerability.asset.uuid.clone())
            .or_default();
        match plugins.insert(vulnerability.plugin.id, vulnerability) {
            Some(_) => {
                self.duplicate_keys += 1;
                true
            }
            None => {
                self.len += 1;
                false
            }
        }
    }

    pub fn find_vulnerability_by_asset_and_plugin(
        &self,
        asset_uuid: &str,
        plugin_id: u64,
    ) -> Option<&VulnerabilityExport> {
        self.by_asset.get(asset_uuid)?.get(&plugin_id)
    }

    /// 캐시에 레코드가 있는 asset 수
    pub fn asset_count(&self) -> usize {
        self.by_asset.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn duplicate_keys(&self) -> usize {
        self.duplicate_keys
    }

    pub fn iter(&self) -> impl Iterator<Item = &VulnerabilityExport> {
        self.by_asset.values().flat_map(HashMap::values)
    }
}

impl FromIterator<VulnerabilityExport> for VulnerabilityExportCache {
    fn from_iter<I: IntoIterator<Item = VulnerabilityExport>>(iter: I) -> Self {
        let mut cache = Self::new();
        for vulnerability in iter {
            cache.insert(vulnerability);
        }
        cache
    }
}

/// asset 식별자의 출처
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    /// asset export 레코드의 `id`
    AssetExport,
    /// asset export에 없어 스캔 호스트의 `uuid`를 그대로 사용
    ScanHostUuid,
    /// 호스트에 uuid가 없어 `host-{host_id}`로 대체
    HostId,
}

/// 스캔 호스트를 정규화한 asset 식별자
#[derive(Debug, Clone)]
pub struct AssetIdentity<'a> {
    pub asset_uuid: String,
    pub source: IdentitySource,
    /// asset export 적중 시 레코드
    pub asset: Option<&'a AssetExport>,
}

/// 한 실행 동안 읽기 전용으로 공유되는 export 인덱스
#[derive(Debug, Default)]
pub struct ExportIndex {
    assets: AssetExportCache,
    vulnerabilities: VulnerabilityExportCache,
}

impl ExportIndex {
    pub fn new(assets: AssetExportCache, vulnerabilities: VulnerabilityExportCache) -> Self {
        Self {
            assets,
            vulnerabilities,
        }
    }

    pub fn find_asset_by_uuid(&self, uuid: &str) -> Option<&AssetExport> {
        self.assets.find_asset_by_uuid(uuid)
    }

    pub fn find_vulnerability_by_asset_and_plugin(
        &self,
        asset_uuid: &str,
        plugin_id: u64,
    ) -> Option<&VulnerabilityExport> {
        self.vulnerabilities
            .find_vulnerability_by_asset_and_plugin(asset_uuid, plugin_id)
    }

    /// 스캔 호스트의 asset 식별자를 결정합니다.
    ///
    /// 1. `host.uuid`로 asset export를 찾으면 그 레코드의 `id`
    /// 2. 못 찾으면 `host.uuid`
    /// 3. `host.uuid`가 없으면 `host-{host_id}`
    pub fn resolve_host<'a>(&'a self, host: &ScanHost) -> AssetIdentity<'a> {
        let Some(uuid) = host.uuid.as_deref().filter(|u| !u.is_empty()) else {
            return AssetIdentity {
                asset_uuid: format!("host-{}", host.host_id),
                source: IdentitySource::HostId,
                asset: None,
            };
        };

        match self.find_asset_by_uuid(uuid) {
            Some(asset) => AssetIdentity {
                asset_uuid: asset.id.clone(),
                source: IdentitySource::AssetExport,
                asset: Some(asset),
            },
            None => AssetIdentity {
                asset_uuid: uuid.to_owned(),
                source: IdentitySource::ScanHostUuid,
                asset: None,
            },
        }
    }

    pub fn assets(&self) -> &AssetExportCache {
        &self.assets
    }

    pub fn vulnerabilities(&self) -> &VulnerabilityExportCache {
        &self.vulnerabilities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{asset, scan_host, vuln_export};

    #[test]
    fn asset_lookup_hit_and_miss() {
        let cache: AssetExportCache = vec![asset("a1"), asset("a2")].into_iter().collect();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.find_asset_by_uuid("a2").map(|a| a.id.as_str()), Some("a2"));
        assert!(cache.find_asset_by_uuid("a3").is_none());
    }

    #[test]
    fn asset_duplicate_is_last_write_wins() {
        let mut first = asset("a1");
        first.hostnames = vec!["old".to_owned()];
        let mut second = asset("a1");
        second.hostnames = vec!["new".to_owned()];

        let mut cache = AssetExportCache::new();
        assert!(!cache.insert(first));
        assert!(cache.insert(second));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.duplicate_keys(), 1);
        assert_eq!(
            cache.find_asset_by_uuid("a1").unwrap().hostnames,
            vec!["new".to_owned()]
        );
    }

    #[test]
    fn asset_iteration_keeps_insertion_order() {
        let cache: AssetExportCache = ["c", "a", "b"].into_iter().map(asset).collect();
        let ids: Vec<_> = cache.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn vulnerability_composite_key_lookup() {
        let cache: VulnerabilityExportCache = vec![
            vuln_export("a1", 10386),
            vuln_export("a1", 19506),
            vuln_export("a2", 10386),
        ]
        .into_iter()
        .collect();

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.asset_count(), 2);
        assert!(cache.find_vulnerability_by_asset_and_plugin("a1", 19506).is_some());
        assert!(cache.find_vulnerability_by_asset_and_plugin("a2", 19506).is_none());
        assert!(cache.find_vulnerability_by_asset_and_plugin("zz", 10386).is_none());
    }

    #[test]
    fn vulnerability_duplicate_is_last_write_wins() {
        let mut first = vuln_export("a1", 10386);
        first.state = Some("open".to_owned());
        let mut second = vuln_export("a1", 10386);
        second.state = Some("fixed".to_owned());

        let cache: VulnerabilityExportCache = vec![first, second].into_iter().collect();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.duplicate_keys(), 1);
        assert_eq!(
            cache
                .find_vulnerability_by_asset_and_plugin("a1", 10386)
                .and_then(|v| v.state.as_deref()),
            Some("fixed")
        );
    }

    #[test]
    fn resolve_host_uses_asset_id_on_hit() {
        let mut record = asset("asset-id-1");
        record.uuid = Some("u1".to_owned());
        let index = ExportIndex::new(
            vec![record].into_iter().collect(),
            VulnerabilityExportCache::new(),
        );

        let identity = index.resolve_host(&scan_host(7, Some("u1")));
        assert_eq!(identity.asset_uuid, "asset-id-1");
        assert_eq!(identity.source, IdentitySource::AssetExport);
        assert!(identity.asset.is_some());
    }

    #[test]
    fn resolve_host_falls_back_to_host_uuid() {
        let index = ExportIndex::default();
        let identity = index.resolve_host(&scan_host(7, Some("u1")));
        assert_eq!(identity.asset_uuid, "u1");
        assert_eq!(identity.source, IdentitySource::ScanHostUuid);
        assert!(identity.asset.is_none());
    }

    #[test]
    fn resolve_host_without_uuid_uses_host_id() {
        let index = ExportIndex::default();
        let identity = index.resolve_host(&scan_host(7, None));
        assert_eq!(identity.asset_uuid, "host-7");
        assert_eq!(identity.source, IdentitySource::HostId);

        let identity = index.resolve_host(&scan_host(8, Some("")));
        assert_eq!(identity.asset_uuid, "host-8");
    }
}
