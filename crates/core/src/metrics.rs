//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()` 매크로를 호출합니다.
//! exporter 설치는 바이너리의 몫이며, 설치되지 않으면 기록은 무시됩니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `scangraph_`
//! - 모듈명: `api_`, `export_`, `sync_`
//! - 접미어: `_total` (counter)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(scangraph_core::metrics::SYNC_FINDINGS_EMITTED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// export 종류 레이블 키 (assets, vulnerabilities)
pub const LABEL_EXPORT_KIND: &str = "kind";

/// 재시도 사유 레이블 키 (rate_limited, transient_server)
pub const LABEL_REASON: &str = "reason";

// ─── API 클라이언트 메트릭 ─────────────────────────────────────────

/// API: 전송된 요청 수 (counter)
pub const API_REQUESTS_TOTAL: &str = "scangraph_api_requests_total";

/// API: 재시도 횟수 (counter, label: reason)
pub const API_RETRIES_TOTAL: &str = "scangraph_api_retries_total";

// ─── Export 메트릭 ─────────────────────────────────────────────────

/// Export: 상태 폴링 횟수 (counter, label: kind)
pub const EXPORT_POLLS_TOTAL: &str = "scangraph_export_polls_total";

/// Export: 가져온 chunk 수 (counter, label: kind)
pub const EXPORT_CHUNKS_FETCHED_TOTAL: &str = "scangraph_export_chunks_fetched_total";

// ─── 동기화 메트릭 ─────────────────────────────────────────────────

/// Sync: 생성된 finding 수 (counter)
pub const SYNC_FINDINGS_EMITTED_TOTAL: &str = "scangraph_sync_findings_emitted_total";

/// Sync: 건너뛴 스캔 수 (counter, label: reason)
pub const SYNC_SCANS_SKIPPED_TOTAL: &str = "scangraph_sync_scans_skipped_total";

/// Sync: 취약점 export 캐시 미스 수 (counter)
pub const SYNC_EXPORT_CACHE_MISSES_TOTAL: &str = "scangraph_sync_export_cache_misses_total";

/// 모든 메트릭 설명을 등록합니다.
///
/// recorder 설치 직후 한 번 호출합니다.
pub fn describe_all() {
    use metrics::describe_counter;

    describe_counter!(API_REQUESTS_TOTAL, "Total number of API requests sent");
    describe_counter!(
        API_RETRIES_TOTAL,
        "Total number of API request retries (rate limited or transient server errors)"
    );
    describe_counter!(EXPORT_POLLS_TOTAL, "Total number of export status polls");
    describe_counter!(
        EXPORT_CHUNKS_FETCHED_TOTAL,
        "Total number of export chunks downloaded and indexed"
    );
    describe_counter!(
        SYNC_FINDINGS_EMITTED_TOTAL,
        "Total number of vulnerability finding entities emitted"
    );
    describe_counter!(
        SYNC_SCANS_SKIPPED_TOTAL,
        "Total number of scans skipped (not completed, forbidden, archived)"
    );
    describe_counter!(
        SYNC_EXPORT_CACHE_MISSES_TOTAL,
        "Host vulnerabilities without a matching vulnerability export record"
    );
}
