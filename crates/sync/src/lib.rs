//! # scangraph-sync
//!
//! 스캔 데이터를 그래프 엔티티/관계로 변환하는 동기화 엔진입니다.
//!
//! # Module Structure
//!
//! - [`export`]: bulk export 구동과 캐시 생성 (`ExportCacheBuilder`)
//! - [`index`]: asset / (asset, plugin) 복합 키 조회 (`ExportIndex`)
//! - [`converters`]: API 레코드 → 그래프 객체 변환
//! - [`synchronizer`]: 실행 단위 오케스트레이터 (`SyncEngine`, `SyncEngineBuilder`)
//! - [`validate`]: 자격 증명 검증
//! - [`error`]: 도메인 에러 (`SyncError`)
//!
//! # Architecture
//!
//! ```text
//! TenableApi ──▶ ExportCacheBuilder ──▶ ExportIndex (&, read-only)
//!     │                                     │
//!     └──────────────▶ SyncEngine ◀─────────┘
//!                          │
//!                     converters
//!                          │
//!                     GraphSink (&mut)
//! ```

pub mod converters;
pub mod error;
pub mod export;
pub mod index;
pub mod synchronizer;
pub mod validate;

#[cfg(test)]
pub(crate) mod mock;

// --- Public API Re-exports ---

// Orchestrator
pub use synchronizer::{SyncEngine, SyncEngineBuilder, SyncOptions, SyncSummary};

// Export caches
pub use export::{ExportCache, ExportCacheBuilder, ExportKind, ExportRequest};

// Index
pub use index::{AssetExportCache, AssetIdentity, ExportIndex, IdentitySource, VulnerabilityExportCache};

// Error
pub use error::SyncError;

// Validation
pub use validate::validate_invocation;
