//! scangraph 공통 크레이트
//!
//! 모든 scangraph 크레이트가 공유하는 에러 타입, 설정, 그래프 모델,
//! 그래프 싱크 trait, 메트릭 이름을 정의합니다.

pub mod config;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod sink;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ApiError, ConfigError, ScangraphError, SinkError, SyncRunError};

// 설정
pub use config::ScangraphConfig;

// 그래프
pub use graph::{
    Entity, MappingDirection, RawDataEntry, Relationship, RelationshipMapping, TargetEntity,
    generate_entity_key,
};
pub use sink::{GraphSink, GraphSnapshot, MemoryGraphSink};
