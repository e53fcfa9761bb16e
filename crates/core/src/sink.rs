//! 그래프 싱크 -- 동기화 결과를 기록하는 append-only 저장소 추상화
//!
//! 동기화 엔진은 [`GraphSink`]를 통해서만 엔티티와 관계를 기록합니다.
//! 같은 `_key`를 두 번 기록하면 [`SinkError::DuplicateKey`]로 거부됩니다.

use std::collections::{HashMap, HashSet};
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::SinkError;
use crate::graph::{Entity, Relationship};

/// 그래프 객체 기록 trait
///
/// 기록은 비동기(외부 저장소), 조회는 동기(이미 기록된 키 확인)입니다.
pub trait GraphSink: Send {
    /// 엔티티를 기록합니다.
    fn add_entity(&mut self, entity: Entity) -> impl Future<Output = Result<(), SinkError>> + Send;

    /// 관계를 기록합니다.
    fn add_relationship(
        &mut self,
        relationship: Relationship,
    ) -> impl Future<Output = Result<(), SinkError>> + Send;

    /// 이미 기록된 엔티티를 키로 조회합니다.
    fn find_entity(&self, key: &str) -> Option<&Entity>;

    /// 엔티티 또는 관계 키가 이미 기록되었는지 확인합니다.
    fn has_key(&self, key: &str) -> bool;
}

/// 메모리 기반 싱크
///
/// 기록 순서를 유지하며, 실행이 끝나면 [`GraphSnapshot`]으로 꺼낼 수 있습니다.
#[derive(Debug, Default)]
pub struct MemoryGraphSink {
    entities: Vec<Entity>,
    entity_index: HashMap<String, usize>,
    relationships: Vec<Relationship>,
    relationship_keys: HashSet<String>,
}

impl MemoryGraphSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// 지정한 `_type`의 엔티티만 반환합니다.
    pub fn entities_of_type<'a>(&'a self, entity_type: &'a str) -> impl Iterator<Item = &'a Entity> {
        self.entities
            .iter()
            .filter(move |e| e.entity_type == entity_type)
    }

    /// 지정한 `_type`의 관계만 반환합니다.
    pub fn relationships_of_type<'a>(
        &'a self,
        relationship_type: &'a str,
    ) -> impl Iterator<Item = &'a Relationship> {
        self.relationships
            .iter()
            .filter(move |r| r.relationship_type == relationship_type)
    }

    pub fn into_snapshot(self) -> GraphSnapshot {
        GraphSnapshot {
            entities: self.entities,
            relationships: self.relationships,
        }
    }
}

impl GraphSink for MemoryGraphSink {
    async fn add_entity(&mut self, entity: Entity) -> Result<(), SinkError> {
        if self.has_key(&entity.key) {
            return Err(SinkError::DuplicateKey { key: entity.key });
        }
        self.entity_index
            .insert(entity.key.clone(), self.entities.len());
        self.entities.push(entity);
        Ok(())
    }

    async fn add_relationship(&mut self, relationship: Relationship) -> Result<(), SinkError> {
        if self.has_key(&relationship.key) {
            return Err(SinkError::DuplicateKey {
                key: relationship.key,
            });
        }
        self.relationship_keys.insert(relationship.key.clone());
        self.relationships.push(relationship);
        Ok(())
    }

    fn find_entity(&self, key: &str) -> Option<&Entity> {
        self.entity_index
            .get(key)
            .and_then(|&idx| self.entities.get(idx))
    }

    fn has_key(&self, key: &str) -> bool {
        self.entity_index.contains_key(key) || self.relationship_keys.contains(key)
    }
}

/// 직렬화 가능한 그래프 스냅샷
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
}
