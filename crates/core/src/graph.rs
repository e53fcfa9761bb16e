//! 그래프 모델 -- 엔티티, 관계, 결정적 키 생성
//!
//! 모든 그래프 객체는 `_key`, `_type`, `_class`와 원본 데이터 목록(`_rawData`)을 가지며,
//! 나머지 속성은 평탄화된 JSON 맵으로 직렬화됩니다.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 원본 데이터 한 건 (출처 추적용)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDataEntry {
    /// 원본 이름 (`default`, `vulnerability-export` 등)
    pub name: String,
    /// 원본 JSON
    #[serde(rename = "rawData")]
    pub raw_data: Value,
}

/// 그래프 엔티티
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(rename = "_type")]
    pub entity_type: String,
    #[serde(rename = "_class")]
    pub class: Vec<String>,
    #[serde(rename = "_rawData", default, skip_serializing_if = "Vec::is_empty")]
    pub raw_data: Vec<RawDataEntry>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl Entity {
    pub fn new(key: impl Into<String>, entity_type: &str, class: &[&str]) -> Self {
        Self {
            key: key.into(),
            entity_type: entity_type.to_owned(),
            class: class.iter().map(|c| (*c).to_owned()).collect(),
            raw_data: Vec::new(),
            properties: Map::new(),
        }
    }

    /// 속성을 추가합니다. `null` 값은 기록하지 않습니다.
    pub fn with_property(mut self, name: &str, value: impl Into<Value>) -> Self {
        set_property(&mut self.properties, name, value.into());
        self
    }

    /// 원본 데이터를 추가합니다. 직렬화할 수 없는 값은 건너뜁니다.
    pub fn with_raw_data(mut self, name: &str, data: &impl Serialize) -> Self {
        push_raw_data(&mut self.raw_data, name, data);
        self
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

/// 그래프 관계 (방향성 있음)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(rename = "_type")]
    pub relationship_type: String,
    #[serde(rename = "_class")]
    pub class: String,
    #[serde(rename = "_fromEntityKey")]
    pub from_key: String,
    #[serde(rename = "_toEntityKey")]
    pub to_key: String,
    #[serde(rename = "_rawData", default, skip_serializing_if = "Vec::is_empty")]
    pub raw_data: Vec<RawDataEntry>,
    /// 싱크 밖의 엔티티를 가리키는 관계일 때만 존재합니다.
    #[serde(rename = "_mapping", default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<RelationshipMapping>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl Relationship {
    /// 두 엔티티 키 사이의 관계를 생성합니다. `_key`는 양 끝 키와 class에서 결정됩니다.
    pub fn new(
        relationship_type: &str,
        class: &str,
        from_key: impl Into<String>,
        to_key: impl Into<String>,
    ) -> Self {
        let from_key = from_key.into();
        let to_key = to_key.into();
        Self {
            key: generate_relationship_key(&from_key, class, &to_key),
            relationship_type: relationship_type.to_owned(),
            class: class.to_owned(),
            from_key,
            to_key,
            raw_data: Vec::new(),
            mapping: None,
            properties: Map::new(),
        }
    }

    /// 다른 통합이 소유한 엔티티로 향하는 매핑 관계를 생성합니다.
    ///
    /// `_toEntityKey`는 대상의 필터 값에서 결정되며, 대상은 싱크에 기록되지 않습니다.
    pub fn mapped(
        relationship_type: &str,
        class: &str,
        source_key: impl Into<String>,
        target: TargetEntity,
    ) -> Self {
        let source_key = source_key.into();
        let mut relationship =
            Self::new(relationship_type, class, source_key.clone(), target.key());
        relationship.mapping = Some(RelationshipMapping {
            relationship_direction: MappingDirection::Forward,
            source_entity_key: source_key,
            target_filter_keys: vec![vec!["_type".to_owned(), target.filter_key.clone()]],
            skip_target_creation: target.skip_creation,
            target_entity: target.into_properties(),
        });
        relationship
    }

    pub fn is_mapped(&self) -> bool {
        self.mapping.is_some()
    }

    pub fn with_property(mut self, name: &str, value: impl Into<Value>) -> Self {
        set_property(&mut self.properties, name, value.into());
        self
    }

    pub fn with_raw_data(mut self, name: &str, data: &impl Serialize) -> Self {
        push_raw_data(&mut self.raw_data, name, data);
        self
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MappingDirection {
    Forward,
    Reverse,
}

/// 매핑 관계의 대상 지정 (`_mapping`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipMapping {
    pub relationship_direction: MappingDirection,
    pub source_entity_key: String,
    /// 대상 엔티티를 찾을 때 일치시킬 속성 이름 묶음
    pub target_filter_keys: Vec<Vec<String>>,
    pub target_entity: Map<String, Value>,
    pub skip_target_creation: bool,
}

/// 매핑 관계의 대상 엔티티
///
/// `_type`과 필터 속성 하나로 식별됩니다. 필터가 `_key`이면 값이 그대로 대상 키가 됩니다.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetEntity {
    entity_type: String,
    class: String,
    filter_key: String,
    filter_value: String,
    skip_creation: bool,
    properties: Map<String, Value>,
}

impl TargetEntity {
    pub fn new(
        entity_type: &str,
        class: &str,
        filter_key: &str,
        filter_value: impl Into<String>,
    ) -> Self {
        Self {
            entity_type: entity_type.to_owned(),
            class: class.to_owned(),
            filter_key: filter_key.to_owned(),
            filter_value: filter_value.into(),
            skip_creation: false,
            properties: Map::new(),
        }
    }

    /// 대상이 없을 때 새로 만들지 않도록 합니다.
    pub fn skip_creation(mut self, skip: bool) -> Self {
        self.skip_creation = skip;
        self
    }

    pub fn with_property(mut self, name: &str, value: impl Into<Value>) -> Self {
        set_property(&mut self.properties, name, value.into());
        self
    }

    pub fn key(&self) -> String {
        if self.filter_key == "_key" {
            self.filter_value.clone()
        } else {
            generate_entity_key(&self.entity_type, &self.filter_value)
        }
    }

    fn into_properties(self) -> Map<String, Value> {
        let mut properties = self.properties;
        properties.insert("_type".to_owned(), Value::String(self.entity_type));
        properties.insert("_class".to_owned(), Value::String(self.class));
        properties.insert(self.filter_key, Value::String(self.filter_value));
        properties
    }
}

/// `{type}_{id}` 형식의 엔티티 키를 생성합니다.
pub fn generate_entity_key(entity_type: &str, id: impl std::fmt::Display) -> String {
    format!("{entity_type}_{id}")
}

/// `{from}|{class 소문자}|{to}` 형식의 관계 키를 생성합니다.
pub fn generate_relationship_key(from_key: &str, class: &str, to_key: &str) -> String {
    format!("{from_key}|{}|{to_key}", class.to_ascii_lowercase())
}

fn set_property(properties: &mut Map<String, Value>, name: &str, value: Value) {
    if !value.is_null() {
        properties.insert(name.to_owned(), value);
    }
}

fn push_raw_data(raw: &mut Vec<RawDataEntry>, name: &str, data: &impl Serialize) {
    match serde_json::to_value(data) {
        Ok(raw_data) => raw.push(RawDataEntry {
            name: name.to_owned(),
            raw_data,
        }),
        Err(e) => tracing::debug!(name, error = %e, "raw data not serializable, skipping"),
    }
}
