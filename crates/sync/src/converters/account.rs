//! 계정 엔티티와 계정 소유 관계
//!
//! 계정은 `/session` 응답에서 만들어지며 실행마다 하나입니다.
//! 사용자, asset, 컨테이너는 모두 계정에 `HAS`로 연결됩니다.

use scangraph_core::{Entity, Relationship, generate_entity_key};
use scangraph_tenable::{AssetExport, Container, SessionInfo, User};

use super::{asset_key, classes, container_key, entities, raw, relationships, user_key};

pub fn account_key(account_id: &str) -> String {
    generate_entity_key(entities::ACCOUNT, account_id)
}

/// 계정 식별자는 `container_uuid`, 없으면 세션 `id`입니다. 둘 다 없으면 `None`입니다.
pub fn create_account_entity(session: &SessionInfo) -> Option<Entity> {
    let account_id = session
        .container_uuid
        .clone()
        .filter(|uuid| !uuid.is_empty())
        .or_else(|| session.id.map(|id| id.to_string()))?;
    let name = session.username.as_deref().unwrap_or(&account_id);

    Some(
        Entity::new(account_key(&account_id), entities::ACCOUNT, &["Account"])
            .with_raw_data(raw::DEFAULT, session)
            .with_property("id", account_id.as_str())
            .with_property("name", name)
            .with_property("displayName", name)
            .with_property("username", session.username.as_deref())
            .with_property("containerUuid", session.container_uuid.as_deref())
            .with_property("permissions", session.permissions),
    )
}

pub fn create_account_user_relationship(account: &Entity, user: &User) -> Relationship {
    Relationship::new(
        relationships::ACCOUNT_HAS_USER,
        classes::HAS,
        account.key.as_str(),
        user_key(user.id),
    )
    .with_raw_data(raw::DEFAULT, user)
}

pub fn create_account_asset_relationship(account: &Entity, asset: &AssetExport) -> Relationship {
    Relationship::new(
        relationships::ACCOUNT_HAS_ASSET,
        classes::HAS,
        account.key.as_str(),
        asset_key(&asset.id),
    )
    .with_raw_data(raw::DEFAULT, asset)
}

pub fn create_account_container_relationship(
    account: &Entity,
    container: &Container,
) -> Relationship {
    Relationship::new(
        relationships::ACCOUNT_HAS_CONTAINER,
        classes::HAS,
        account.key.as_str(),
        container_key(&container.id),
    )
    .with_raw_data(raw::DEFAULT, container)
}
