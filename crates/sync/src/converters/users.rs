//! 사용자 엔티티와 스캔 소유 관계

use scangraph_core::{Entity, Relationship, generate_entity_key};
use scangraph_tenable::{ScanSummary, User};

use super::{classes, entities, epoch_seconds_to_millis, raw, relationships, scan_key};

pub fn user_key(user_id: u64) -> String {
    generate_entity_key(entities::USER, user_id)
}

pub fn create_user_entity(user: &User) -> Entity {
    Entity::new(user_key(user.id), entities::USER, &["User"])
        .with_raw_data(raw::DEFAULT, user)
        .with_property("id", user.id.to_string())
        .with_property("uuid", user.uuid.as_deref())
        .with_property("username", user.username.as_str())
        .with_property("name", user.name.as_deref().unwrap_or(&user.username))
        .with_property("displayName", user.username.as_str())
        .with_property("email", user.email.as_deref())
        .with_property("type", user.user_type.as_deref())
        .with_property("permissions", user.permissions)
        .with_property("active", user.enabled)
        .with_property("lastLogin", user.last_login)
        .with_property("lastLoginOn", epoch_seconds_to_millis(user.last_login))
}

/// 사용자 → 스캔 (`OWNS`), 스캔의 `owner`가 사용자 이름과 같을 때
pub fn create_user_scan_relationship(user: &User, scan: &ScanSummary) -> Relationship {
    Relationship::new(
        relationships::USER_OWNS_SCAN,
        classes::OWNS,
        user_key(user.id),
        scan_key(scan.id),
    )
    .with_raw_data(raw::DEFAULT, scan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{scan, user};
    use scangraph_tenable::ScanStatus;
    use serde_json::json;

    #[test]
    fn user_entity_fields() {
        let mut u = user(42, "alice@example.com");
        u.last_login = Some(1_600_000_000);
        let entity = create_user_entity(&u);
        assert_eq!(entity.key, "tenable_user_42");
        assert_eq!(entity.class, vec!["User"]);
        assert_eq!(entity.property("username"), Some(&json!("alice@example.com")));
        assert_eq!(entity.property("name"), Some(&json!("alice@example.com")));
        assert_eq!(entity.property("lastLoginOn"), Some(&json!(1_600_000_000_000i64)));
    }

    #[test]
    fn owns_relationship() {
        let rel = create_user_scan_relationship(
            &user(42, "alice@example.com"),
            &scan(17, ScanStatus::Completed),
        );
        assert_eq!(rel.key, "tenable_user_42|owns|tenable_scan_17");
        assert_eq!(rel.raw_data[0].raw_data["id"], 17);
    }
}
