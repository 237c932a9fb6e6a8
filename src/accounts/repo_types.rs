use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::accounts::groups::{AccessGroup, AccessGroups};

/// Login of the seeded sentinel returned whenever no identity is bound.
pub const ANONYMOUS_LOGIN: &str = "anonymousUser";

/// User record in the store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub login: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub hash: String, // argon2 hash, not exposed in JSON
    #[sqlx(try_from = "String")]
    pub access_groups: AccessGroups,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn is_in_group(&self, group: AccessGroup) -> bool {
        self.access_groups.contains(group)
    }

    pub fn is_anonymous(&self) -> bool {
        self.login == ANONYMOUS_LOGIN
    }
}

/// Fields the store needs to create a user; id and timestamps are the
/// store's responsibility.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub login: String,
    pub email: String,
    pub hash: String,
    pub access_groups: AccessGroups,
}
