use std::collections::HashMap;
use std::sync::RwLock;

use axum::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::accounts::groups::{AccessGroup, AccessGroups};
use crate::accounts::repo_types::{NewUser, User};

/// Document-store interface the account service runs against. The real
/// deployment uses Postgres; tests run against the in-memory variant.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<User>>;
    async fn find_by_login(&self, login: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn create(&self, new_user: NewUser) -> anyhow::Result<User>;
    /// Replace a user's access groups; returns the updated document,
    /// or `None` when the id does not exist.
    async fn set_groups(&self, id: Uuid, groups: AccessGroups) -> anyhow::Result<Option<User>>;
    /// Delete by id; returns the removed document, or `None` when the
    /// id does not exist.
    async fn delete(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    /// All users belonging to `group` (exact token membership).
    async fn list_in_group(&self, group: AccessGroup) -> anyhow::Result<Vec<User>>;
}

const USER_COLUMNS: &str =
    "id, first_name, last_name, login, email, hash, access_groups, created_at, updated_at";

/// Postgres-backed store. Ids and timestamps are generated by the
/// database; `login` carries a unique index so a concurrent duplicate
/// signup fails instead of creating a second record.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at"
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    async fn find_by_login(&self, login: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE login = $1"
        ))
        .bind(login)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (first_name, last_name, login, email, hash, access_groups)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.login)
        .bind(&new_user.email)
        .bind(&new_user.hash)
        .bind(new_user.access_groups.to_string())
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn set_groups(&self, id: Uuid, groups: AccessGroups) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET access_groups = $2, updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(groups.to_string())
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "DELETE FROM users WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn list_in_group(&self, group: AccessGroup) -> anyhow::Result<Vec<User>> {
        // Same token-exact semantics as AccessGroups::contains, pushed
        // down into SQL: split on commas, trim, compare whole tokens.
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE EXISTS (
                SELECT 1 FROM unnest(string_to_array(access_groups, ',')) AS g
                WHERE btrim(g) = $1
            )
            ORDER BY created_at
            "#
        ))
        .bind(group.as_str())
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }
}

/// In-memory store with the same contract; used by tests and by
/// `AppState::fake()`.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let users = self.users.read().expect("user lock poisoned");
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by_key(|u| u.created_at);
        Ok(all)
    }

    async fn find_by_login(&self, login: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.read().expect("user lock poisoned");
        Ok(users.values().find(|u| u.login == login).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let users = self.users.read().expect("user lock poisoned");
        Ok(users.get(&id).cloned())
    }

    async fn create(&self, new_user: NewUser) -> anyhow::Result<User> {
        let mut users = self.users.write().expect("user lock poisoned");
        if users.values().any(|u| u.login == new_user.login) {
            anyhow::bail!("login already taken: {:?}", new_user.login);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            login: new_user.login,
            email: new_user.email,
            hash: new_user.hash,
            access_groups: new_user.access_groups,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn set_groups(&self, id: Uuid, groups: AccessGroups) -> anyhow::Result<Option<User>> {
        let mut users = self.users.write().expect("user lock poisoned");
        Ok(users.get_mut(&id).map(|user| {
            user.access_groups = groups;
            user.updated_at = OffsetDateTime::now_utc();
            user.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let mut users = self.users.write().expect("user lock poisoned");
        Ok(users.remove(&id))
    }

    async fn list_in_group(&self, group: AccessGroup) -> anyhow::Result<Vec<User>> {
        let users = self.users.read().expect("user lock poisoned");
        let mut matched: Vec<User> = users
            .values()
            .filter(|u| u.is_in_group(group))
            .cloned()
            .collect();
        matched.sort_by_key(|u| u.created_at);
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::repo_types::NewUser;

    fn new_user(login: &str, groups: AccessGroups) -> NewUser {
        NewUser {
            first_name: "F".into(),
            last_name: "L".into(),
            login: login.into(),
            email: format!("{login}@example.com"),
            hash: "$argon2id$fake".into(),
            access_groups: groups,
        }
    }

    #[tokio::test]
    async fn create_and_find() {
        let store = MemoryUserStore::new();
        let created = store
            .create(new_user("bob", AccessGroups::signup_default()))
            .await
            .unwrap();
        let by_login = store.find_by_login("bob").await.unwrap().unwrap();
        assert_eq!(by_login.id, created.id);
        let by_id = store.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.login, "bob");
    }

    #[tokio::test]
    async fn create_rejects_duplicate_login() {
        let store = MemoryUserStore::new();
        store
            .create(new_user("carol", AccessGroups::signup_default()))
            .await
            .unwrap();
        let err = store
            .create(new_user("carol", AccessGroups::signup_default()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already taken"));
    }

    #[tokio::test]
    async fn set_groups_returns_updated_doc() {
        let store = MemoryUserStore::new();
        let created = store
            .create(new_user("dave", AccessGroups::signup_default()))
            .await
            .unwrap();
        let updated = store
            .set_groups(created.id, AccessGroups::approved())
            .await
            .unwrap()
            .unwrap();
        assert!(updated.is_in_group(AccessGroup::Members));
        assert!(!updated.is_in_group(AccessGroup::NotYetApprovedUsers));
    }

    #[tokio::test]
    async fn set_groups_on_missing_id_is_none() {
        let store = MemoryUserStore::new();
        let result = store
            .set_groups(Uuid::new_v4(), AccessGroups::approved())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn delete_echoes_removed_doc() {
        let store = MemoryUserStore::new();
        let created = store
            .create(new_user("erin", AccessGroups::signup_default()))
            .await
            .unwrap();
        let removed = store.delete(created.id).await.unwrap().unwrap();
        assert_eq!(removed.login, "erin");
        assert!(store.delete(created.id).await.unwrap().is_none());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_in_group_matches_tokens() {
        let store = MemoryUserStore::new();
        store
            .create(new_user("pending", AccessGroups::signup_default()))
            .await
            .unwrap();
        store
            .create(new_user("member", AccessGroups::approved()))
            .await
            .unwrap();

        let members = store.list_in_group(AccessGroup::Members).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].login, "member");

        let pending = store
            .list_in_group(AccessGroup::NotYetApprovedUsers)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].login, "pending");
    }
}
