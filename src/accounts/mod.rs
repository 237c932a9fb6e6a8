use axum::Router;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::info;

use crate::state::AppState;
use crate::store::UserStore;

mod dto;
pub(crate) mod extractors;
pub mod groups;
pub mod handlers;
pub mod password;
pub mod repo_types;
pub mod sessions;

use groups::{AccessGroup, AccessGroups};
use repo_types::{NewUser, ANONYMOUS_LOGIN};

pub fn router() -> Router<AppState> {
    handlers::account_routes()
}

/// Create the anonymous sentinel user if it does not exist yet. Its
/// password is random and discarded, so the sentinel cannot be logged
/// into.
pub async fn seed_anonymous(store: &dyn UserStore) -> anyhow::Result<()> {
    if store.find_by_login(ANONYMOUS_LOGIN).await?.is_some() {
        return Ok(());
    }
    let throwaway: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();
    let hash = password::hash_password(&throwaway)?;
    store
        .create(NewUser {
            first_name: "Anonymous".into(),
            last_name: "User".into(),
            login: ANONYMOUS_LOGIN.into(),
            email: "anonymous@localhost".into(),
            hash,
            access_groups: AccessGroups::new([AccessGroup::Anonymous]),
        })
        .await?;
    info!("seeded anonymous sentinel user");
    Ok(())
}
