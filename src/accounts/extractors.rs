use std::convert::Infallible;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;

use crate::accounts::repo_types::User;
use crate::state::AppState;

/// Identity bound to the request's session cookie, if any. Resolution
/// never rejects: an absent, expired or unknown session yields `None`
/// and the handler decides what that means.
pub struct CurrentUser(pub Option<User>);

impl CurrentUser {
    pub fn from_jar(state: &AppState, jar: &CookieJar) -> Self {
        let user = jar
            .get(&state.config.session.cookie_name)
            .and_then(|cookie| state.sessions.resolve(cookie.value()));
        Self(user)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(Self::from_jar(state, &jar))
    }
}
