use axum::{
    extract::State,
    routing::{delete, get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    accounts::{
        dto::{
            ApproveRequest, ApproveResponse, DeleteRequest, DeleteResponse, LoginRequest,
            SignupRequest, SignupResponse, UsersResponse,
        },
        extractors::CurrentUser,
        groups::{AccessGroup, AccessGroups},
        password::{hash_password, verify_password},
        repo_types::{NewUser, User, ANONYMOUS_LOGIN},
    },
    error::ApiError,
    state::AppState,
    store::UserStore,
};

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/user", get(list_users))
        .route("/login", post(login))
        .route("/currentuser", get(current_user))
        .route("/logout", get(logout))
        .route("/deleteuser", delete(delete_user))
        .route("/signup", post(signup))
        .route("/approveuser", post(approve_user).get(list_approved))
        .route("/notyetapprovedusers", get(list_pending))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    let config = &state.config;
    Cookie::build((config.session.cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::seconds(state.sessions.idle_ttl().as_secs() as i64))
        .same_site(if config.production {
            SameSite::None
        } else {
            SameSite::Lax
        })
        .secure(config.production)
        .build()
}

/// The sentinel returned whenever no authenticated identity resolves.
/// It is seeded at startup, so its absence is a deployment fault.
async fn anonymous(store: &dyn UserStore) -> Result<User, ApiError> {
    store
        .find_by_login(ANONYMOUS_LOGIN)
        .await?
        .ok_or_else(|| ApiError::Store(anyhow::anyhow!("anonymous sentinel user is missing")))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.store.list().await?))
}

#[instrument(skip(state, jar, payload))]
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<SignupRequest>,
) -> Result<(CookieJar, Json<SignupResponse>), ApiError> {
    let form = payload.user;
    let login = form.login.trim();
    let first_name = form.first_name.trim();
    let last_name = form.last_name.trim();
    let email = form.email.trim();

    if login.is_empty() || form.password1.trim().is_empty() {
        warn!("signup with empty login or password");
        return Err(ApiError::Validation("login and password are required".into()));
    }
    if form.password1 != form.password2 {
        warn!("signup with mismatched passwords");
        return Err(ApiError::Validation("passwords do not match".into()));
    }
    if first_name.is_empty() || last_name.is_empty() || email.is_empty() {
        warn!("signup with empty name or email");
        return Err(ApiError::Validation("all fields are required".into()));
    }
    if !is_valid_email(email) {
        warn!(email = %email, "signup with invalid email");
        return Err(ApiError::Validation("invalid email".into()));
    }

    if state.store.find_by_login(login).await?.is_some() {
        warn!(login = %login, "signup with taken login");
        return Err(ApiError::Conflict("login already taken".into()));
    }

    let hash = hash_password(&form.password1)?;
    let user = state
        .store
        .create(NewUser {
            first_name: first_name.into(),
            last_name: last_name.into(),
            login: login.into(),
            email: email.into(),
            hash,
            access_groups: AccessGroups::signup_default(),
        })
        .await?;

    // Bind the session to the created document, not the request form.
    let token = state.sessions.bind(user.clone());
    let jar = jar.add(session_cookie(&state, token));

    info!(user_id = %user.id, login = %user.login, "user signed up");
    Ok((jar, Json(SignupResponse { user_added: user })))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<User>), ApiError> {
    let user = match state.store.find_by_login(&payload.login).await? {
        Some(user) => user,
        None => {
            // Unknown logins degrade to the sentinel; no session is bound.
            warn!(login = %payload.login, "login with unknown login");
            return Ok((jar, Json(anonymous(&*state.store).await?)));
        }
    };

    if !verify_password(&payload.password, &user.hash) {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(ApiError::Forbidden);
    }

    let token = state.sessions.bind(user.clone());
    let jar = jar.add(session_cookie(&state, token));

    info!(user_id = %user.id, login = %user.login, "user logged in");
    Ok((jar, Json(user)))
}

#[instrument(skip(state, jar))]
pub async fn current_user(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<User>), ApiError> {
    let token = jar
        .get(&state.config.session.cookie_name)
        .map(|cookie| cookie.value().to_string());
    let user = token
        .as_deref()
        .and_then(|token| state.sessions.resolve(token));
    match (user, token) {
        (Some(user), Some(token)) => {
            // The server-side idle timer slid on resolve; re-issue the
            // cookie so the client-side Max-Age slides with it.
            let jar = jar.add(session_cookie(&state, token));
            Ok((jar, Json(user)))
        }
        _ => Ok((jar, Json(anonymous(&*state.store).await?))),
    }
}

#[instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<User>), ApiError> {
    let name = state.config.session.cookie_name.clone();
    if let Some(cookie) = jar.get(&name) {
        state.sessions.destroy(cookie.value());
    }
    let jar = jar.remove(Cookie::build(name).path("/").build());
    Ok((jar, Json(anonymous(&*state.store).await?)))
}

#[instrument(skip(state, payload))]
pub async fn delete_user(
    State(state): State<AppState>,
    Json(payload): Json<DeleteRequest>,
) -> Result<Json<DeleteResponse>, ApiError> {
    // A session bound to the deleted user keeps serving its snapshot
    // until it idles out; the store is the source of truth.
    let user = state.store.delete(payload.id).await?;
    if let Some(user) = &user {
        info!(user_id = %user.id, login = %user.login, "user deleted");
    }
    Ok(Json(DeleteResponse { user }))
}

#[instrument(skip(state, actor, payload))]
pub async fn approve_user(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(payload): Json<ApproveRequest>,
) -> Result<Json<ApproveResponse>, ApiError> {
    let actor = match actor {
        Some(actor) => actor,
        None => {
            warn!("approve attempt without a session");
            return Err(ApiError::Forbidden);
        }
    };
    if !actor.is_in_group(AccessGroup::Admins) {
        warn!(actor_id = %actor.id, "approve attempt by non-admin");
        return Err(ApiError::Forbidden);
    }

    let result = state
        .store
        .set_groups(payload.id, AccessGroups::approved())
        .await?;
    if let Some(user) = &result {
        info!(actor_id = %actor.id, user_id = %user.id, "user approved");
    }
    Ok(Json(ApproveResponse { result }))
}

#[instrument(skip(state))]
pub async fn list_approved(State(state): State<AppState>) -> Result<Json<UsersResponse>, ApiError> {
    let users = state.store.list_in_group(AccessGroup::Members).await?;
    Ok(Json(UsersResponse { users }))
}

#[instrument(skip(state))]
pub async fn list_pending(State(state): State<AppState>) -> Result<Json<UsersResponse>, ApiError> {
    let users = state
        .store
        .list_in_group(AccessGroup::NotYetApprovedUsers)
        .await?;
    Ok(Json(UsersResponse { users }))
}
