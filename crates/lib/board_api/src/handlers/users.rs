//! User management handlers. Administrators only.

use axum::extract::State;
use axum::response::Response;
use board_core::models::user::{USER_CREATE_RULES, USER_UPDATE_RULES, UserInput, UserView};
use board_core::store;
use serde_json::{Value, json};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AdminUser;
use crate::middleware::object::UserPath;
use crate::rest::{self, Created, RestJson};

/// `GET /users`
pub async fn list_users(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
) -> AppResult<RestJson<Vec<UserView>>> {
    let rows = store::users::list_all(&state.pool).await?;
    Ok(RestJson(rows.iter().map(UserView::from).collect()))
}

/// `POST /users`
pub async fn create_user(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
    RestJson(input): RestJson<UserInput>,
) -> AppResult<Created<Value>> {
    let new = input.into_new(USER_CREATE_RULES)?;
    store::users::create(&state.pool, &new).await?;
    Ok(Created(json!({ "ok": true })))
}

/// `GET /users/{id}`
pub async fn get_user(AdminUser(_): AdminUser, UserPath(user): UserPath) -> RestJson<UserView> {
    RestJson(UserView::from(&user))
}

/// `PUT /users/{id}`
pub async fn update_user(
    AdminUser(_): AdminUser,
    UserPath(user): UserPath,
    State(state): State<AppState>,
    RestJson(input): RestJson<UserInput>,
) -> AppResult<RestJson<Value>> {
    let new = input.merge(&user).into_new(USER_UPDATE_RULES)?;
    store::users::update(&state.pool, &user, &new).await?;
    Ok(rest::ok())
}

/// `DELETE /users/{id}`: administrators cannot delete themselves.
pub async fn delete_user(
    AdminUser(admin): AdminUser,
    UserPath(user): UserPath,
    State(state): State<AppState>,
) -> AppResult<Response> {
    if admin.id == user.id {
        return Err(AppError::SelfDeletion);
    }
    store::users::delete(&state.pool, user.id).await?;
    Ok(rest::no_content())
}
