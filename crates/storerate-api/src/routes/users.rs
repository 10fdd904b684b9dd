//! Routes for user administration. Every endpoint is admin-only.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use storerate_core::model::{Role, UserFilter};
use tracing::{info, instrument};
use uuid::Uuid;

use storerate_users::application::command_handlers;
use storerate_users::application::query_handlers::{self, DashboardStats, UserView};
use storerate_users::domain::commands;

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery, non_empty};
use crate::routes::MessageResponse;
use crate::state::AppState;

/// Query string for GET /users.
#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    /// Case-insensitive substring of the name.
    pub name: Option<String>,
    /// Case-insensitive substring of the email.
    pub email: Option<String>,
    /// Case-insensitive substring of the address.
    pub address: Option<String>,
    /// Exact role.
    pub role: Option<String>,
}

impl UserQuery {
    fn into_filter(self) -> Result<UserFilter, ApiError> {
        let role = non_empty(self.role)
            .map(|raw| raw.parse::<Role>())
            .transpose()?;
        Ok(UserFilter {
            name: non_empty(self.name),
            email: non_empty(self.email),
            address: non_empty(self.address),
            role,
        })
    }
}

/// Request body for POST /users.
#[derive(Deserialize)]
pub struct CreateUserRequest {
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Login password.
    pub password: String,
    /// Postal address.
    pub address: String,
    /// Role; `user` when omitted.
    pub role: Option<Role>,
}

/// Request body for PUT /users/{id}. Omitted fields keep their value.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    /// New display name.
    pub name: Option<String>,
    /// New login email.
    pub email: Option<String>,
    /// New postal address.
    pub address: Option<String>,
    /// New role.
    pub role: Option<Role>,
}

/// GET /users
#[instrument(skip(state, principal, query), fields(requester_id = %principal.user_id))]
async fn list_users(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> Result<Json<Vec<UserView>>, ApiError> {
    let filter = query.into_filter()?;
    let users = query_handlers::list_users(&filter, &principal, &*state.entities).await?;
    Ok(Json(users))
}

/// POST /users
#[instrument(skip(state, principal, request), fields(requester_id = %principal.user_id))]
async fn create_user(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserView>), ApiError> {
    let command = commands::CreateUser {
        correlation_id: Uuid::new_v4(),
        requester: principal,
        name: request.name,
        email: request.email,
        password: request.password,
        address: request.address,
        role: request.role,
    };

    info!(correlation_id = %command.correlation_id, "handling create_user command");

    let created = command_handlers::handle_create_user(
        &command,
        state.clock.as_ref(),
        state.credentials.as_ref(),
        &*state.entities,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(UserView::from(&created))))
}

/// GET /users/dashboard/stats
#[instrument(skip(state, principal), fields(requester_id = %principal.user_id))]
async fn dashboard_stats(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<Json<DashboardStats>, ApiError> {
    let stats = query_handlers::dashboard_stats(&principal, &*state.entities).await?;
    Ok(Json(stats))
}

/// GET /users/{id}
#[instrument(skip(state, principal), fields(requester_id = %principal.user_id))]
async fn get_user(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<UserView>, ApiError> {
    let user = query_handlers::get_user(user_id, &principal, &*state.entities).await?;
    Ok(Json(user))
}

/// PUT /users/{id}
#[instrument(skip(state, principal, request), fields(requester_id = %principal.user_id))]
async fn update_user(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserView>, ApiError> {
    let command = commands::UpdateUser {
        correlation_id: Uuid::new_v4(),
        requester: principal,
        user_id,
        name: request.name,
        email: request.email,
        address: request.address,
        role: request.role,
    };

    info!(correlation_id = %command.correlation_id, "handling update_user command");

    let updated = command_handlers::handle_update_user(&command, &*state.entities).await?;

    Ok(Json(UserView::from(&updated)))
}

/// DELETE /users/{id}
#[instrument(skip(state, principal), fields(requester_id = %principal.user_id))]
async fn delete_user(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let command = commands::DeleteUser {
        correlation_id: Uuid::new_v4(),
        requester: principal,
        user_id,
    };

    info!(correlation_id = %command.correlation_id, "handling delete_user command");

    command_handlers::handle_delete_user(&command, &*state.entities).await?;

    Ok(Json(MessageResponse::new("user removed")))
}

/// Returns the router for user administration endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/dashboard/stats", get(dashboard_stats))
        .route(
            "/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
}
