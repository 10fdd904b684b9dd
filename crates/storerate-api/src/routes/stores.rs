//! Routes for the Store Lifecycle bounded context, including on-demand
//! aggregate repair.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use storerate_core::error::DomainError;
use storerate_core::model::StoreFilter;
use tracing::{info, instrument};
use uuid::Uuid;

use storerate_ratings::application::query_handlers::StoreRatingView;
use storerate_ratings::application::{
    command_handlers as rating_commands, query_handlers as rating_queries,
};
use storerate_ratings::domain::commands::RecomputeStoreAggregate;
use storerate_stores::application::query_handlers::{self, StoreView};
use storerate_stores::application::command_handlers;
use storerate_stores::domain::commands;

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery, non_empty, present};
use crate::routes::MessageResponse;
use crate::state::AppState;

/// Query string for GET /stores.
#[derive(Debug, Default, Deserialize)]
pub struct StoreQuery {
    /// Case-insensitive substring of the name.
    pub name: Option<String>,
    /// Case-insensitive substring of the address.
    pub address: Option<String>,
}

/// Request body for POST /stores.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStoreRequest {
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Postal address.
    pub address: String,
    /// The user who will own the store.
    pub owner_id: Uuid,
    /// Derived; rejected when present, even as `null`.
    #[serde(default, deserialize_with = "present")]
    pub average_rating: Option<serde_json::Value>,
    /// Derived; rejected when present, even as `null`.
    #[serde(default, deserialize_with = "present")]
    pub total_ratings: Option<serde_json::Value>,
}

/// Request body for PUT /stores/{id}. Omitted fields keep their value.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStoreRequest {
    /// New display name.
    pub name: Option<String>,
    /// New contact email.
    pub email: Option<String>,
    /// New postal address.
    pub address: Option<String>,
    /// Derived; rejected when present, even as `null`.
    #[serde(default, deserialize_with = "present")]
    pub average_rating: Option<serde_json::Value>,
    /// Derived; rejected when present, even as `null`.
    #[serde(default, deserialize_with = "present")]
    pub total_ratings: Option<serde_json::Value>,
}

/// A store's aggregate after a repair.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreAggregateResponse {
    /// The repaired store.
    pub store_id: Uuid,
    /// Mean of current ratings, one decimal.
    pub average_rating: f64,
    /// Number of current ratings.
    pub total_ratings: i64,
}

/// Result of the repair sweep.
#[derive(Debug, Serialize)]
pub struct RecomputeAllResponse {
    /// Number of stores recomputed.
    pub recomputed: usize,
}

fn reject_derived_fields(
    average_rating: Option<&serde_json::Value>,
    total_ratings: Option<&serde_json::Value>,
) -> Result<(), ApiError> {
    if average_rating.is_some() || total_ratings.is_some() {
        return Err(DomainError::InvalidInput(
            "averageRating and totalRatings are derived from ratings and cannot be set".to_owned(),
        )
        .into());
    }
    Ok(())
}

/// GET /stores
#[instrument(skip(state, query))]
async fn list_stores(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<StoreQuery>,
) -> Result<Json<Vec<StoreView>>, ApiError> {
    let filter = StoreFilter {
        name: non_empty(query.name),
        address: non_empty(query.address),
    };
    let stores = query_handlers::list_stores(&filter, &*state.entities).await?;
    Ok(Json(stores))
}

/// GET /stores/{id}
#[instrument(skip(state))]
async fn get_store(
    State(state): State<AppState>,
    ApiPath(store_id): ApiPath<Uuid>,
) -> Result<Json<StoreView>, ApiError> {
    let store = query_handlers::get_store(store_id, &*state.entities).await?;
    Ok(Json(store))
}

/// GET /stores/owner/{user_id}
#[instrument(skip(state, principal), fields(requester_id = %principal.user_id))]
async fn get_store_by_owner(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ApiPath(owner_id): ApiPath<Uuid>,
) -> Result<Json<StoreView>, ApiError> {
    let store = query_handlers::get_store_by_owner(owner_id, &principal, &*state.entities).await?;
    Ok(Json(store))
}

/// GET /stores/{id}/ratings
#[instrument(skip(state, principal), fields(requester_id = %principal.user_id))]
async fn list_store_ratings(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ApiPath(store_id): ApiPath<Uuid>,
) -> Result<Json<Vec<StoreRatingView>>, ApiError> {
    let ratings =
        rating_queries::list_store_ratings(store_id, &principal, &*state.entities).await?;
    Ok(Json(ratings))
}

/// POST /stores
#[instrument(
    skip(state, principal, request),
    fields(requester_id = %principal.user_id, owner_id = %request.owner_id)
)]
async fn create_store(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ApiJson(request): ApiJson<CreateStoreRequest>,
) -> Result<(StatusCode, Json<StoreView>), ApiError> {
    reject_derived_fields(request.average_rating.as_ref(), request.total_ratings.as_ref())?;
    let command = commands::CreateStore {
        correlation_id: Uuid::new_v4(),
        requester: principal,
        name: request.name,
        email: request.email,
        address: request.address,
        owner_id: request.owner_id,
    };

    info!(correlation_id = %command.correlation_id, "handling create_store command");

    let created =
        command_handlers::handle_create_store(&command, state.clock.as_ref(), &*state.entities)
            .await?;

    Ok((StatusCode::CREATED, Json(StoreView::from(&created))))
}

/// PUT /stores/{id}
#[instrument(skip(state, principal, request), fields(requester_id = %principal.user_id))]
async fn update_store(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ApiPath(store_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateStoreRequest>,
) -> Result<Json<StoreView>, ApiError> {
    reject_derived_fields(request.average_rating.as_ref(), request.total_ratings.as_ref())?;
    let command = commands::UpdateStore {
        correlation_id: Uuid::new_v4(),
        requester: principal,
        store_id,
        name: request.name,
        email: request.email,
        address: request.address,
    };

    info!(correlation_id = %command.correlation_id, "handling update_store command");

    let updated = command_handlers::handle_update_store(&command, &*state.entities).await?;

    Ok(Json(StoreView::from(&updated)))
}

/// DELETE /stores/{id}
#[instrument(skip(state, principal), fields(requester_id = %principal.user_id))]
async fn delete_store(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ApiPath(store_id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let command = commands::DeleteStore {
        correlation_id: Uuid::new_v4(),
        requester: principal,
        store_id,
    };

    info!(correlation_id = %command.correlation_id, "handling delete_store command");

    command_handlers::handle_delete_store(&command, &*state.entities).await?;

    Ok(Json(MessageResponse::new("store removed")))
}

/// POST /stores/{id}/recompute
#[instrument(skip(state, principal), fields(requester_id = %principal.user_id))]
async fn recompute_store_aggregate(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ApiPath(store_id): ApiPath<Uuid>,
) -> Result<Json<StoreAggregateResponse>, ApiError> {
    principal.require_admin()?;
    let command = RecomputeStoreAggregate {
        correlation_id: Uuid::new_v4(),
        store_id,
    };

    info!(correlation_id = %command.correlation_id, "handling recompute_store_aggregate command");

    let aggregate = rating_commands::handle_recompute_store_aggregate(
        &command,
        &*state.entities,
        &state.retry,
    )
    .await?;

    Ok(Json(StoreAggregateResponse {
        store_id,
        average_rating: aggregate.average_rating(),
        total_ratings: aggregate.total_ratings(),
    }))
}

/// POST /stores/recompute
#[instrument(skip(state, principal), fields(requester_id = %principal.user_id))]
async fn recompute_all_aggregates(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<Json<RecomputeAllResponse>, ApiError> {
    principal.require_admin()?;
    let correlation_id = Uuid::new_v4();

    info!(%correlation_id, "handling recompute_all_aggregates command");

    let recomputed =
        rating_commands::handle_recompute_all_aggregates(correlation_id, &*state.entities, &state.retry)
            .await?;

    Ok(Json(RecomputeAllResponse { recomputed }))
}

/// Returns the router for store endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_stores).post(create_store))
        .route("/recompute", post(recompute_all_aggregates))
        .route("/owner/{user_id}", get(get_store_by_owner))
        .route(
            "/{id}",
            get(get_store).put(update_store).delete(delete_store),
        )
        .route("/{id}/ratings", get(list_store_ratings))
        .route("/{id}/recompute", post(recompute_store_aggregate))
}
