use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, MethodRouter},
    Json, Router,
};
use tracing::{field, info, instrument, Span};

use crate::{
    auth::AuthUser,
    error::AppResult,
    extract::{ApiJson, ApiPath, ApiQuery},
    response::{ApiResponse, MessageResponse, PageResponse},
    state::AppState,
    users::{
        dto::{CreateUserRequest, ListParams, UpdateUserRequest},
        repo_types::User,
        services::UserService,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", collection_routes())
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

/// List and create. Also mounted at the slash-terminated collection path.
pub fn collection_routes() -> MethodRouter<AppState> {
    get(list_users).post(create_user)
}

#[instrument(skip_all)]
pub async fn create_user(
    State(service): State<UserService>,
    ApiJson(body): ApiJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    let input = body.user.validate()?;
    let user = service.create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(user, "User created successfully")),
    ))
}

#[instrument(skip_all, fields(offset = field::Empty, limit = field::Empty, is_active = field::Empty))]
pub async fn list_users(
    State(service): State<UserService>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> AppResult<Json<PageResponse<User>>> {
    let filter = params.validate()?;
    let span = Span::current();
    span.record("offset", filter.skip);
    span.record("limit", filter.limit);
    span.record("is_active", field::debug(filter.is_active));
    let (users, total) = service.list(filter).await?;
    Ok(Json(PageResponse::new(
        users,
        total,
        filter.skip,
        filter.limit,
        "Users retrieved successfully",
    )))
}

#[instrument(skip_all, fields(user_id = id))]
pub async fn get_user(
    State(service): State<UserService>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = service.get_by_id(id).await?;
    Ok(Json(ApiResponse::ok(user, "User retrieved successfully")))
}

#[instrument(skip_all, fields(user_id = id, subject = %subject))]
pub async fn update_user(
    State(service): State<UserService>,
    AuthUser(subject): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateUserRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let input = body.user.validate()?;
    let user = service.update(id, input).await?;
    info!("user updated via api");
    Ok(Json(ApiResponse::ok(user, "User updated successfully")))
}

#[instrument(skip_all, fields(user_id = id, subject = %subject))]
pub async fn delete_user(
    State(service): State<UserService>,
    AuthUser(subject): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<MessageResponse>> {
    service.delete(id).await?;
    info!("user deleted via api");
    Ok(Json(MessageResponse::ok("User deleted successfully")))
}
