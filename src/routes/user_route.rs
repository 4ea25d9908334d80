use crate::models::pagination::{page_params, PageResponse};
use crate::models::user::{
    RegisterResponse, UserCreateRequest, UserFilter, UserLoginRequest, UserLoginResponse,
    UserRegistrationRequest, UserResponse, UserRole, UserUpdateRequest,
};
use crate::services::user_service::UserService;
use crate::utils::error::AppError;
use crate::utils::jwt::AdminUser;
use rocket::serde::json::{json, Json, Value};
use rocket::State;
use rocket_okapi::openapi;
use std::str::FromStr;

/// Register a new customer account
#[openapi(tag = "Users")]
#[post("/users/register", format = "json", data = "<request>")]
pub async fn register(
    request: Json<UserRegistrationRequest>,
    user_service: &State<UserService>,
) -> Result<Json<RegisterResponse>, AppError> {
    let response = user_service.register(request.into_inner()).await?;
    Ok(Json(response))
}

/// Login with email and password
#[openapi(tag = "Users")]
#[post("/users/login", format = "json", data = "<request>")]
pub async fn login(
    request: Json<UserLoginRequest>,
    user_service: &State<UserService>,
) -> Result<Json<UserLoginResponse>, AppError> {
    let response = user_service.login(request.into_inner()).await?;
    Ok(Json(response))
}

/// List users with optional filters (admin)
#[openapi(tag = "Users")]
#[get("/users?<username>&<email>&<role>&<active>&<page>&<size>")]
pub async fn list_users(
    username: Option<String>,
    email: Option<String>,
    role: Option<String>,
    active: Option<bool>,
    page: Option<u32>,
    size: Option<u32>,
    _admin: AdminUser,
    user_service: &State<UserService>,
) -> Result<Json<PageResponse<UserResponse>>, AppError> {
    let role = match role {
        Some(value) => Some(
            UserRole::from_str(&value)
                .map_err(|_| AppError::BadRequest(format!("Unknown role {value}")))?,
        ),
        None => None,
    };
    let filter = UserFilter {
        username,
        email,
        role,
        active,
    };
    let (page, size) = page_params(page, size);
    let response = user_service.list_paged(&filter, page, size).await?;
    Ok(Json(response))
}

/// Fetch one user (admin)
#[openapi(tag = "Users")]
#[get("/users/<id>")]
pub async fn get_user(
    id: i64,
    _admin: AdminUser,
    user_service: &State<UserService>,
) -> Result<Json<UserResponse>, AppError> {
    let response = user_service.get_by_id(id).await?;
    Ok(Json(response))
}

/// Create a user with an explicit role (admin)
#[openapi(tag = "Users")]
#[post("/users", format = "json", data = "<request>")]
pub async fn create_user(
    request: Json<UserCreateRequest>,
    _admin: AdminUser,
    user_service: &State<UserService>,
) -> Result<Json<UserResponse>, AppError> {
    let response = user_service.create(request.into_inner()).await?;
    Ok(Json(response))
}

/// Update a user (admin)
#[openapi(tag = "Users")]
#[put("/users/<id>", format = "json", data = "<request>")]
pub async fn update_user(
    id: i64,
    request: Json<UserUpdateRequest>,
    _admin: AdminUser,
    user_service: &State<UserService>,
) -> Result<Json<UserResponse>, AppError> {
    let response = user_service.update(id, request.into_inner()).await?;
    Ok(Json(response))
}

/// Deactivate a user account (admin)
#[openapi(tag = "Users")]
#[post("/users/<id>/deactivate")]
pub async fn deactivate_user(
    id: i64,
    _admin: AdminUser,
    user_service: &State<UserService>,
) -> Result<Json<UserResponse>, AppError> {
    let response = user_service.deactivate(id).await?;
    Ok(Json(response))
}

/// Delete a user (admin)
#[openapi(tag = "Users")]
#[delete("/users/<id>")]
pub async fn delete_user(
    id: i64,
    _admin: AdminUser,
    user_service: &State<UserService>,
) -> Result<Json<Value>, AppError> {
    user_service.delete(id).await?;
    Ok(Json(json!({ "status": "deleted" })))
}
