use crate::models::pagination::{page_params, PageResponse};
use crate::models::tour::{
    TourCreateRequest, TourFilter, TourResponse, TourStatus, TourUpdateRequest,
};
use crate::services::tour_service::TourService;
use crate::utils::error::AppError;
use crate::utils::jwt::{AdminUser, AuthenticatedUser, StaffUser};
use rocket::serde::json::{json, Json, Value};
use rocket::State;
use rocket_okapi::openapi;
use std::str::FromStr;

/// Public tour catalog: published and active tours only
#[openapi(tag = "Tours")]
#[get("/tours?<page>&<size>")]
pub async fn list_tours(
    page: Option<u32>,
    size: Option<u32>,
    _auth: AuthenticatedUser,
    tour_service: &State<TourService>,
) -> Result<Json<PageResponse<TourResponse>>, AppError> {
    let (page, size) = page_params(page, size);
    let response = tour_service.list_public(page, size).await?;
    Ok(Json(response))
}

/// Admin listing with filters
#[openapi(tag = "Tours")]
#[get("/tours/manage?<title>&<base_city_id>&<status>&<active>&<manager_user_id>&<page>&<size>")]
pub async fn list_tours_admin(
    title: Option<String>,
    base_city_id: Option<i64>,
    status: Option<String>,
    active: Option<bool>,
    manager_user_id: Option<i64>,
    page: Option<u32>,
    size: Option<u32>,
    _admin: AdminUser,
    tour_service: &State<TourService>,
) -> Result<Json<PageResponse<TourResponse>>, AppError> {
    let status = match status {
        Some(value) => Some(
            TourStatus::from_str(&value)
                .map_err(|_| AppError::BadRequest(format!("Unknown tour status {value}")))?,
        ),
        None => None,
    };
    let filter = TourFilter {
        title,
        base_city_id,
        status,
        active,
        manager_user_id,
    };
    let (page, size) = page_params(page, size);
    let response = tour_service.list_paged(&filter, page, size).await?;
    Ok(Json(response))
}

/// Tours managed by the calling manager
#[openapi(tag = "Tours")]
#[get("/tours/my")]
pub async fn list_my_tours(
    staff: StaffUser,
    tour_service: &State<TourService>,
) -> Result<Json<Vec<TourResponse>>, AppError> {
    let response = tour_service.list_my(staff.0.user_id).await?;
    Ok(Json(response))
}

/// Fetch one tour
#[openapi(tag = "Tours")]
#[get("/tours/<id>")]
pub async fn get_tour(
    id: i64,
    _auth: AuthenticatedUser,
    tour_service: &State<TourService>,
) -> Result<Json<TourResponse>, AppError> {
    let response = tour_service.get_by_id(id).await?;
    Ok(Json(response))
}

/// Create a tour (admin)
#[openapi(tag = "Tours")]
#[post("/tours", format = "json", data = "<request>")]
pub async fn create_tour(
    request: Json<TourCreateRequest>,
    _admin: AdminUser,
    tour_service: &State<TourService>,
) -> Result<Json<TourResponse>, AppError> {
    let response = tour_service.create(request.into_inner()).await?;
    Ok(Json(response))
}

/// Update a tour (admin)
#[openapi(tag = "Tours")]
#[put("/tours/<id>", format = "json", data = "<request>")]
pub async fn update_tour(
    id: i64,
    request: Json<TourUpdateRequest>,
    _admin: AdminUser,
    tour_service: &State<TourService>,
) -> Result<Json<TourResponse>, AppError> {
    let response = tour_service.update(id, request.into_inner()).await?;
    Ok(Json(response))
}

/// Delete a tour (admin)
#[openapi(tag = "Tours")]
#[delete("/tours/<id>")]
pub async fn delete_tour(
    id: i64,
    _admin: AdminUser,
    tour_service: &State<TourService>,
) -> Result<Json<Value>, AppError> {
    tour_service.delete(id).await?;
    Ok(Json(json!({ "status": "deleted" })))
}
