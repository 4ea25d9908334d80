use crate::models::booking::{
    BookingCreateRequest, BookingFilter, BookingResponse, BookingStatus,
    BookingStatusUpdateRequest, BookingUpdateRequest,
};
use crate::models::pagination::{page_params, PageResponse};
use crate::services::booking_service::BookingService;
use crate::utils::error::AppError;
use crate::utils::jwt::{AuthenticatedUser, StaffUser};
use chrono::NaiveDateTime;
use rocket::serde::json::{json, Json, Value};
use rocket::State;
use rocket_okapi::openapi;
use std::str::FromStr;

/// Book seats on a tour departure
#[openapi(tag = "Bookings")]
#[post("/bookings", format = "json", data = "<request>")]
pub async fn create_booking(
    request: Json<BookingCreateRequest>,
    auth: AuthenticatedUser,
    booking_service: &State<BookingService>,
) -> Result<Json<BookingResponse>, AppError> {
    let response = booking_service
        .create(auth.user_id, request.into_inner())
        .await?;
    Ok(Json(response))
}

/// The caller's own bookings
#[openapi(tag = "Bookings")]
#[get("/bookings/my?<page>&<size>")]
pub async fn list_my_bookings(
    page: Option<u32>,
    size: Option<u32>,
    auth: AuthenticatedUser,
    booking_service: &State<BookingService>,
) -> Result<Json<PageResponse<BookingResponse>>, AppError> {
    let (page, size) = page_params(page, size);
    let response = booking_service.list_my(auth.user_id, page, size).await?;
    Ok(Json(response))
}

/// All bookings with optional filters (staff)
#[openapi(tag = "Bookings")]
#[get("/bookings?<user_id>&<tour_departure_id>&<status>&<created_from>&<created_to>&<page>&<size>")]
pub async fn list_bookings(
    user_id: Option<i64>,
    tour_departure_id: Option<i64>,
    status: Option<String>,
    created_from: Option<String>,
    created_to: Option<String>,
    page: Option<u32>,
    size: Option<u32>,
    _staff: StaffUser,
    booking_service: &State<BookingService>,
) -> Result<Json<PageResponse<BookingResponse>>, AppError> {
    let status = match status {
        Some(value) => Some(
            BookingStatus::from_str(&value)
                .map_err(|_| AppError::BadRequest(format!("Unknown booking status {value}")))?,
        ),
        None => None,
    };
    let filter = BookingFilter {
        user_id,
        tour_departure_id,
        status,
        created_from: parse_datetime(created_from)?,
        created_to: parse_datetime(created_to)?,
        user_email: None,
    };
    let (page, size) = page_params(page, size);
    let response = booking_service.list_all_paged(&filter, page, size).await?;
    Ok(Json(response))
}

/// Bookings of one customer, found by email (staff)
#[openapi(tag = "Bookings")]
#[get("/bookings/by-email?<email>&<page>&<size>")]
pub async fn search_bookings_by_email(
    email: Option<String>,
    page: Option<u32>,
    size: Option<u32>,
    _staff: StaffUser,
    booking_service: &State<BookingService>,
) -> Result<Json<PageResponse<BookingResponse>>, AppError> {
    let (page, size) = page_params(page, size);
    let response = booking_service
        .search_by_user_email(email.as_deref().unwrap_or(""), page, size)
        .await?;
    Ok(Json(response))
}

/// Fetch one booking (staff)
#[openapi(tag = "Bookings")]
#[get("/bookings/<id>")]
pub async fn get_booking(
    id: i64,
    _staff: StaffUser,
    booking_service: &State<BookingService>,
) -> Result<Json<BookingResponse>, AppError> {
    let response = booking_service.get_by_id(id).await?;
    Ok(Json(response))
}

/// Change a booking's status (staff)
#[openapi(tag = "Bookings")]
#[patch("/bookings/<id>/status", format = "json", data = "<request>")]
pub async fn update_booking_status(
    id: i64,
    request: Json<BookingStatusUpdateRequest>,
    _staff: StaffUser,
    booking_service: &State<BookingService>,
) -> Result<Json<BookingResponse>, AppError> {
    let response = booking_service
        .update_status(id, request.into_inner())
        .await?;
    Ok(Json(response))
}

/// Rewrite a booking, possibly moving it to another departure (staff)
#[openapi(tag = "Bookings")]
#[put("/bookings/<id>", format = "json", data = "<request>")]
pub async fn update_booking(
    id: i64,
    request: Json<BookingUpdateRequest>,
    _staff: StaffUser,
    booking_service: &State<BookingService>,
) -> Result<Json<BookingResponse>, AppError> {
    let response = booking_service.update(id, request.into_inner()).await?;
    Ok(Json(response))
}

/// Delete a booking (staff)
#[openapi(tag = "Bookings")]
#[delete("/bookings/<id>")]
pub async fn delete_booking(
    id: i64,
    _staff: StaffUser,
    booking_service: &State<BookingService>,
) -> Result<Json<Value>, AppError> {
    booking_service.delete(id).await?;
    Ok(Json(json!({ "status": "deleted" })))
}

/// Cancel one of the caller's own pending bookings
#[openapi(tag = "Bookings")]
#[post("/bookings/<id>/cancel")]
pub async fn cancel_my_booking(
    id: i64,
    auth: AuthenticatedUser,
    booking_service: &State<BookingService>,
) -> Result<Json<BookingResponse>, AppError> {
    let response = booking_service.cancel_my(id, auth.user_id).await?;
    Ok(Json(response))
}

fn parse_datetime(value: Option<String>) -> Result<Option<NaiveDateTime>, AppError> {
    match value {
        Some(raw) => NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S")
            .map(Some)
            .map_err(|_| {
                AppError::BadRequest(format!(
                    "Invalid timestamp {raw}, expected YYYY-MM-DDTHH:MM:SS"
                ))
            }),
        None => Ok(None),
    }
}
