use crate::models::pagination::{page_params, PageResponse};
use crate::models::tour_departure::{
    TourDepartureCreateRequest, TourDepartureFilter, TourDepartureResponse, TourDepartureStatus,
    TourDepartureUpdateRequest,
};
use crate::services::tour_departure_service::TourDepartureService;
use crate::utils::error::AppError;
use crate::utils::jwt::{AuthenticatedUser, StaffUser};
use chrono::NaiveDate;
use rocket::serde::json::{json, Json, Value};
use rocket::State;
use rocket_okapi::openapi;
use std::str::FromStr;

/// List departures with optional filters
#[openapi(tag = "Tour departures")]
#[get("/tour-departures?<tour_id>&<status>&<start_from>&<start_to>&<page>&<size>")]
pub async fn list_departures(
    tour_id: Option<i64>,
    status: Option<String>,
    start_from: Option<String>,
    start_to: Option<String>,
    page: Option<u32>,
    size: Option<u32>,
    _auth: AuthenticatedUser,
    departure_service: &State<TourDepartureService>,
) -> Result<Json<PageResponse<TourDepartureResponse>>, AppError> {
    let status = match status {
        Some(value) => Some(
            TourDepartureStatus::from_str(&value)
                .map_err(|_| AppError::BadRequest(format!("Unknown departure status {value}")))?,
        ),
        None => None,
    };
    let filter = TourDepartureFilter {
        tour_id,
        status,
        start_from: parse_date(start_from)?,
        start_to: parse_date(start_to)?,
    };
    let (page, size) = page_params(page, size);
    let response = departure_service.list_all_paged(&filter, page, size).await?;
    Ok(Json(response))
}

/// Departures of tours managed by the calling manager
#[openapi(tag = "Tour departures")]
#[get("/tour-departures/my")]
pub async fn list_my_departures(
    staff: StaffUser,
    departure_service: &State<TourDepartureService>,
) -> Result<Json<Vec<TourDepartureResponse>>, AppError> {
    let response = departure_service.list_my(staff.0.user_id).await?;
    Ok(Json(response))
}

/// Departures a flight could serve
#[openapi(tag = "Tour departures")]
#[get("/flights/<flight_id>/tour-departures")]
pub async fn departures_for_flight(
    flight_id: i64,
    _auth: AuthenticatedUser,
    departure_service: &State<TourDepartureService>,
) -> Result<Json<Vec<TourDepartureResponse>>, AppError> {
    let response = departure_service.list_for_flight(flight_id).await?;
    Ok(Json(response))
}

/// Fetch one departure
#[openapi(tag = "Tour departures")]
#[get("/tour-departures/<id>")]
pub async fn get_departure(
    id: i64,
    _auth: AuthenticatedUser,
    departure_service: &State<TourDepartureService>,
) -> Result<Json<TourDepartureResponse>, AppError> {
    let response = departure_service.get_by_id(id).await?;
    Ok(Json(response))
}

/// Create a departure (admin anywhere, manager on own tours)
#[openapi(tag = "Tour departures")]
#[post("/tour-departures", format = "json", data = "<request>")]
pub async fn create_departure(
    request: Json<TourDepartureCreateRequest>,
    staff: StaffUser,
    departure_service: &State<TourDepartureService>,
) -> Result<Json<TourDepartureResponse>, AppError> {
    let response = departure_service
        .create(staff.0.user_id, staff.0.role, request.into_inner())
        .await?;
    Ok(Json(response))
}

/// Update a departure (admin anywhere, manager on own tours)
#[openapi(tag = "Tour departures")]
#[put("/tour-departures/<id>", format = "json", data = "<request>")]
pub async fn update_departure(
    id: i64,
    request: Json<TourDepartureUpdateRequest>,
    staff: StaffUser,
    departure_service: &State<TourDepartureService>,
) -> Result<Json<TourDepartureResponse>, AppError> {
    let response = departure_service
        .update(id, staff.0.user_id, staff.0.role, request.into_inner())
        .await?;
    Ok(Json(response))
}

/// Delete a departure without bookings (admin anywhere, manager on own tours)
#[openapi(tag = "Tour departures")]
#[delete("/tour-departures/<id>")]
pub async fn delete_departure(
    id: i64,
    staff: StaffUser,
    departure_service: &State<TourDepartureService>,
) -> Result<Json<Value>, AppError> {
    departure_service
        .delete(id, staff.0.user_id, staff.0.role)
        .await?;
    Ok(Json(json!({ "status": "deleted" })))
}

fn parse_date(value: Option<String>) -> Result<Option<NaiveDate>, AppError> {
    match value {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("Invalid date {raw}, expected YYYY-MM-DD"))),
        None => Ok(None),
    }
}
