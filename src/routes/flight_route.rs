use crate::models::flight::{FlightCreateRequest, FlightFilter, FlightResponse};
use crate::models::pagination::{page_params, PageResponse};
use crate::services::flight_service::FlightService;
use crate::utils::error::AppError;
use crate::utils::jwt::{AdminUser, AuthenticatedUser};
use rocket::serde::json::{json, Json, Value};
use rocket::State;
use rocket_okapi::openapi;

/// List flights with optional filters
#[openapi(tag = "Flights")]
#[get("/flights?<flight_number>&<departure_airport>&<arrival_airport>&<page>&<size>")]
pub async fn list_flights(
    flight_number: Option<String>,
    departure_airport: Option<String>,
    arrival_airport: Option<String>,
    page: Option<u32>,
    size: Option<u32>,
    _auth: AuthenticatedUser,
    flight_service: &State<FlightService>,
) -> Result<Json<PageResponse<FlightResponse>>, AppError> {
    let filter = FlightFilter {
        flight_number,
        departure_airport_name: departure_airport,
        arrival_airport_name: arrival_airport,
    };
    let (page, size) = page_params(page, size);
    let response = flight_service.list_paged(&filter, page, size).await?;
    Ok(Json(response))
}

/// Fetch one flight
#[openapi(tag = "Flights")]
#[get("/flights/<id>")]
pub async fn get_flight(
    id: i64,
    _auth: AuthenticatedUser,
    flight_service: &State<FlightService>,
) -> Result<Json<FlightResponse>, AppError> {
    let response = flight_service.get_by_id(id).await?;
    Ok(Json(response))
}

/// Look a flight up by its flight number
#[openapi(tag = "Flights")]
#[get("/flights/by-number/<flight_number>")]
pub async fn get_flight_by_number(
    flight_number: String,
    _auth: AuthenticatedUser,
    flight_service: &State<FlightService>,
) -> Result<Json<FlightResponse>, AppError> {
    let response = flight_service.find_by_flight_number(&flight_number).await?;
    Ok(Json(response))
}

/// Flights serving a city
#[openapi(tag = "Flights")]
#[get("/flights/for-city/<city_id>")]
pub async fn flights_for_city(
    city_id: i64,
    _auth: AuthenticatedUser,
    flight_service: &State<FlightService>,
) -> Result<Json<Vec<FlightResponse>>, AppError> {
    let response = flight_service.list_for_city(city_id).await?;
    Ok(Json(response))
}

/// Flights that could serve a tour departure
#[openapi(tag = "Flights")]
#[get("/tour-departures/<departure_id>/flights")]
pub async fn flights_for_departure(
    departure_id: i64,
    _auth: AuthenticatedUser,
    flight_service: &State<FlightService>,
) -> Result<Json<Vec<FlightResponse>>, AppError> {
    let response = flight_service.flights_for_departure(departure_id).await?;
    Ok(Json(response))
}

/// Create a flight (admin)
#[openapi(tag = "Flights")]
#[post("/flights", format = "json", data = "<request>")]
pub async fn create_flight(
    request: Json<FlightCreateRequest>,
    _admin: AdminUser,
    flight_service: &State<FlightService>,
) -> Result<Json<FlightResponse>, AppError> {
    let response = flight_service.create(request.into_inner()).await?;
    Ok(Json(response))
}

/// Update a flight (admin)
#[openapi(tag = "Flights")]
#[put("/flights/<id>", format = "json", data = "<request>")]
pub async fn update_flight(
    id: i64,
    request: Json<FlightCreateRequest>,
    _admin: AdminUser,
    flight_service: &State<FlightService>,
) -> Result<Json<FlightResponse>, AppError> {
    let response = flight_service.update(id, request.into_inner()).await?;
    Ok(Json(response))
}

/// Delete a flight (admin)
#[openapi(tag = "Flights")]
#[delete("/flights/<id>")]
pub async fn delete_flight(
    id: i64,
    _admin: AdminUser,
    flight_service: &State<FlightService>,
) -> Result<Json<Value>, AppError> {
    flight_service.delete(id).await?;
    Ok(Json(json!({ "status": "deleted" })))
}

/// Link a flight to a tour departure (admin)
#[openapi(tag = "Flights")]
#[post("/flights/<id>/departures/<departure_id>")]
pub async fn link_departure(
    id: i64,
    departure_id: i64,
    _admin: AdminUser,
    flight_service: &State<FlightService>,
) -> Result<Json<Value>, AppError> {
    flight_service.add_departure_link(id, departure_id).await?;
    Ok(Json(json!({ "status": "linked" })))
}

/// Unlink a flight from a tour departure (admin)
#[openapi(tag = "Flights")]
#[delete("/flights/<id>/departures/<departure_id>")]
pub async fn unlink_departure(
    id: i64,
    departure_id: i64,
    _admin: AdminUser,
    flight_service: &State<FlightService>,
) -> Result<Json<Value>, AppError> {
    flight_service
        .remove_departure_link(id, departure_id)
        .await?;
    Ok(Json(json!({ "status": "unlinked" })))
}
