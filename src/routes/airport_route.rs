use crate::models::airport::{AirportCreateRequest, AirportResponse};
use crate::services::airport_service::AirportService;
use crate::utils::error::AppError;
use crate::utils::jwt::{AdminUser, AuthenticatedUser};
use rocket::serde::json::{json, Json, Value};
use rocket::State;
use rocket_okapi::openapi;

/// List all airports
#[openapi(tag = "Airports")]
#[get("/airports")]
pub async fn list_airports(
    _auth: AuthenticatedUser,
    airport_service: &State<AirportService>,
) -> Result<Json<Vec<AirportResponse>>, AppError> {
    let response = airport_service.list_all().await?;
    Ok(Json(response))
}

/// Fetch one airport
#[openapi(tag = "Airports")]
#[get("/airports/<id>")]
pub async fn get_airport(
    id: i64,
    _auth: AuthenticatedUser,
    airport_service: &State<AirportService>,
) -> Result<Json<AirportResponse>, AppError> {
    let response = airport_service.get_by_id(id).await?;
    Ok(Json(response))
}

/// Create an airport (admin)
#[openapi(tag = "Airports")]
#[post("/airports", format = "json", data = "<request>")]
pub async fn create_airport(
    request: Json<AirportCreateRequest>,
    _admin: AdminUser,
    airport_service: &State<AirportService>,
) -> Result<Json<AirportResponse>, AppError> {
    let response = airport_service.create(request.into_inner()).await?;
    Ok(Json(response))
}

/// Update an airport (admin)
#[openapi(tag = "Airports")]
#[put("/airports/<id>", format = "json", data = "<request>")]
pub async fn update_airport(
    id: i64,
    request: Json<AirportCreateRequest>,
    _admin: AdminUser,
    airport_service: &State<AirportService>,
) -> Result<Json<AirportResponse>, AppError> {
    let response = airport_service.update(id, request.into_inner()).await?;
    Ok(Json(response))
}

/// Delete an airport (admin)
#[openapi(tag = "Airports")]
#[delete("/airports/<id>")]
pub async fn delete_airport(
    id: i64,
    _admin: AdminUser,
    airport_service: &State<AirportService>,
) -> Result<Json<Value>, AppError> {
    airport_service.delete(id).await?;
    Ok(Json(json!({ "status": "deleted" })))
}
