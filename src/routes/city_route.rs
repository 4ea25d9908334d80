use crate::models::airport::AirportResponse;
use crate::models::city::{CityCreateRequest, CityResponse};
use crate::services::airport_service::AirportService;
use crate::services::city_service::CityService;
use crate::utils::error::AppError;
use crate::utils::jwt::{AdminUser, AuthenticatedUser};
use rocket::serde::json::{json, Json, Value};
use rocket::State;
use rocket_okapi::openapi;

/// List all cities
#[openapi(tag = "Cities")]
#[get("/cities")]
pub async fn list_cities(
    _auth: AuthenticatedUser,
    city_service: &State<CityService>,
) -> Result<Json<Vec<CityResponse>>, AppError> {
    let response = city_service.list_all().await?;
    Ok(Json(response))
}

/// Fetch one city
#[openapi(tag = "Cities")]
#[get("/cities/<id>")]
pub async fn get_city(
    id: i64,
    _auth: AuthenticatedUser,
    city_service: &State<CityService>,
) -> Result<Json<CityResponse>, AppError> {
    let response = city_service.get_by_id(id).await?;
    Ok(Json(response))
}

/// Airports of a city
#[openapi(tag = "Cities")]
#[get("/cities/<id>/airports")]
pub async fn city_airports(
    id: i64,
    _auth: AuthenticatedUser,
    city_service: &State<CityService>,
    airport_service: &State<AirportService>,
) -> Result<Json<Vec<AirportResponse>>, AppError> {
    city_service.get_by_id(id).await?;
    let response = airport_service.list_for_city(id).await?;
    Ok(Json(response))
}

/// Create a city (admin)
#[openapi(tag = "Cities")]
#[post("/cities", format = "json", data = "<request>")]
pub async fn create_city(
    request: Json<CityCreateRequest>,
    _admin: AdminUser,
    city_service: &State<CityService>,
) -> Result<Json<CityResponse>, AppError> {
    let response = city_service.create(request.into_inner()).await?;
    Ok(Json(response))
}

/// Update a city (admin)
#[openapi(tag = "Cities")]
#[put("/cities/<id>", format = "json", data = "<request>")]
pub async fn update_city(
    id: i64,
    request: Json<CityCreateRequest>,
    _admin: AdminUser,
    city_service: &State<CityService>,
) -> Result<Json<CityResponse>, AppError> {
    let response = city_service.update(id, request.into_inner()).await?;
    Ok(Json(response))
}

/// Delete a city (admin)
#[openapi(tag = "Cities")]
#[delete("/cities/<id>")]
pub async fn delete_city(
    id: i64,
    _admin: AdminUser,
    city_service: &State<CityService>,
) -> Result<Json<Value>, AppError> {
    city_service.delete(id).await?;
    Ok(Json(json!({ "status": "deleted" })))
}
