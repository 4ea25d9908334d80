use crate::models::pagination::{page_params, PageResponse};
use crate::models::recommendation::{
    RecommendedTourCard, UserSearchCreateRequest, UserSearchCreateResponse,
};
use crate::services::recommendation_service::RecommendationService;
use crate::services::user_search_service::UserSearchService;
use crate::utils::error::AppError;
use crate::utils::jwt::AuthenticatedUser;
use rocket::serde::json::{json, Json, Value};
use rocket::State;
use rocket_okapi::openapi;

/// Record a tour search
#[openapi(tag = "Recommendations")]
#[post("/searches", format = "json", data = "<request>")]
pub async fn create_search(
    request: Json<UserSearchCreateRequest>,
    auth: AuthenticatedUser,
    search_service: &State<UserSearchService>,
) -> Result<Json<UserSearchCreateResponse>, AppError> {
    let response = search_service
        .create(auth.user_id, request.into_inner())
        .await?;
    Ok(Json(response))
}

/// Recommendations for one of the caller's searches
#[openapi(tag = "Recommendations")]
#[get("/searches/<search_id>/recommendations?<page>&<size>")]
pub async fn get_recommendations(
    search_id: i64,
    page: Option<u32>,
    size: Option<u32>,
    auth: AuthenticatedUser,
    recommendation_service: &State<RecommendationService>,
) -> Result<Json<PageResponse<RecommendedTourCard>>, AppError> {
    let (page, size) = page_params(page, size);
    let response = recommendation_service
        .fetch_my_paged(search_id, auth.user_id, page, size)
        .await?;
    Ok(Json(response))
}

/// Mark a recommendation as selected
#[openapi(tag = "Recommendations")]
#[post("/recommendations/<id>/select")]
pub async fn select_recommendation(
    id: i64,
    auth: AuthenticatedUser,
    recommendation_service: &State<RecommendationService>,
) -> Result<Json<Value>, AppError> {
    recommendation_service.mark_selected(id, auth.user_id).await?;
    Ok(Json(json!({ "status": "selected" })))
}
