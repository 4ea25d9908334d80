use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use validator::Validate;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display, EnumString,
    sqlx::Type,
)]
#[sqlx(type_name = "ENUM")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TourStatus {
    #[sqlx(rename = "DRAFT")]
    Draft,
    #[sqlx(rename = "PUBLISHED")]
    Published,
    #[sqlx(rename = "ARCHIVED")]
    Archived,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Tour {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub duration_days: i32,
    pub base_price: Decimal,
    pub status: TourStatus,
    pub is_active: bool,
    pub base_city_id: i64,
    pub manager_user_id: Option<i64>,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct TourCreateRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub duration_days: i32,
    pub base_price: Decimal,
    pub status: Option<TourStatus>,
    pub active: Option<bool>,
    pub base_city_id: i64,
    pub manager_user_id: Option<i64>,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct TourUpdateRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub duration_days: i32,
    pub base_price: Decimal,
    pub status: TourStatus,
    pub active: bool,
    pub base_city_id: i64,
    pub manager_user_id: Option<i64>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct TourResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub duration_days: i32,
    pub base_price: Decimal,
    pub status: TourStatus,
    pub active: bool,
    pub base_city_id: i64,
    pub manager_user_id: Option<i64>,
}

impl From<Tour> for TourResponse {
    fn from(t: Tour) -> Self {
        TourResponse {
            id: t.id,
            title: t.title,
            description: t.description,
            duration_days: t.duration_days,
            base_price: t.base_price,
            status: t.status,
            active: t.is_active,
            base_city_id: t.base_city_id,
            manager_user_id: t.manager_user_id,
        }
    }
}

/// Optional filters for the tour listing; absent means no constraint.
#[derive(Debug, Default)]
pub struct TourFilter {
    pub title: Option<String>,
    pub base_city_id: Option<i64>,
    pub status: Option<TourStatus>,
    pub active: Option<bool>,
    pub manager_user_id: Option<i64>,
}
