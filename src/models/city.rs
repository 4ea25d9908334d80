use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct City {
    pub id: i64,
    pub name: String,
    pub country: String,
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct CityCreateRequest {
    #[validate(length(min = 1, max = 150))]
    pub name: String,
    #[validate(length(min = 1, max = 150))]
    pub country: String,
    #[validate(length(max = 50))]
    pub timezone: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct CityResponse {
    pub id: i64,
    pub name: String,
    pub country: String,
    pub timezone: Option<String>,
}

impl From<City> for CityResponse {
    fn from(c: City) -> Self {
        CityResponse {
            id: c.id,
            name: c.name,
            country: c.country,
            timezone: c.timezone,
        }
    }
}
