use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Airport {
    pub id: i64,
    pub iata_code: String,
    pub name: String,
    pub city_id: i64,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct AirportCreateRequest {
    #[validate(length(min = 3, max = 10))]
    pub iata_code: String,
    #[validate(length(min = 1, max = 150))]
    pub name: String,
    pub city_id: i64,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct AirportResponse {
    pub id: i64,
    pub iata_code: String,
    pub name: String,
    pub city_id: i64,
}

impl From<Airport> for AirportResponse {
    fn from(a: Airport) -> Self {
        AirportResponse {
            id: a.id,
            iata_code: a.iata_code,
            name: a.name,
            city_id: a.city_id,
        }
    }
}
