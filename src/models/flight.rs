use chrono::{NaiveDate, NaiveDateTime};
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
pub enum FlightStatus {
    #[sqlx(rename = "SCHEDULED")]
    Scheduled,
    #[sqlx(rename = "BOARDING")]
    Boarding,
    #[sqlx(rename = "DEPARTED")]
    Departed,
    #[sqlx(rename = "ARRIVED")]
    Arrived,
    #[sqlx(rename = "CANCELLED")]
    Cancelled,
    #[sqlx(rename = "DELAYED")]
    Delayed,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Flight {
    pub id: i64,
    pub flight_number: String,
    pub carrier: String,
    pub depart_at: NaiveDateTime,
    pub arrive_at: NaiveDateTime,
    pub status: FlightStatus,
    pub base_price: Decimal,
    pub departure_airport_id: i64,
    pub arrival_airport_id: i64,
}

/// Flight joined with the city of each endpoint airport, the shape the
/// linkage validator works on.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FlightGeo {
    pub id: i64,
    pub flight_number: String,
    pub depart_at: NaiveDateTime,
    pub arrive_at: NaiveDateTime,
    pub departure_city_id: i64,
    pub arrival_city_id: i64,
}

impl FlightGeo {
    /// A flight fits a departure when the tour's base city is one of the
    /// flight's endpoint cities and the flight's date interval intersects
    /// the departure's date interval.
    pub fn compatible_with(
        &self,
        base_city_id: i64,
        dep_start: NaiveDate,
        dep_end: NaiveDate,
    ) -> bool {
        if self.departure_city_id != base_city_id && self.arrival_city_id != base_city_id {
            return false;
        }
        let flight_from = self.depart_at.date();
        let flight_to = self.arrive_at.date();
        !(flight_to < dep_start || flight_from > dep_end)
    }
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct FlightCreateRequest {
    #[validate(length(min = 1, max = 20))]
    pub flight_number: String,
    #[validate(length(min = 1, max = 150))]
    pub carrier: String,
    pub depart_at: NaiveDateTime,
    pub arrive_at: NaiveDateTime,
    pub base_price: Decimal,
    pub status: Option<FlightStatus>,
    pub departure_airport_id: i64,
    pub arrival_airport_id: i64,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct FlightResponse {
    pub id: i64,
    pub flight_number: String,
    pub carrier: String,
    pub depart_at: NaiveDateTime,
    pub arrive_at: NaiveDateTime,
    pub status: FlightStatus,
    pub base_price: Decimal,
    pub departure_airport_id: i64,
    pub arrival_airport_id: i64,
}

impl From<Flight> for FlightResponse {
    fn from(f: Flight) -> Self {
        FlightResponse {
            id: f.id,
            flight_number: f.flight_number,
            carrier: f.carrier,
            depart_at: f.depart_at,
            arrive_at: f.arrive_at,
            status: f.status,
            base_price: f.base_price,
            departure_airport_id: f.departure_airport_id,
            arrival_airport_id: f.arrival_airport_id,
        }
    }
}

/// Optional filters for the flight listing; absent means no constraint.
#[derive(Debug, Default)]
pub struct FlightFilter {
    pub flight_number: Option<String>,
    pub departure_airport_name: Option<String>,
    pub arrival_airport_name: Option<String>,
}
