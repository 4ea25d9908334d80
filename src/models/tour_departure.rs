use chrono::NaiveDate;
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
pub enum TourDepartureStatus {
    #[sqlx(rename = "PLANNED")]
    Planned,
    #[sqlx(rename = "SALES_CLOSED")]
    SalesClosed,
    #[sqlx(rename = "CANCELLED")]
    Cancelled,
    #[sqlx(rename = "IN_PROGRESS")]
    InProgress,
    #[sqlx(rename = "COMPLETED")]
    Completed,
}

impl TourDepartureStatus {
    /// CANCELLED and COMPLETED never regress to an open status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TourDepartureStatus::Cancelled | TourDepartureStatus::Completed
        )
    }

    /// Statuses that refuse new or re-activated bookings.
    pub fn refuses_bookings(&self) -> bool {
        matches!(
            self,
            TourDepartureStatus::Cancelled
                | TourDepartureStatus::Completed
                | TourDepartureStatus::SalesClosed
        )
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TourDeparture {
    pub id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub capacity_total: i32,
    pub capacity_reserved: i32,
    pub price_override: Option<Decimal>,
    pub status: TourDepartureStatus,
    pub tour_id: i64,
}

impl TourDeparture {
    pub fn available_seats(&self) -> i32 {
        (self.capacity_total - self.capacity_reserved).max(0)
    }

    /// The automatic PLANNED <-> SALES_CLOSED flip driven by the seat
    /// counter. Terminal and IN_PROGRESS statuses are never touched.
    pub fn synced_status(&self) -> TourDepartureStatus {
        if self.capacity_total > 0 && self.capacity_reserved >= self.capacity_total {
            if self.status == TourDepartureStatus::Planned {
                return TourDepartureStatus::SalesClosed;
            }
        } else if self.status == TourDepartureStatus::SalesClosed {
            return TourDepartureStatus::Planned;
        }
        self.status
    }
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct TourDepartureCreateRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(range(min = 1))]
    pub capacity_total: i32,
    #[validate(range(min = 0))]
    pub capacity_reserved: Option<i32>,
    pub price_override: Option<Decimal>,
    pub status: Option<TourDepartureStatus>,
    pub tour_id: i64,
    pub flight_ids: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct TourDepartureUpdateRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(range(min = 1))]
    pub capacity_total: i32,
    #[validate(range(min = 0))]
    pub capacity_reserved: Option<i32>,
    pub price_override: Option<Decimal>,
    pub status: Option<TourDepartureStatus>,
    pub tour_id: i64,
    /// When present, becomes the exact set of linked flights.
    pub flight_ids: Option<Vec<i64>>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct TourDepartureResponse {
    pub id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub capacity_total: i32,
    pub capacity_reserved: i32,
    pub price_override: Option<Decimal>,
    pub status: TourDepartureStatus,
    pub tour_id: i64,
}

impl From<TourDeparture> for TourDepartureResponse {
    fn from(d: TourDeparture) -> Self {
        TourDepartureResponse {
            id: d.id,
            start_date: d.start_date,
            end_date: d.end_date,
            capacity_total: d.capacity_total,
            capacity_reserved: d.capacity_reserved,
            price_override: d.price_override,
            status: d.status,
            tour_id: d.tour_id,
        }
    }
}

/// Optional filters for departure listings; absent means no constraint.
#[derive(Debug, Default)]
pub struct TourDepartureFilter {
    pub tour_id: Option<i64>,
    pub status: Option<TourDepartureStatus>,
    pub start_from: Option<NaiveDate>,
    pub start_to: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn departure(total: i32, reserved: i32, status: TourDepartureStatus) -> TourDeparture {
        TourDeparture {
            id: 1,
            start_date: "2026-06-01".parse().unwrap(),
            end_date: "2026-06-08".parse().unwrap(),
            capacity_total: total,
            capacity_reserved: reserved,
            price_override: None,
            status,
            tour_id: 1,
        }
    }

    #[test]
    fn full_planned_departure_closes_sales() {
        let d = departure(10, 10, TourDepartureStatus::Planned);
        assert_eq!(d.synced_status(), TourDepartureStatus::SalesClosed);
    }

    #[test]
    fn freed_seats_reopen_sales() {
        let d = departure(10, 4, TourDepartureStatus::SalesClosed);
        assert_eq!(d.synced_status(), TourDepartureStatus::Planned);
    }

    #[test]
    fn terminal_statuses_never_flip() {
        let d = departure(10, 10, TourDepartureStatus::Cancelled);
        assert_eq!(d.synced_status(), TourDepartureStatus::Cancelled);
        let d = departure(10, 0, TourDepartureStatus::Completed);
        assert_eq!(d.synced_status(), TourDepartureStatus::Completed);
    }

    #[test]
    fn in_progress_is_left_alone() {
        let d = departure(10, 10, TourDepartureStatus::InProgress);
        assert_eq!(d.synced_status(), TourDepartureStatus::InProgress);
    }

    #[test]
    fn available_seats_never_negative() {
        assert_eq!(departure(5, 9, TourDepartureStatus::Planned).available_seats(), 0);
        assert_eq!(departure(10, 4, TourDepartureStatus::Planned).available_seats(), 6);
    }
}
