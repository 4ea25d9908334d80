use chrono::NaiveDateTime;
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
pub enum BookingStatus {
    #[sqlx(rename = "PENDING")]
    Pending,
    #[sqlx(rename = "CONFIRMED")]
    Confirmed,
    #[sqlx(rename = "CANCELLED")]
    Cancelled,
}

impl BookingStatus {
    /// Statuses that consume seats on the departure.
    pub fn is_counting(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

/// Net seat effect of moving a booking between two statuses on the same
/// departure: positive reserves, negative releases, zero leaves the
/// counter alone.
pub fn seat_delta(old: BookingStatus, new: BookingStatus, persons: i32) -> i32 {
    match (old.is_counting(), new.is_counting()) {
        (true, false) => -persons,
        (false, true) => persons,
        _ => 0,
    }
}

/// totalPrice = persons x (pricePerPerson + outbound + return?), where
/// pricePerPerson is the departure's override or the tour base price.
pub fn total_price(
    persons: i32,
    price_per_person: Decimal,
    outbound_price: Decimal,
    return_price: Option<Decimal>,
) -> Decimal {
    let per_person = price_per_person + outbound_price + return_price.unwrap_or(Decimal::ZERO);
    per_person * Decimal::from(persons)
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Booking {
    pub id: i64,
    pub persons_count: i32,
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub created_at: NaiveDateTime,
    pub user_id: i64,
    pub tour_departure_id: i64,
    pub outbound_flight_id: i64,
    pub return_flight_id: Option<i64>,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct BookingCreateRequest {
    #[validate(range(min = 1))]
    pub persons_count: i32,
    pub tour_departure_id: i64,
    pub outbound_flight_id: i64,
    pub return_flight_id: Option<i64>,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct BookingUpdateRequest {
    #[validate(range(min = 1))]
    pub persons_count: i32,
    pub status: BookingStatus,
    pub user_id: i64,
    pub tour_departure_id: i64,
    pub outbound_flight_id: i64,
    pub return_flight_id: Option<i64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BookingStatusUpdateRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct BookingResponse {
    pub id: i64,
    pub persons_count: i32,
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub created_at: NaiveDateTime,
    pub user_id: i64,
    pub tour_departure_id: i64,
    pub outbound_flight_id: i64,
    pub return_flight_id: Option<i64>,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        BookingResponse {
            id: b.id,
            persons_count: b.persons_count,
            total_price: b.total_price,
            status: b.status,
            created_at: b.created_at,
            user_id: b.user_id,
            tour_departure_id: b.tour_departure_id,
            outbound_flight_id: b.outbound_flight_id,
            return_flight_id: b.return_flight_id,
        }
    }
}

/// Optional filters for booking listings; absent means no constraint.
#[derive(Debug, Default)]
pub struct BookingFilter {
    pub user_id: Option<i64>,
    pub tour_departure_id: Option<i64>,
    pub status: Option<BookingStatus>,
    pub created_from: Option<NaiveDateTime>,
    pub created_to: Option<NaiveDateTime>,
    pub user_email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn counting_statuses() {
        assert!(BookingStatus::Pending.is_counting());
        assert!(BookingStatus::Confirmed.is_counting());
        assert!(!BookingStatus::Cancelled.is_counting());
    }

    #[test]
    fn seat_delta_matches_transition_table() {
        assert_eq!(seat_delta(BookingStatus::Pending, BookingStatus::Confirmed, 4), 0);
        assert_eq!(seat_delta(BookingStatus::Pending, BookingStatus::Cancelled, 4), -4);
        assert_eq!(seat_delta(BookingStatus::Confirmed, BookingStatus::Cancelled, 2), -2);
        assert_eq!(seat_delta(BookingStatus::Cancelled, BookingStatus::Pending, 3), 3);
        assert_eq!(seat_delta(BookingStatus::Cancelled, BookingStatus::Confirmed, 3), 3);
        assert_eq!(seat_delta(BookingStatus::Cancelled, BookingStatus::Cancelled, 3), 0);
    }

    #[test]
    fn total_price_to_the_cent() {
        let price = total_price(
            2,
            Decimal::from_str("450.50").unwrap(),
            Decimal::from_str("120.00").unwrap(),
            Some(Decimal::from_str("99.99").unwrap()),
        );
        assert_eq!(price, Decimal::from_str("1340.98").unwrap());
    }

    #[test]
    fn total_price_without_return_flight() {
        let price = total_price(3, Decimal::from(800), Decimal::from(100), None);
        assert_eq!(price, Decimal::from(2700));
    }

    // Random walk over the transition table keeps the simulated counter
    // equal to the sum of counting bookings.
    #[test]
    fn seat_delta_random_walk_preserves_ledger() {
        use rand::Rng;
        let statuses = [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
        ];
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let persons: i32 = rng.gen_range(1..=6);
            let mut status = BookingStatus::Pending;
            let mut reserved = persons;
            for _ in 0..50 {
                let next = statuses[rng.gen_range(0..statuses.len())];
                reserved += seat_delta(status, next, persons);
                status = next;
                let expected = if status.is_counting() { persons } else { 0 };
                assert_eq!(reserved, expected);
            }
        }
    }
}
