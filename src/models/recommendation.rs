use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserSearch {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub persons_count: Option<i32>,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
    pub user_id: i64,
    pub destination_city_id: Option<i64>,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct UserSearchCreateRequest {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    #[validate(range(min = 1))]
    pub persons_count: Option<i32>,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
    pub destination_city_id: Option<i64>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct UserSearchCreateResponse {
    pub search_id: i64,
}

/// A departure joined with its tour, the shape the search-match predicate
/// and the recommendation card are built from.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecommendationCandidate {
    pub tour_departure_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub capacity_total: i32,
    pub capacity_reserved: i32,
    pub price_override: Option<Decimal>,
    pub tour_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub duration_days: i32,
    pub base_price: Decimal,
    pub base_city_id: i64,
    pub base_city_name: String,
}

impl RecommendationCandidate {
    pub fn price_per_person(&self) -> Decimal {
        self.price_override.unwrap_or(self.base_price)
    }

    /// The destination-city leg of the predicate needs the link table and
    /// is checked separately; everything here is self-contained: start
    /// date inside the searched window (only set bounds apply), enough
    /// free seats, and the total trip price inside the budget window.
    pub fn matches_search(&self, search: &UserSearch) -> bool {
        if let Some(from) = search.date_from {
            if self.start_date < from {
                return false;
            }
        }
        if let Some(to) = search.date_to {
            if self.start_date > to {
                return false;
            }
        }

        let persons = search.persons_count.unwrap_or(1);
        let available = (self.capacity_total - self.capacity_reserved).max(0);
        if available < persons {
            return false;
        }

        let total = self.price_per_person() * Decimal::from(persons);
        if let Some(min) = search.budget_min {
            if total < min {
                return false;
            }
        }
        if let Some(max) = search.budget_max {
            if total > max {
                return false;
            }
        }
        true
    }
}

/// What the recommendation engine returns for one search.
#[derive(Debug, Deserialize)]
pub struct EngineResponse {
    pub items: Vec<EngineItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineItem {
    pub tour_departure_id: i64,
    pub score: f64,
}

/// Recommendation card shown to the customer.
#[derive(Debug, Serialize, JsonSchema)]
pub struct RecommendedTourCard {
    pub recommendation_id: i64,
    pub score: Decimal,
    pub tour_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub duration_days: i32,
    pub base_city_id: i64,
    pub base_city_name: String,
    pub base_price: Decimal,
    pub tour_departure_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub capacity_total: i32,
    pub capacity_reserved: i32,
    pub price_override: Option<Decimal>,
    pub price_per_person: Decimal,
}

impl RecommendedTourCard {
    pub fn from_candidate(
        recommendation_id: i64,
        score: Decimal,
        candidate: RecommendationCandidate,
    ) -> Self {
        let price_per_person = candidate.price_per_person();
        RecommendedTourCard {
            recommendation_id,
            score,
            tour_id: candidate.tour_id,
            title: candidate.title,
            description: candidate.description,
            duration_days: candidate.duration_days,
            base_city_id: candidate.base_city_id,
            base_city_name: candidate.base_city_name,
            base_price: candidate.base_price,
            tour_departure_id: candidate.tour_departure_id,
            start_date: candidate.start_date,
            end_date: candidate.end_date,
            capacity_total: candidate.capacity_total,
            capacity_reserved: candidate.capacity_reserved,
            price_override: candidate.price_override,
            price_per_person,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn candidate(price_per_person: i64, free: i32) -> RecommendationCandidate {
        RecommendationCandidate {
            tour_departure_id: 1,
            start_date: "2026-07-01".parse().unwrap(),
            end_date: "2026-07-08".parse().unwrap(),
            capacity_total: 10,
            capacity_reserved: 10 - free,
            price_override: None,
            tour_id: 1,
            title: "City break".to_string(),
            description: None,
            duration_days: 7,
            base_price: Decimal::from(price_per_person),
            base_city_id: 1,
            base_city_name: "Riga".to_string(),
        }
    }

    fn search() -> UserSearch {
        UserSearch {
            id: 1,
            created_at: "2026-06-01T00:00:00".parse().unwrap(),
            date_from: None,
            date_to: None,
            persons_count: Some(2),
            budget_min: None,
            budget_max: Some(Decimal::from(2000)),
            user_id: 1,
            destination_city_id: None,
        }
    }

    // budget_max bounds the whole trip, not the per-person price
    #[test]
    fn budget_bound_is_total_trip_price() {
        let s = search();
        assert!(candidate(800, 5).matches_search(&s));
        assert!(!candidate(1100, 5).matches_search(&s));
        assert!(!candidate(1500, 5).matches_search(&s));
    }

    #[test]
    fn insufficient_seats_fail() {
        let s = search();
        assert!(!candidate(800, 1).matches_search(&s));
    }

    #[test]
    fn only_set_date_bounds_apply() {
        let mut s = search();
        s.date_from = Some("2026-07-02".parse().unwrap());
        assert!(!candidate(800, 5).matches_search(&s));
        s.date_from = Some("2026-06-20".parse().unwrap());
        s.date_to = Some("2026-06-30".parse().unwrap());
        assert!(!candidate(800, 5).matches_search(&s));
        s.date_to = Some("2026-07-01".parse().unwrap());
        assert!(candidate(800, 5).matches_search(&s));
    }

    #[test]
    fn price_override_takes_precedence() {
        let mut c = candidate(1500, 5);
        c.price_override = Some(Decimal::from_str("950.00").unwrap());
        assert!(c.matches_search(&search()));
    }
}
