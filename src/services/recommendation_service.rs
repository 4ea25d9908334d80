use crate::models::pagination::{offset, PageResponse};
use crate::models::recommendation::{
    RecommendationCandidate, RecommendedTourCard, UserSearch,
};
use crate::services::recommendation_engine::RecommendationEngineClient;
use crate::services::user_search_service::UserSearchService;
use crate::utils::error::{is_unique_violation, AppError, AppResult};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::{MySqlConnection, MySqlPool};

const GENERATION_LIMIT: u32 = 50;

#[derive(sqlx::FromRow)]
struct CardRow {
    recommendation_id: i64,
    score: Decimal,
    #[sqlx(flatten)]
    candidate: RecommendationCandidate,
}

pub struct RecommendationService {
    pool: MySqlPool,
    searches: UserSearchService,
    engine: RecommendationEngineClient,
}

impl RecommendationService {
    pub fn new(pool: MySqlPool, engine: RecommendationEngineClient) -> Self {
        RecommendationService {
            searches: UserSearchService::new(pool.clone()),
            pool,
            engine,
        }
    }

    /// Recommendations for an owned search, generating them on first
    /// access. An unreachable engine degrades to an empty page.
    pub async fn fetch_my_paged(
        &self,
        search_id: i64,
        user_id: i64,
        page: u32,
        size: u32,
    ) -> AppResult<PageResponse<RecommendedTourCard>> {
        let search = self.searches.find_owned(search_id, user_id).await?;

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM recommendations WHERE user_search_id = ?")
                .bind(search_id)
                .fetch_one(&self.pool)
                .await?;
        if existing == 0 {
            self.generate(&search).await?;
        }

        // One transaction so the page and its shown flags move together.
        let mut tx = self.pool.begin().await?;
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM recommendations WHERE user_search_id = ?")
                .bind(search_id)
                .fetch_one(&mut *tx)
                .await?;

        let rows = sqlx::query_as::<_, CardRow>(
            "SELECT r.id AS recommendation_id, r.score, d.id AS tour_departure_id, \
             d.start_date, d.end_date, d.capacity_total, d.capacity_reserved, \
             d.price_override, t.id AS tour_id, t.title, t.description, t.duration_days, \
             t.base_price, t.base_city_id, c.name AS base_city_name \
             FROM recommendations r \
             JOIN tour_departures d ON r.tour_departure_id = d.id \
             JOIN tours t ON d.tour_id = t.id \
             JOIN cities c ON t.base_city_id = c.id \
             WHERE r.user_search_id = ? \
             ORDER BY r.score DESC, r.created_at DESC LIMIT ? OFFSET ?",
        )
        .bind(search_id)
        .bind(size)
        .bind(offset(page, size))
        .fetch_all(&mut *tx)
        .await?;
        let cards: Vec<RecommendedTourCard> = rows
            .into_iter()
            .map(|row| {
                RecommendedTourCard::from_candidate(row.recommendation_id, row.score, row.candidate)
            })
            .collect();

        if !cards.is_empty() {
            let mut mark = sqlx::QueryBuilder::<sqlx::MySql>::new(
                "UPDATE recommendations SET is_shown = TRUE WHERE id IN (",
            );
            let mut ids = mark.separated(", ");
            for card in &cards {
                ids.push_bind(card.recommendation_id);
            }
            mark.push(")");
            mark.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;

        Ok(PageResponse::new(page, size, total as u64, cards))
    }

    /// Flips the selected flag on a recommendation the caller owns through
    /// its search. Anything else reads as missing.
    pub async fn mark_selected(&self, id: i64, user_id: i64) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE recommendations r JOIN user_searches s ON r.user_search_id = s.id \
             SET r.is_selected = TRUE WHERE r.id = ? AND s.user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Recommendation with id={id} not found"
            )));
        }
        Ok(())
    }

    /// Writes the whole recommendation set in one transaction so a
    /// mid-generation error never leaves a partial set behind.
    async fn generate(&self, search: &UserSearch) -> AppResult<()> {
        let items = match self.engine.generate(search.id, GENERATION_LIMIT).await {
            Some(items) => items,
            None => return Ok(()),
        };

        let mut tx = self.pool.begin().await?;
        for item in items {
            let candidate = load_candidate(&mut tx, item.tour_departure_id).await?;
            let candidate = match candidate {
                Some(c) => c,
                None => continue,
            };
            if !candidate.matches_search(search) {
                continue;
            }
            if let Some(city_id) = search.destination_city_id {
                if !reaches_city(&mut tx, &candidate, city_id).await? {
                    continue;
                }
            }

            let score = Decimal::from_f64(item.score)
                .unwrap_or_default()
                .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero);
            let inserted = sqlx::query(
                "INSERT INTO recommendations (score, is_shown, is_selected, user_search_id, \
                 tour_departure_id) VALUES (?, FALSE, FALSE, ?, ?)",
            )
            .bind(score)
            .bind(search.id)
            .bind(candidate.tour_departure_id)
            .execute(&mut *tx)
            .await;
            match inserted {
                Ok(_) => {}
                // The engine may repeat a departure; keep the first score.
                Err(e) if is_unique_violation(&e) => {}
                Err(e) => return Err(e.into()),
            }
        }
        tx.commit().await?;
        Ok(())
    }
}

async fn load_candidate(
    conn: &mut MySqlConnection,
    departure_id: i64,
) -> AppResult<Option<RecommendationCandidate>> {
    sqlx::query_as::<_, RecommendationCandidate>(
        "SELECT d.id AS tour_departure_id, d.start_date, d.end_date, d.capacity_total, \
         d.capacity_reserved, d.price_override, t.id AS tour_id, t.title, t.description, \
         t.duration_days, t.base_price, t.base_city_id, c.name AS base_city_name \
         FROM tour_departures d \
         JOIN tours t ON d.tour_id = t.id \
         JOIN cities c ON t.base_city_id = c.id \
         WHERE d.id = ?",
    )
    .bind(departure_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(Into::into)
}

/// Destination match: the tour is based in the city, or a linked
/// flight arrives there.
async fn reaches_city(
    conn: &mut MySqlConnection,
    candidate: &RecommendationCandidate,
    city_id: i64,
) -> AppResult<bool> {
    if candidate.base_city_id == city_id {
        return Ok(true);
    }
    let linked: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM flight_tour_departure l \
         JOIN flights f ON l.flight_id = f.id \
         JOIN airports aa ON f.arrival_airport_id = aa.id \
         WHERE l.tour_departure_id = ? AND aa.city_id = ?",
    )
    .bind(candidate.tour_departure_id)
    .bind(city_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(linked > 0)
}
