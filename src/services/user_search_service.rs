use crate::models::recommendation::{
    UserSearch, UserSearchCreateRequest, UserSearchCreateResponse,
};
use crate::utils::error::{AppError, AppResult};
use sqlx::MySqlPool;
use validator::Validate;

pub struct UserSearchService {
    pool: MySqlPool,
}

impl UserSearchService {
    pub fn new(pool: MySqlPool) -> Self {
        UserSearchService { pool }
    }

    pub async fn create(
        &self,
        user_id: i64,
        request: UserSearchCreateRequest,
    ) -> AppResult<UserSearchCreateResponse> {
        request
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        if let (Some(from), Some(to)) = (request.date_from, request.date_to) {
            if to < from {
                return Err(AppError::ValidationError(
                    "dateTo must not be before dateFrom".to_string(),
                ));
            }
        }
        if let (Some(min), Some(max)) = (request.budget_min, request.budget_max) {
            if max < min {
                return Err(AppError::ValidationError(
                    "budgetMax must not be below budgetMin".to_string(),
                ));
            }
        }
        if let Some(city_id) = request.destination_city_id {
            let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cities WHERE id = ?")
                .bind(city_id)
                .fetch_one(&self.pool)
                .await?;
            if exists == 0 {
                return Err(AppError::NotFound(format!(
                    "City with id={city_id} not found"
                )));
            }
        }

        let result = sqlx::query(
            "INSERT INTO user_searches (date_from, date_to, persons_count, budget_min, \
             budget_max, user_id, destination_city_id) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(request.date_from)
        .bind(request.date_to)
        .bind(request.persons_count)
        .bind(request.budget_min)
        .bind(request.budget_max)
        .bind(user_id)
        .bind(request.destination_city_id)
        .execute(&self.pool)
        .await?;

        Ok(UserSearchCreateResponse {
            search_id: result.last_insert_id() as i64,
        })
    }

    /// Loads a search owned by the caller; a search belonging to anyone
    /// else looks like a missing one.
    pub async fn find_owned(&self, search_id: i64, user_id: i64) -> AppResult<UserSearch> {
        sqlx::query_as::<_, UserSearch>(
            "SELECT id, created_at, date_from, date_to, persons_count, budget_min, budget_max, \
             user_id, destination_city_id FROM user_searches WHERE id = ? AND user_id = ?",
        )
        .bind(search_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Search with id={search_id} not found")))
    }
}
