use crate::models::city::{City, CityCreateRequest, CityResponse};
use crate::utils::error::{is_foreign_key_violation, is_unique_violation, AppError, AppResult};
use sqlx::MySqlPool;
use validator::Validate;

pub struct CityService {
    pool: MySqlPool,
}

impl CityService {
    pub fn new(pool: MySqlPool) -> Self {
        CityService { pool }
    }

    pub async fn create(&self, request: CityCreateRequest) -> AppResult<CityResponse> {
        request
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let result = sqlx::query("INSERT INTO cities (name, country, timezone) VALUES (?, ?, ?)")
            .bind(&request.name)
            .bind(&request.country)
            .bind(&request.timezone)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(format!(
                        "City {} ({}) already exists",
                        request.name, request.country
                    ))
                } else {
                    e.into()
                }
            })?;

        self.get_by_id(result.last_insert_id() as i64).await
    }

    pub async fn update(&self, id: i64, request: CityCreateRequest) -> AppResult<CityResponse> {
        request
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        self.get_by_id(id).await?;

        sqlx::query("UPDATE cities SET name = ?, country = ?, timezone = ? WHERE id = ?")
            .bind(&request.name)
            .bind(&request.country)
            .bind(&request.timezone)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(format!(
                        "City {} ({}) already exists",
                        request.name, request.country
                    ))
                } else {
                    e.into()
                }
            })?;

        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM cities WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await;
        match result {
            Ok(r) if r.rows_affected() == 0 => {
                Err(AppError::NotFound(format!("City with id={id} not found")))
            }
            Ok(_) => Ok(()),
            Err(e) if is_foreign_key_violation(&e) => Err(AppError::Conflict(format!(
                "City with id={id} is still referenced and cannot be deleted"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<CityResponse> {
        let city = sqlx::query_as::<_, City>(
            "SELECT id, name, country, timezone FROM cities WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("City with id={id} not found")))?;
        Ok(city.into())
    }

    pub async fn list_all(&self) -> AppResult<Vec<CityResponse>> {
        let cities = sqlx::query_as::<_, City>(
            "SELECT id, name, country, timezone FROM cities ORDER BY country ASC, name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(cities.into_iter().map(CityResponse::from).collect())
    }
}
