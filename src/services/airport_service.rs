use crate::models::airport::{Airport, AirportCreateRequest, AirportResponse};
use crate::utils::error::{is_foreign_key_violation, is_unique_violation, AppError, AppResult};
use sqlx::MySqlPool;
use validator::Validate;

pub struct AirportService {
    pool: MySqlPool,
}

impl AirportService {
    pub fn new(pool: MySqlPool) -> Self {
        AirportService { pool }
    }

    pub async fn create(&self, request: AirportCreateRequest) -> AppResult<AirportResponse> {
        request
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let iata = request.iata_code.to_uppercase();
        let result = sqlx::query("INSERT INTO airports (iata_code, name, city_id) VALUES (?, ?, ?)")
            .bind(&iata)
            .bind(&request.name)
            .bind(request.city_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(format!("Airport {iata} already exists"))
                } else if is_foreign_key_violation(&e) {
                    AppError::NotFound(format!("City with id={} not found", request.city_id))
                } else {
                    e.into()
                }
            })?;

        self.get_by_id(result.last_insert_id() as i64).await
    }

    pub async fn update(&self, id: i64, request: AirportCreateRequest) -> AppResult<AirportResponse> {
        request
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        self.get_by_id(id).await?;

        let iata = request.iata_code.to_uppercase();
        sqlx::query("UPDATE airports SET iata_code = ?, name = ?, city_id = ? WHERE id = ?")
            .bind(&iata)
            .bind(&request.name)
            .bind(request.city_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(format!("Airport {iata} already exists"))
                } else if is_foreign_key_violation(&e) {
                    AppError::NotFound(format!("City with id={} not found", request.city_id))
                } else {
                    e.into()
                }
            })?;

        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM airports WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await;
        match result {
            Ok(r) if r.rows_affected() == 0 => {
                Err(AppError::NotFound(format!("Airport with id={id} not found")))
            }
            Ok(_) => Ok(()),
            Err(e) if is_foreign_key_violation(&e) => Err(AppError::Conflict(format!(
                "Airport with id={id} is still referenced and cannot be deleted"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<AirportResponse> {
        let airport = sqlx::query_as::<_, Airport>(
            "SELECT id, iata_code, name, city_id FROM airports WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Airport with id={id} not found")))?;
        Ok(airport.into())
    }

    pub async fn list_all(&self) -> AppResult<Vec<AirportResponse>> {
        let airports = sqlx::query_as::<_, Airport>(
            "SELECT id, iata_code, name, city_id FROM airports ORDER BY iata_code ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(airports.into_iter().map(AirportResponse::from).collect())
    }

    pub async fn list_for_city(&self, city_id: i64) -> AppResult<Vec<AirportResponse>> {
        let airports = sqlx::query_as::<_, Airport>(
            "SELECT id, iata_code, name, city_id FROM airports WHERE city_id = ? \
             ORDER BY iata_code ASC",
        )
        .bind(city_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(airports.into_iter().map(AirportResponse::from).collect())
    }
}
