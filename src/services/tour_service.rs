use crate::models::pagination::{offset, PageResponse};
use crate::models::tour::{
    Tour, TourCreateRequest, TourFilter, TourResponse, TourStatus, TourUpdateRequest,
};
use crate::utils::error::{is_foreign_key_violation, AppError, AppResult};
use sqlx::{MySql, MySqlPool, QueryBuilder};
use validator::Validate;

const TOUR_COLUMNS: &str = "id, title, description, duration_days, base_price, status, \
     is_active, base_city_id, manager_user_id";

pub struct TourService {
    pool: MySqlPool,
}

impl TourService {
    pub fn new(pool: MySqlPool) -> Self {
        TourService { pool }
    }

    pub async fn create(&self, request: TourCreateRequest) -> AppResult<TourResponse> {
        request
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        if let Some(manager_id) = request.manager_user_id {
            self.ensure_active_manager(manager_id).await?;
        }

        let status = request.status.unwrap_or(TourStatus::Draft);
        // ARCHIVED tours are never active.
        let active = request.active.unwrap_or(true) && status != TourStatus::Archived;
        let result = sqlx::query(
            "INSERT INTO tours (title, description, duration_days, base_price, status, \
             is_active, base_city_id, manager_user_id) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.duration_days)
        .bind(request.base_price)
        .bind(status)
        .bind(active)
        .bind(request.base_city_id)
        .bind(request.manager_user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::NotFound("Base city or manager user not found".to_string())
            } else {
                e.into()
            }
        })?;

        self.fetch(result.last_insert_id() as i64).await
    }

    pub async fn update(&self, id: i64, request: TourUpdateRequest) -> AppResult<TourResponse> {
        request
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let current = self.require(id).await?;
        if request.manager_user_id != current.manager_user_id {
            if let Some(manager_id) = request.manager_user_id {
                self.ensure_active_manager(manager_id).await?;
            }
        }
        let active = request.active && request.status != TourStatus::Archived;

        sqlx::query(
            "UPDATE tours SET title = ?, description = ?, duration_days = ?, base_price = ?, \
             status = ?, is_active = ?, base_city_id = ?, manager_user_id = ? WHERE id = ?",
        )
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.duration_days)
        .bind(request.base_price)
        .bind(request.status)
        .bind(active)
        .bind(request.base_city_id)
        .bind(request.manager_user_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::NotFound("Base city or manager user not found".to_string())
            } else {
                e.into()
            }
        })?;

        self.fetch(id).await
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let departures: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM tour_departures WHERE tour_id = ?")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if departures > 0 {
            return Err(AppError::Conflict(format!(
                "Tour with id={id} has departures and cannot be deleted"
            )));
        }
        let result = sqlx::query("DELETE FROM tours WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Tour with id={id} not found")));
        }
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<TourResponse> {
        self.fetch(id).await
    }

    /// Catalog listing for customers: PUBLISHED and active only.
    pub async fn list_public(
        &self,
        page: u32,
        size: u32,
    ) -> AppResult<PageResponse<TourResponse>> {
        let filter = TourFilter {
            status: Some(TourStatus::Published),
            active: Some(true),
            ..Default::default()
        };
        self.list_paged(&filter, page, size).await
    }

    pub async fn list_paged(
        &self,
        filter: &TourFilter,
        page: u32,
        size: u32,
    ) -> AppResult<PageResponse<TourResponse>> {
        let mut count = QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM tours WHERE 1=1");
        push_tour_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query =
            QueryBuilder::<MySql>::new(format!("SELECT {TOUR_COLUMNS} FROM tours WHERE 1=1"));
        push_tour_filters(&mut query, filter);
        query.push(" ORDER BY title ASC, id ASC LIMIT ");
        query.push_bind(size);
        query.push(" OFFSET ");
        query.push_bind(offset(page, size));

        let tours = query.build_query_as::<Tour>().fetch_all(&self.pool).await?;

        Ok(PageResponse::new(
            page,
            size,
            total as u64,
            tours.into_iter().map(TourResponse::from).collect(),
        ))
    }

    /// Tours managed by the caller.
    pub async fn list_my(&self, manager_id: i64) -> AppResult<Vec<TourResponse>> {
        let tours = sqlx::query_as::<_, Tour>(&format!(
            "SELECT {TOUR_COLUMNS} FROM tours WHERE manager_user_id = ? ORDER BY title ASC, id ASC"
        ))
        .bind(manager_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tours.into_iter().map(TourResponse::from).collect())
    }

    async fn ensure_active_manager(&self, user_id: i64) -> AppResult<()> {
        let row: Option<(String, bool)> =
            sqlx::query_as("SELECT role, is_active FROM app_users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        match row {
            None => Err(AppError::NotFound(format!(
                "User with id={user_id} not found"
            ))),
            Some((role, active)) if role != "MANAGER" || !active => {
                Err(AppError::BadRequest(format!(
                    "User with id={user_id} is not an active manager"
                )))
            }
            Some(_) => Ok(()),
        }
    }

    async fn require(&self, id: i64) -> AppResult<Tour> {
        sqlx::query_as::<_, Tour>(&format!("SELECT {TOUR_COLUMNS} FROM tours WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tour with id={id} not found")))
    }

    async fn fetch(&self, id: i64) -> AppResult<TourResponse> {
        Ok(self.require(id).await?.into())
    }
}

fn push_tour_filters(qb: &mut QueryBuilder<'_, MySql>, filter: &TourFilter) {
    if let Some(ref title) = filter.title {
        qb.push(" AND title LIKE ").push_bind(format!("%{title}%"));
    }
    if let Some(city_id) = filter.base_city_id {
        qb.push(" AND base_city_id = ").push_bind(city_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(active) = filter.active {
        qb.push(" AND is_active = ").push_bind(active);
    }
    if let Some(manager_id) = filter.manager_user_id {
        qb.push(" AND manager_user_id = ").push_bind(manager_id);
    }
}
