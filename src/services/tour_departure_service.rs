use crate::models::booking::BookingStatus;
use crate::models::flight::FlightGeo;
use crate::models::pagination::{offset, PageResponse};
use crate::models::tour::Tour;
use crate::models::tour_departure::{
    TourDeparture, TourDepartureCreateRequest, TourDepartureFilter, TourDepartureResponse,
    TourDepartureStatus, TourDepartureUpdateRequest,
};
use crate::models::user::UserRole;
use crate::services::capacity::{self, DEPARTURE_COLUMNS};
use crate::utils::error::{AppError, AppResult};
use sqlx::{MySql, MySqlConnection, MySqlPool, QueryBuilder};
use validator::Validate;

const TOUR_COLUMNS: &str = "id, title, description, duration_days, base_price, status, \
     is_active, base_city_id, manager_user_id";

pub struct TourDepartureService {
    pool: MySqlPool,
}

impl TourDepartureService {
    pub fn new(pool: MySqlPool) -> Self {
        TourDepartureService { pool }
    }

    pub async fn create(
        &self,
        caller_id: i64,
        caller_role: UserRole,
        request: TourDepartureCreateRequest,
    ) -> AppResult<TourDepartureResponse> {
        request
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        validate_dates_and_capacity(
            request.start_date,
            request.end_date,
            request.capacity_total,
            request.capacity_reserved.unwrap_or(0),
        )?;

        let mut tx = self.pool.begin().await?;

        let tour = require_tour(&mut tx, request.tour_id).await?;
        ensure_manages_tour(&tour, caller_id, caller_role)?;
        validate_price_override(request.price_override, &tour)?;

        if let Some(ref flight_ids) = request.flight_ids {
            ensure_flights_compatible(
                &mut tx,
                flight_ids,
                tour.base_city_id,
                request.start_date,
                request.end_date,
            )
            .await?;
        }

        let status = request.status.unwrap_or(TourDepartureStatus::Planned);
        let result = sqlx::query(
            "INSERT INTO tour_departures \
             (start_date, end_date, capacity_total, capacity_reserved, price_override, \
              status, tour_id) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.capacity_total)
        .bind(request.capacity_reserved.unwrap_or(0))
        .bind(request.price_override)
        .bind(status)
        .bind(request.tour_id)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_id() as i64;

        if let Some(ref flight_ids) = request.flight_ids {
            replace_flight_links(&mut tx, id, flight_ids).await?;
        }

        let departure = fetch_departure(&mut tx, id).await?;
        tx.commit().await?;
        Ok(departure.into())
    }

    pub async fn update(
        &self,
        id: i64,
        caller_id: i64,
        caller_role: UserRole,
        request: TourDepartureUpdateRequest,
    ) -> AppResult<TourDepartureResponse> {
        request
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let mut tx = self.pool.begin().await?;

        let current = capacity::lock_departure(&mut tx, id).await?;
        let current_tour = require_tour(&mut tx, current.tour_id).await?;
        ensure_manages_tour(&current_tour, caller_id, caller_role)?;

        let target_tour = if request.tour_id == current.tour_id {
            current_tour
        } else {
            let t = require_tour(&mut tx, request.tour_id).await?;
            ensure_manages_tour(&t, caller_id, caller_role)?;
            t
        };

        validate_price_override(request.price_override, &target_tour)?;

        let reserved = request.capacity_reserved.unwrap_or(current.capacity_reserved);
        validate_dates_and_capacity(
            request.start_date,
            request.end_date,
            request.capacity_total,
            reserved,
        )?;

        // Terminal statuses never regress.
        let requested_status = request.status.unwrap_or(current.status);
        if current.status.is_terminal() && requested_status != current.status {
            return Err(AppError::BadRequest(format!(
                "Tour departure with id={id} is {} and its status is final",
                current.status
            )));
        }
        let status = TourDeparture {
            capacity_total: request.capacity_total,
            capacity_reserved: reserved,
            status: requested_status,
            ..current.clone()
        }
        .synced_status();

        // A moved window or retargeted tour must not strand existing links.
        let checked_ids = match request.flight_ids {
            Some(ref flight_ids) => flight_ids.clone(),
            None => linked_flight_ids(&mut tx, id).await?,
        };
        ensure_flights_compatible(
            &mut tx,
            &checked_ids,
            target_tour.base_city_id,
            request.start_date,
            request.end_date,
        )
        .await?;

        sqlx::query(
            "UPDATE tour_departures SET start_date = ?, end_date = ?, capacity_total = ?, \
             capacity_reserved = ?, price_override = ?, status = ?, tour_id = ? WHERE id = ?",
        )
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.capacity_total)
        .bind(reserved)
        .bind(request.price_override)
        .bind(status)
        .bind(request.tour_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(ref flight_ids) = request.flight_ids {
            replace_flight_links(&mut tx, id, flight_ids).await?;
        }

        if status == TourDepartureStatus::Cancelled
            && current.status != TourDepartureStatus::Cancelled
        {
            cancel_open_bookings(&mut tx, id).await?;
        }

        let departure = fetch_departure(&mut tx, id).await?;
        tx.commit().await?;
        Ok(departure.into())
    }

    pub async fn delete(&self, id: i64, caller_id: i64, caller_role: UserRole) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let departure = capacity::lock_departure(&mut tx, id).await?;
        let tour = require_tour(&mut tx, departure.tour_id).await?;
        ensure_manages_tour(&tour, caller_id, caller_role)?;

        let bookings: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE tour_departure_id = ?")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if bookings > 0 {
            return Err(AppError::Conflict(format!(
                "Tour departure with id={id} has bookings and cannot be deleted"
            )));
        }

        sqlx::query("DELETE FROM flight_tour_departure WHERE tour_departure_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM tour_departures WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<TourDepartureResponse> {
        let departure = sqlx::query_as::<_, TourDeparture>(&format!(
            "SELECT {DEPARTURE_COLUMNS} FROM tour_departures WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tour departure with id={id} not found")))?;
        Ok(departure.into())
    }

    pub async fn list_all_paged(
        &self,
        filter: &TourDepartureFilter,
        page: u32,
        size: u32,
    ) -> AppResult<PageResponse<TourDepartureResponse>> {
        let mut count =
            QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM tour_departures WHERE 1=1");
        push_departure_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<MySql>::new(format!(
            "SELECT {DEPARTURE_COLUMNS} FROM tour_departures WHERE 1=1"
        ));
        push_departure_filters(&mut query, filter);
        query.push(" ORDER BY start_date ASC, id ASC LIMIT ");
        query.push_bind(size);
        query.push(" OFFSET ");
        query.push_bind(offset(page, size));

        let departures = query
            .build_query_as::<TourDeparture>()
            .fetch_all(&self.pool)
            .await?;

        Ok(PageResponse::new(
            page,
            size,
            total as u64,
            departures
                .into_iter()
                .map(TourDepartureResponse::from)
                .collect(),
        ))
    }

    /// Departures of tours managed by the caller.
    pub async fn list_my(&self, manager_id: i64) -> AppResult<Vec<TourDepartureResponse>> {
        let departures = sqlx::query_as::<_, TourDeparture>(
            "SELECT d.id, d.start_date, d.end_date, d.capacity_total, d.capacity_reserved, \
             d.price_override, d.status, d.tour_id \
             FROM tour_departures d JOIN tours t ON d.tour_id = t.id \
             WHERE t.manager_user_id = ? ORDER BY d.start_date ASC, d.id ASC",
        )
        .bind(manager_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(departures
            .into_iter()
            .map(TourDepartureResponse::from)
            .collect())
    }

    /// Discovery: departures a flight could serve. The tour's base city
    /// must be one of the flight's cities and the date windows must
    /// intersect.
    pub async fn list_for_flight(&self, flight_id: i64) -> AppResult<Vec<TourDepartureResponse>> {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM flights WHERE id = ?")
            .bind(flight_id)
            .fetch_one(&self.pool)
            .await?;
        if exists == 0 {
            return Err(AppError::NotFound(format!(
                "Flight with id={flight_id} not found"
            )));
        }
        let departures = sqlx::query_as::<_, TourDeparture>(
            "SELECT d.id, d.start_date, d.end_date, d.capacity_total, d.capacity_reserved, \
             d.price_override, d.status, d.tour_id \
             FROM tour_departures d \
             JOIN tours t ON d.tour_id = t.id \
             JOIN flights f ON f.id = ? \
             JOIN airports da ON f.departure_airport_id = da.id \
             JOIN airports aa ON f.arrival_airport_id = aa.id \
             WHERE t.base_city_id IN (da.city_id, aa.city_id) \
               AND DATE(f.depart_at) <= d.end_date \
               AND DATE(f.arrive_at) >= d.start_date \
             ORDER BY d.start_date ASC, d.id ASC",
        )
        .bind(flight_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(departures
            .into_iter()
            .map(TourDepartureResponse::from)
            .collect())
    }
}

fn validate_dates_and_capacity(
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
    total: i32,
    reserved: i32,
) -> AppResult<()> {
    if end < start {
        return Err(AppError::ValidationError(
            "endDate must not be before startDate".to_string(),
        ));
    }
    if total < 1 {
        return Err(AppError::ValidationError(
            "capacityTotal must be at least 1".to_string(),
        ));
    }
    if reserved < 0 || reserved > total {
        return Err(AppError::ValidationError(
            "capacityReserved must be between 0 and capacityTotal".to_string(),
        ));
    }
    Ok(())
}

fn validate_price_override(
    price_override: Option<rust_decimal::Decimal>,
    tour: &Tour,
) -> AppResult<()> {
    if let Some(price) = price_override {
        if price >= tour.base_price {
            return Err(AppError::ValidationError(format!(
                "priceOverride must be below the tour's base price {}",
                tour.base_price
            )));
        }
    }
    Ok(())
}

fn ensure_manages_tour(tour: &Tour, caller_id: i64, caller_role: UserRole) -> AppResult<()> {
    if caller_role == UserRole::Admin || tour.manager_user_id == Some(caller_id) {
        return Ok(());
    }
    Err(AppError::Forbidden(format!(
        "Tour with id={} is not managed by you",
        tour.id
    )))
}

fn push_departure_filters(qb: &mut QueryBuilder<'_, MySql>, filter: &TourDepartureFilter) {
    if let Some(tour_id) = filter.tour_id {
        qb.push(" AND tour_id = ").push_bind(tour_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(from) = filter.start_from {
        qb.push(" AND start_date >= ").push_bind(from);
    }
    if let Some(to) = filter.start_to {
        qb.push(" AND start_date <= ").push_bind(to);
    }
}

async fn require_tour(conn: &mut MySqlConnection, id: i64) -> AppResult<Tour> {
    sqlx::query_as::<_, Tour>(&format!("SELECT {TOUR_COLUMNS} FROM tours WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tour with id={id} not found")))
}

async fn fetch_departure(conn: &mut MySqlConnection, id: i64) -> AppResult<TourDeparture> {
    sqlx::query_as::<_, TourDeparture>(&format!(
        "SELECT {DEPARTURE_COLUMNS} FROM tour_departures WHERE id = ?"
    ))
    .bind(id)
    .fetch_one(&mut *conn)
    .await
    .map_err(Into::into)
}

/// Every linked flight must touch the tour's base city and overlap the
/// departure window.
async fn ensure_flights_compatible(
    conn: &mut MySqlConnection,
    flight_ids: &[i64],
    base_city_id: i64,
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
) -> AppResult<()> {
    for &flight_id in flight_ids {
        let flight = sqlx::query_as::<_, FlightGeo>(
            "SELECT f.id, f.flight_number, f.depart_at, f.arrive_at, \
             da.city_id AS departure_city_id, aa.city_id AS arrival_city_id \
             FROM flights f \
             JOIN airports da ON f.departure_airport_id = da.id \
             JOIN airports aa ON f.arrival_airport_id = aa.id \
             WHERE f.id = ?",
        )
        .bind(flight_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Flight with id={flight_id} not found")))?;

        if !flight.compatible_with(base_city_id, start, end) {
            return Err(AppError::FlightNotCompatible(format!(
                "Flight {} does not serve this departure's city and dates",
                flight.flight_number
            )));
        }
    }
    Ok(())
}

async fn linked_flight_ids(conn: &mut MySqlConnection, departure_id: i64) -> AppResult<Vec<i64>> {
    sqlx::query_scalar(
        "SELECT flight_id FROM flight_tour_departure WHERE tour_departure_id = ? ORDER BY flight_id",
    )
    .bind(departure_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(Into::into)
}

async fn replace_flight_links(
    conn: &mut MySqlConnection,
    departure_id: i64,
    flight_ids: &[i64],
) -> AppResult<()> {
    sqlx::query("DELETE FROM flight_tour_departure WHERE tour_departure_id = ?")
        .bind(departure_id)
        .execute(&mut *conn)
        .await?;
    for &flight_id in flight_ids {
        sqlx::query(
            "INSERT INTO flight_tour_departure (flight_id, tour_departure_id) VALUES (?, ?)",
        )
        .bind(flight_id)
        .bind(departure_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Cancelling a departure cancels its open bookings and zeroes the ledger.
async fn cancel_open_bookings(conn: &mut MySqlConnection, departure_id: i64) -> AppResult<()> {
    sqlx::query(
        "UPDATE bookings SET status = ? WHERE tour_departure_id = ? AND status IN (?, ?)",
    )
    .bind(BookingStatus::Cancelled)
    .bind(departure_id)
    .bind(BookingStatus::Pending)
    .bind(BookingStatus::Confirmed)
    .execute(&mut *conn)
    .await?;
    sqlx::query("UPDATE tour_departures SET capacity_reserved = 0 WHERE id = ?")
        .bind(departure_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
