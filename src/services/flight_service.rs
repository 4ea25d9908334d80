use crate::models::flight::{
    Flight, FlightCreateRequest, FlightFilter, FlightGeo, FlightResponse, FlightStatus,
};
use crate::models::pagination::{offset, PageResponse};
use crate::utils::error::{is_foreign_key_violation, is_unique_violation, AppError, AppResult};
use sqlx::{MySql, MySqlConnection, MySqlPool, QueryBuilder};
use validator::Validate;

const FLIGHT_COLUMNS: &str = "id, flight_number, carrier, depart_at, arrive_at, status, \
     base_price, departure_airport_id, arrival_airport_id";

pub struct FlightService {
    pool: MySqlPool,
}

impl FlightService {
    pub fn new(pool: MySqlPool) -> Self {
        FlightService { pool }
    }

    pub async fn create(&self, request: FlightCreateRequest) -> AppResult<FlightResponse> {
        request
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        validate_times_and_airports(&request)?;

        let status = request.status.unwrap_or(FlightStatus::Scheduled);
        let result = sqlx::query(
            "INSERT INTO flights (flight_number, carrier, depart_at, arrive_at, status, \
             base_price, departure_airport_id, arrival_airport_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.flight_number)
        .bind(&request.carrier)
        .bind(request.depart_at)
        .bind(request.arrive_at)
        .bind(status)
        .bind(request.base_price)
        .bind(request.departure_airport_id)
        .bind(request.arrival_airport_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!(
                    "Flight number {} already exists",
                    request.flight_number
                ))
            } else if is_foreign_key_violation(&e) {
                AppError::NotFound("Departure or arrival airport not found".to_string())
            } else {
                e.into()
            }
        })?;

        self.fetch(result.last_insert_id() as i64).await
    }

    pub async fn update(&self, id: i64, request: FlightCreateRequest) -> AppResult<FlightResponse> {
        request
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        validate_times_and_airports(&request)?;

        let mut tx = self.pool.begin().await?;

        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM flights WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if exists == 0 {
            return Err(AppError::NotFound(format!("Flight with id={id} not found")));
        }

        let status = request.status.unwrap_or(FlightStatus::Scheduled);
        sqlx::query(
            "UPDATE flights SET flight_number = ?, carrier = ?, depart_at = ?, arrive_at = ?, \
             status = ?, base_price = ?, departure_airport_id = ?, arrival_airport_id = ? \
             WHERE id = ?",
        )
        .bind(&request.flight_number)
        .bind(&request.carrier)
        .bind(request.depart_at)
        .bind(request.arrive_at)
        .bind(status)
        .bind(request.base_price)
        .bind(request.departure_airport_id)
        .bind(request.arrival_airport_id)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!(
                    "Flight number {} already exists",
                    request.flight_number
                ))
            } else if is_foreign_key_violation(&e) {
                AppError::NotFound("Departure or arrival airport not found".to_string())
            } else {
                e.into()
            }
        })?;

        revalidate_links(&mut tx, id).await?;
        tx.commit().await?;

        self.fetch(id).await
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let bookings: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings WHERE outbound_flight_id = ? OR return_flight_id = ?",
        )
        .bind(id)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if bookings > 0 {
            return Err(AppError::Conflict(format!(
                "Flight with id={id} has bookings and cannot be deleted"
            )));
        }

        sqlx::query("DELETE FROM flight_tour_departure WHERE flight_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM flights WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Flight with id={id} not found")));
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<FlightResponse> {
        self.fetch(id).await
    }

    pub async fn find_by_flight_number(&self, flight_number: &str) -> AppResult<FlightResponse> {
        let flight = sqlx::query_as::<_, Flight>(&format!(
            "SELECT {FLIGHT_COLUMNS} FROM flights WHERE flight_number = ?"
        ))
        .bind(flight_number)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Flight with number {flight_number} not found"))
        })?;
        Ok(flight.into())
    }

    pub async fn list_paged(
        &self,
        filter: &FlightFilter,
        page: u32,
        size: u32,
    ) -> AppResult<PageResponse<FlightResponse>> {
        let mut count = QueryBuilder::<MySql>::new(
            "SELECT COUNT(*) FROM flights f \
             JOIN airports da ON f.departure_airport_id = da.id \
             JOIN airports aa ON f.arrival_airport_id = aa.id WHERE 1=1",
        );
        push_flight_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<MySql>::new(
            "SELECT f.id, f.flight_number, f.carrier, f.depart_at, f.arrive_at, f.status, \
             f.base_price, f.departure_airport_id, f.arrival_airport_id \
             FROM flights f \
             JOIN airports da ON f.departure_airport_id = da.id \
             JOIN airports aa ON f.arrival_airport_id = aa.id WHERE 1=1",
        );
        push_flight_filters(&mut query, filter);
        query.push(" ORDER BY f.depart_at ASC, f.id ASC LIMIT ");
        query.push_bind(size);
        query.push(" OFFSET ");
        query.push_bind(offset(page, size));

        let flights = query
            .build_query_as::<Flight>()
            .fetch_all(&self.pool)
            .await?;

        Ok(PageResponse::new(
            page,
            size,
            total as u64,
            flights.into_iter().map(FlightResponse::from).collect(),
        ))
    }

    /// Links a flight to a departure after the compatibility check: the
    /// flight must touch the tour's base city and overlap the window.
    pub async fn add_departure_link(&self, flight_id: i64, departure_id: i64) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let flight = require_flight_geo(&mut tx, flight_id).await?;

        let window = sqlx::query_as::<_, DepartureWindow>(
            "SELECT d.start_date, d.end_date, t.base_city_id \
             FROM tour_departures d JOIN tours t ON d.tour_id = t.id WHERE d.id = ?",
        )
        .bind(departure_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Tour departure with id={departure_id} not found"))
        })?;

        if !flight.compatible_with(window.base_city_id, window.start_date, window.end_date) {
            return Err(AppError::FlightNotCompatible(format!(
                "Flight {} does not serve this departure's city and dates",
                flight.flight_number
            )));
        }

        let result = sqlx::query(
            "INSERT INTO flight_tour_departure (flight_id, tour_departure_id) VALUES (?, ?)",
        )
        .bind(flight_id)
        .bind(departure_id)
        .execute(&mut *tx)
        .await;
        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(AppError::Conflict(format!(
                    "Flight id={flight_id} is already linked to tour departure id={departure_id}"
                )))
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn remove_departure_link(&self, flight_id: i64, departure_id: i64) -> AppResult<()> {
        let result = sqlx::query(
            "DELETE FROM flight_tour_departure WHERE flight_id = ? AND tour_departure_id = ?",
        )
        .bind(flight_id)
        .bind(departure_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Flight id={flight_id} is not linked to tour departure id={departure_id}"
            )));
        }
        Ok(())
    }

    /// Discovery: flights that could serve a departure. Same predicate as
    /// link validation, derived read-only.
    pub async fn flights_for_departure(&self, departure_id: i64) -> AppResult<Vec<FlightResponse>> {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tour_departures WHERE id = ?")
            .bind(departure_id)
            .fetch_one(&self.pool)
            .await?;
        if exists == 0 {
            return Err(AppError::NotFound(format!(
                "Tour departure with id={departure_id} not found"
            )));
        }
        let flights = sqlx::query_as::<_, Flight>(
            "SELECT f.id, f.flight_number, f.carrier, f.depart_at, f.arrive_at, f.status, \
             f.base_price, f.departure_airport_id, f.arrival_airport_id \
             FROM flights f \
             JOIN airports da ON f.departure_airport_id = da.id \
             JOIN airports aa ON f.arrival_airport_id = aa.id \
             JOIN tour_departures d ON d.id = ? \
             JOIN tours t ON d.tour_id = t.id \
             WHERE t.base_city_id IN (da.city_id, aa.city_id) \
               AND DATE(f.depart_at) <= d.end_date \
               AND DATE(f.arrive_at) >= d.start_date \
             ORDER BY f.depart_at ASC, f.id ASC",
        )
        .bind(departure_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(flights.into_iter().map(FlightResponse::from).collect())
    }

    /// Flights that depart from or arrive at a city.
    pub async fn list_for_city(&self, city_id: i64) -> AppResult<Vec<FlightResponse>> {
        let flights = sqlx::query_as::<_, Flight>(
            "SELECT f.id, f.flight_number, f.carrier, f.depart_at, f.arrive_at, f.status, \
             f.base_price, f.departure_airport_id, f.arrival_airport_id \
             FROM flights f \
             JOIN airports da ON f.departure_airport_id = da.id \
             JOIN airports aa ON f.arrival_airport_id = aa.id \
             WHERE ? IN (da.city_id, aa.city_id) \
             ORDER BY f.depart_at ASC, f.id ASC",
        )
        .bind(city_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(flights.into_iter().map(FlightResponse::from).collect())
    }

    async fn fetch(&self, id: i64) -> AppResult<FlightResponse> {
        let flight = sqlx::query_as::<_, Flight>(&format!(
            "SELECT {FLIGHT_COLUMNS} FROM flights WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Flight with id={id} not found")))?;
        Ok(flight.into())
    }
}

fn validate_times_and_airports(request: &FlightCreateRequest) -> AppResult<()> {
    if request.arrive_at <= request.depart_at {
        return Err(AppError::ValidationError(
            "arriveAt must be after departAt".to_string(),
        ));
    }
    if request.departure_airport_id == request.arrival_airport_id {
        return Err(AppError::ValidationError(
            "departureAirport and arrivalAirport must differ".to_string(),
        ));
    }
    Ok(())
}

/// A flight update may move the flight away from departures it is linked
/// to; every existing link must still pass the compatibility predicate.
async fn revalidate_links(conn: &mut MySqlConnection, flight_id: i64) -> AppResult<()> {
    let flight = require_flight_geo(&mut *conn, flight_id).await?;
    let windows = sqlx::query_as::<_, DepartureWindow>(
        "SELECT d.start_date, d.end_date, t.base_city_id \
         FROM flight_tour_departure l \
         JOIN tour_departures d ON l.tour_departure_id = d.id \
         JOIN tours t ON d.tour_id = t.id \
         WHERE l.flight_id = ?",
    )
    .bind(flight_id)
    .fetch_all(&mut *conn)
    .await?;
    for window in &windows {
        if !flight.compatible_with(window.base_city_id, window.start_date, window.end_date) {
            return Err(AppError::FlightNotCompatible(format!(
                "Flight {} no longer serves a linked departure's city and dates",
                flight.flight_number
            )));
        }
    }
    Ok(())
}

#[derive(sqlx::FromRow)]
struct DepartureWindow {
    start_date: chrono::NaiveDate,
    end_date: chrono::NaiveDate,
    base_city_id: i64,
}

fn push_flight_filters(qb: &mut QueryBuilder<'_, MySql>, filter: &FlightFilter) {
    if let Some(ref number) = filter.flight_number {
        qb.push(" AND f.flight_number = ").push_bind(number.clone());
    }
    if let Some(ref name) = filter.departure_airport_name {
        qb.push(" AND da.name LIKE ")
            .push_bind(format!("%{name}%"));
    }
    if let Some(ref name) = filter.arrival_airport_name {
        qb.push(" AND aa.name LIKE ")
            .push_bind(format!("%{name}%"));
    }
}

async fn require_flight_geo(conn: &mut MySqlConnection, id: i64) -> AppResult<FlightGeo> {
    sqlx::query_as::<_, FlightGeo>(
        "SELECT f.id, f.flight_number, f.depart_at, f.arrive_at, \
         da.city_id AS departure_city_id, aa.city_id AS arrival_city_id \
         FROM flights f \
         JOIN airports da ON f.departure_airport_id = da.id \
         JOIN airports aa ON f.arrival_airport_id = aa.id \
         WHERE f.id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Flight with id={id} not found")))
}
