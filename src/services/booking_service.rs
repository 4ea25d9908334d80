use crate::models::booking::{
    seat_delta, total_price, Booking, BookingCreateRequest, BookingFilter, BookingResponse,
    BookingStatus, BookingStatusUpdateRequest, BookingUpdateRequest,
};
use crate::models::flight::Flight;
use crate::models::pagination::{offset, PageResponse};
use crate::models::tour_departure::TourDeparture;
use crate::services::capacity;
use crate::utils::error::{is_foreign_key_violation, AppError, AppResult};
use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use sqlx::{MySql, MySqlConnection, MySqlPool, QueryBuilder};
use validator::Validate;

const BOOKING_COLUMNS: &str = "id, persons_count, total_price, status, created_at, \
     user_id, tour_departure_id, outbound_flight_id, return_flight_id";

pub struct BookingService {
    pool: MySqlPool,
}

impl BookingService {
    pub fn new(pool: MySqlPool) -> Self {
        BookingService { pool }
    }

    /// Creates a PENDING booking, reserving seats atomically.
    pub async fn create(
        &self,
        user_id: i64,
        request: BookingCreateRequest,
    ) -> AppResult<BookingResponse> {
        request
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let mut tx = self.pool.begin().await?;
        let today = today();

        let mut departure = capacity::lock_departure(&mut tx, request.tour_departure_id).await?;

        let outbound = require_flight(&mut tx, request.outbound_flight_id, "Outbound").await?;
        ensure_flight_linked(&mut tx, &outbound, departure.id, "Outbound").await?;

        let mut return_flight = None;
        if let Some(return_id) = request.return_flight_id {
            if return_id == outbound.id {
                return Err(AppError::ReturnEqualsOutbound(format!(
                    "Flight id={return_id} cannot be both outbound and return"
                )));
            }
            let ret = require_flight(&mut tx, return_id, "Return").await?;
            ensure_flight_linked(&mut tx, &ret, departure.id, "Return").await?;
            return_flight = Some(ret);
        }

        let per_person = price_per_person(&mut tx, &departure).await?;
        let price = total_price(
            request.persons_count,
            per_person,
            outbound.base_price,
            return_flight.as_ref().map(|f| f.base_price),
        );

        capacity::reserve(&mut tx, &mut departure, request.persons_count, today).await?;

        let result = sqlx::query(
            "INSERT INTO bookings \
             (persons_count, total_price, status, user_id, tour_departure_id, \
              outbound_flight_id, return_flight_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(request.persons_count)
        .bind(price)
        .bind(BookingStatus::Pending)
        .bind(user_id)
        .bind(departure.id)
        .bind(outbound.id)
        .bind(return_flight.as_ref().map(|f| f.id))
        .execute(&mut *tx)
        .await?;

        let booking = fetch_booking(&mut tx, result.last_insert_id() as i64).await?;
        tx.commit().await?;

        Ok(booking.into())
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<BookingResponse> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Booking with id={id} not found")))?;
        Ok(booking.into())
    }

    pub async fn list_my(
        &self,
        user_id: i64,
        page: u32,
        size: u32,
    ) -> AppResult<PageResponse<BookingResponse>> {
        let filter = BookingFilter {
            user_id: Some(user_id),
            ..Default::default()
        };
        self.list_paged(&filter, page, size).await
    }

    pub async fn list_all_paged(
        &self,
        filter: &BookingFilter,
        page: u32,
        size: u32,
    ) -> AppResult<PageResponse<BookingResponse>> {
        self.list_paged(filter, page, size).await
    }

    pub async fn search_by_user_email(
        &self,
        email: &str,
        page: u32,
        size: u32,
    ) -> AppResult<PageResponse<BookingResponse>> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AppError::BadRequest(
                "Parameter email is required to search bookings by user".to_string(),
            ));
        }
        let filter = BookingFilter {
            user_email: Some(email.to_string()),
            ..Default::default()
        };
        self.list_paged(&filter, page, size).await
    }

    async fn list_paged(
        &self,
        filter: &BookingFilter,
        page: u32,
        size: u32,
    ) -> AppResult<PageResponse<BookingResponse>> {
        let mut count = QueryBuilder::<MySql>::new(
            "SELECT COUNT(*) FROM bookings b JOIN app_users u ON b.user_id = u.id WHERE 1=1",
        );
        push_booking_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<MySql>::new(
            "SELECT b.id, b.persons_count, b.total_price, b.status, b.created_at, \
             b.user_id, b.tour_departure_id, b.outbound_flight_id, b.return_flight_id \
             FROM bookings b JOIN app_users u ON b.user_id = u.id WHERE 1=1",
        );
        push_booking_filters(&mut query, filter);
        query.push(" ORDER BY b.created_at DESC, b.id DESC LIMIT ");
        query.push_bind(size);
        query.push(" OFFSET ");
        query.push_bind(offset(page, size));

        let bookings = query
            .build_query_as::<Booking>()
            .fetch_all(&self.pool)
            .await?;

        Ok(PageResponse::new(
            page,
            size,
            total as u64,
            bookings.into_iter().map(BookingResponse::from).collect(),
        ))
    }

    /// Status transition with its seat effects.
    pub async fn update_status(
        &self,
        id: i64,
        request: BookingStatusUpdateRequest,
    ) -> AppResult<BookingResponse> {
        let mut tx = self.pool.begin().await?;
        let today = today();

        let mut booking = lock_booking(&mut tx, id).await?;
        let old_status = booking.status;
        let new_status = request.status;

        if old_status == new_status {
            tx.commit().await?;
            return Ok(booking.into());
        }

        let mut departure = capacity::lock_departure(&mut tx, booking.tour_departure_id).await?;

        // Any transition targeting a counting status requires an open
        // departure; cancellations never recheck.
        if new_status.is_counting() {
            capacity::ensure_open_for_booking(&departure, today)?;
        }

        match seat_delta(old_status, new_status, booking.persons_count) {
            delta if delta > 0 => capacity::reserve(&mut tx, &mut departure, delta, today).await?,
            delta if delta < 0 => capacity::release(&mut tx, &mut departure, -delta).await?,
            _ => {}
        }

        sqlx::query("UPDATE bookings SET status = ? WHERE id = ?")
            .bind(new_status)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        booking.status = new_status;
        Ok(booking.into())
    }

    /// Full update, possibly moving the booking to another
    /// departure. Both departure rows are locked in ascending id order.
    pub async fn update(&self, id: i64, request: BookingUpdateRequest) -> AppResult<BookingResponse> {
        request
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let mut tx = self.pool.begin().await?;
        let today = today();

        let booking = lock_booking(&mut tx, id).await?;

        let user_exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM app_users WHERE id = ?")
            .bind(request.user_id)
            .fetch_one(&mut *tx)
            .await?;
        if user_exists == 0 {
            return Err(AppError::NotFound(format!(
                "User with id={} not found",
                request.user_id
            )));
        }

        let (mut old_departure, mut new_departure) =
            lock_departure_pair(&mut tx, booking.tour_departure_id, request.tour_departure_id)
                .await?;

        let new_outbound = require_flight(&mut tx, request.outbound_flight_id, "Outbound").await?;
        ensure_flight_linked(&mut tx, &new_outbound, request.tour_departure_id, "Outbound").await?;

        let mut new_return = None;
        if let Some(return_id) = request.return_flight_id {
            if return_id == new_outbound.id {
                return Err(AppError::ReturnEqualsOutbound(format!(
                    "Flight id={return_id} cannot be both outbound and return"
                )));
            }
            let ret = require_flight(&mut tx, return_id, "Return").await?;
            ensure_flight_linked(&mut tx, &ret, request.tour_departure_id, "Return").await?;
            new_return = Some(ret);
        }

        // Release on the old departure first; reserving on the new one
        // may still fail, which aborts the whole transaction.
        if booking.status.is_counting() {
            match old_departure.as_mut() {
                Some(old) => capacity::release(&mut tx, old, booking.persons_count).await?,
                None => {
                    capacity::release(&mut tx, &mut new_departure, booking.persons_count).await?
                }
            }
        }
        if request.status.is_counting() {
            capacity::reserve(&mut tx, &mut new_departure, request.persons_count, today).await?;
        }

        let per_person = price_per_person(&mut tx, &new_departure).await?;
        let price = total_price(
            request.persons_count,
            per_person,
            new_outbound.base_price,
            new_return.as_ref().map(|f| f.base_price),
        );

        sqlx::query(
            "UPDATE bookings SET persons_count = ?, total_price = ?, status = ?, user_id = ?, \
             tour_departure_id = ?, outbound_flight_id = ?, return_flight_id = ? WHERE id = ?",
        )
        .bind(request.persons_count)
        .bind(price)
        .bind(request.status)
        .bind(request.user_id)
        .bind(request.tour_departure_id)
        .bind(new_outbound.id)
        .bind(new_return.as_ref().map(|f| f.id))
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let updated = fetch_booking(&mut tx, id).await?;
        tx.commit().await?;
        Ok(updated.into())
    }

    /// Deletes a booking, releasing seats when the status counted them.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let booking = lock_booking(&mut tx, id).await?;

        if booking.status.is_counting() {
            let mut departure =
                capacity::lock_departure(&mut tx, booking.tour_departure_id).await?;
            capacity::release(&mut tx, &mut departure, booking.persons_count).await?;
        }

        let result = sqlx::query("DELETE FROM bookings WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await;
        match result {
            Ok(_) => {}
            Err(e) if is_foreign_key_violation(&e) => {
                return Err(AppError::Conflict(format!(
                    "Booking with id={id} is still referenced and cannot be deleted"
                )))
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;
        Ok(())
    }

    /// Customer cancellation of an own PENDING booking.
    pub async fn cancel_my(&self, id: i64, user_id: i64) -> AppResult<BookingResponse> {
        let mut tx = self.pool.begin().await?;

        let mut booking = lock_booking(&mut tx, id).await?;

        if booking.user_id != user_id {
            return Err(AppError::Forbidden(format!(
                "Booking with id={id} does not belong to you"
            )));
        }
        if booking.status != BookingStatus::Pending {
            return Err(AppError::BadRequest(
                "Only a PENDING booking can be cancelled".to_string(),
            ));
        }

        let mut departure = capacity::lock_departure(&mut tx, booking.tour_departure_id).await?;
        capacity::release(&mut tx, &mut departure, booking.persons_count).await?;

        sqlx::query("UPDATE bookings SET status = ? WHERE id = ?")
            .bind(BookingStatus::Cancelled)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        booking.status = BookingStatus::Cancelled;
        Ok(booking.into())
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn push_booking_filters(qb: &mut QueryBuilder<'_, MySql>, filter: &BookingFilter) {
    if let Some(user_id) = filter.user_id {
        qb.push(" AND b.user_id = ").push_bind(user_id);
    }
    if let Some(departure_id) = filter.tour_departure_id {
        qb.push(" AND b.tour_departure_id = ").push_bind(departure_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND b.status = ").push_bind(status);
    }
    if let Some(from) = filter.created_from {
        qb.push(" AND b.created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.created_to {
        qb.push(" AND b.created_at <= ").push_bind(to);
    }
    if let Some(ref email) = filter.user_email {
        qb.push(" AND u.email = ").push_bind(email.clone());
    }
}

async fn lock_booking(conn: &mut MySqlConnection, id: i64) -> AppResult<Booking> {
    sqlx::query_as::<_, Booking>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ? FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Booking with id={id} not found")))
}

async fn fetch_booking(conn: &mut MySqlConnection, id: i64) -> AppResult<Booking> {
    sqlx::query_as::<_, Booking>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?"
    ))
    .bind(id)
    .fetch_one(&mut *conn)
    .await
    .map_err(Into::into)
}

async fn require_flight(conn: &mut MySqlConnection, id: i64, label: &str) -> AppResult<Flight> {
    sqlx::query_as::<_, Flight>(
        "SELECT id, flight_number, carrier, depart_at, arrive_at, status, base_price, \
         departure_airport_id, arrival_airport_id FROM flights WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("{label} flight with id={id} not found")))
}

async fn ensure_flight_linked(
    conn: &mut MySqlConnection,
    flight: &Flight,
    departure_id: i64,
    label: &str,
) -> AppResult<()> {
    let linked: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM flight_tour_departure WHERE flight_id = ? AND tour_departure_id = ?",
    )
    .bind(flight.id)
    .bind(departure_id)
    .fetch_one(&mut *conn)
    .await?;
    if linked == 0 {
        return Err(AppError::FlightNotLinked(format!(
            "{label} flight id={} is not linked to tour departure id={departure_id}",
            flight.id
        )));
    }
    Ok(())
}

async fn price_per_person(
    conn: &mut MySqlConnection,
    departure: &TourDeparture,
) -> AppResult<Decimal> {
    if let Some(price) = departure.price_override {
        return Ok(price);
    }
    sqlx::query_scalar::<_, Decimal>("SELECT base_price FROM tours WHERE id = ?")
        .bind(departure.tour_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Tour with id={} not found", departure.tour_id))
        })
}

/// Locks one or two departures, ascending id order, so concurrent moves
/// between the same pair cannot deadlock. Returns `(old, new)` with `old`
/// absent when both ids are the same row.
async fn lock_departure_pair(
    conn: &mut MySqlConnection,
    old_id: i64,
    new_id: i64,
) -> AppResult<(Option<TourDeparture>, TourDeparture)> {
    if old_id == new_id {
        return Ok((None, capacity::lock_departure(conn, new_id).await?));
    }
    if old_id < new_id {
        let old = capacity::lock_departure(conn, old_id).await?;
        let new = capacity::lock_departure(conn, new_id).await?;
        Ok((Some(old), new))
    } else {
        let new = capacity::lock_departure(conn, new_id).await?;
        let old = capacity::lock_departure(conn, old_id).await?;
        Ok((Some(old), new))
    }
}
