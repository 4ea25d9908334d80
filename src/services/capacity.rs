//! The capacity ledger: the only code allowed to mutate a departure's
//! `capacity_reserved`. Callers lock the departure row first and keep the
//! lock for the rest of the transaction, so concurrent bookings against
//! the same departure serialize at the database.

use crate::models::tour_departure::TourDeparture;
use crate::utils::error::{AppError, AppResult};
use chrono::NaiveDate;
use sqlx::MySqlConnection;

pub const DEPARTURE_COLUMNS: &str =
    "id, start_date, end_date, capacity_total, capacity_reserved, price_override, status, tour_id";

/// Loads a departure under a row-level lock (`FOR UPDATE`).
pub async fn lock_departure(conn: &mut MySqlConnection, id: i64) -> AppResult<TourDeparture> {
    sqlx::query_as::<_, TourDeparture>(&format!(
        "SELECT {DEPARTURE_COLUMNS} FROM tour_departures WHERE id = ? FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Tour departure with id={id} not found")))
}

/// The "open for booking" predicate: not closed/terminal and not started.
pub fn ensure_open_for_booking(dep: &TourDeparture, today: NaiveDate) -> AppResult<()> {
    if dep.status.refuses_bookings() {
        return Err(AppError::DepartureClosed(format!(
            "Tour departure with id={} is {} and takes no bookings",
            dep.id, dep.status
        )));
    }
    if dep.start_date < today {
        return Err(AppError::DepartureInPast(format!(
            "Tour departure with id={} already started on {}",
            dep.id, dep.start_date
        )));
    }
    Ok(())
}

/// Takes `persons` seats. The departure must have been loaded through
/// `lock_departure` in the current transaction.
pub async fn reserve(
    conn: &mut MySqlConnection,
    dep: &mut TourDeparture,
    persons: i32,
    today: NaiveDate,
) -> AppResult<()> {
    // Capacity before the closed check, so a departure that closed by
    // filling up reports the shortage rather than the closure.
    let available = dep.available_seats();
    if persons > available {
        return Err(AppError::CapacityExceeded(format!(
            "Cannot reserve {} seats on departure id={}: {} available",
            persons, dep.id, available
        )));
    }
    ensure_open_for_booking(dep, today)?;

    dep.capacity_reserved += persons;
    dep.status = dep.synced_status();
    write_back(conn, dep).await
}

/// Gives `persons` seats back; clamps at zero and never fails.
pub async fn release(
    conn: &mut MySqlConnection,
    dep: &mut TourDeparture,
    persons: i32,
) -> AppResult<()> {
    dep.capacity_reserved = (dep.capacity_reserved - persons).max(0);
    dep.status = dep.synced_status();
    write_back(conn, dep).await
}

async fn write_back(conn: &mut MySqlConnection, dep: &TourDeparture) -> AppResult<()> {
    sqlx::query("UPDATE tour_departures SET capacity_reserved = ?, status = ? WHERE id = ?")
        .bind(dep.capacity_reserved)
        .bind(dep.status)
        .bind(dep.id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
