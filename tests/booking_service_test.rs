use chrono::{Duration, Local, NaiveDate};
use ctor::dtor;
use rust_decimal::Decimal;
use sqlx::mysql::MySqlPool as Pool;
use tokio::task::JoinSet;
use tour_agency_backend::models::booking::{
    BookingCreateRequest, BookingStatus, BookingStatusUpdateRequest, BookingUpdateRequest,
};
use tour_agency_backend::services::booking_service::BookingService;
use tour_agency_backend::utils::error::AppError;

mod common {
    pub mod test_utils;
}
use common::test_utils::TestDb;

#[dtor]
fn cleanup() {
    if let Err(e) = TestDb::cleanup_database_sync() {
        eprintln!("Failed to cleanup test database: {}", e);
    }
}

struct World {
    departure_id: i64,
    flight_id: i64,
}

async fn create_user(pool: &Pool, tag: &str) -> anyhow::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO app_users (username, email, password_hash, phone, role, is_active) \
         VALUES (?, ?, 'x', NULL, 'USER', TRUE)",
    )
    .bind(format!("user_{tag}"))
    .bind(format!("{tag}@example.com"))
    .execute(pool)
    .await?;
    Ok(result.last_insert_id() as i64)
}

/// One tour with one departure and one linked flight, all namespaced by
/// `tag` so tests sharing the database never collide.
async fn create_world(
    pool: &Pool,
    tag: &str,
    capacity_total: i32,
    start_date: NaiveDate,
) -> anyhow::Result<World> {
    let city = sqlx::query("INSERT INTO cities (name, country, timezone) VALUES (?, 'Testland', NULL)")
        .bind(format!("City {tag}"))
        .execute(pool)
        .await?
        .last_insert_id() as i64;

    let airport_a = sqlx::query("INSERT INTO airports (iata_code, name, city_id) VALUES (?, 'A', ?)")
        .bind(format!("A{tag}"))
        .bind(city)
        .execute(pool)
        .await?
        .last_insert_id() as i64;
    let airport_b = sqlx::query("INSERT INTO airports (iata_code, name, city_id) VALUES (?, 'B', ?)")
        .bind(format!("B{tag}"))
        .bind(city)
        .execute(pool)
        .await?
        .last_insert_id() as i64;

    let flight_id = sqlx::query(
        "INSERT INTO flights (flight_number, carrier, depart_at, arrive_at, status, \
         base_price, departure_airport_id, arrival_airport_id) \
         VALUES (?, 'Test Air', ?, ?, 'SCHEDULED', 100.00, ?, ?)",
    )
    .bind(format!("TA{tag}"))
    .bind(start_date.and_hms_opt(8, 0, 0))
    .bind(start_date.and_hms_opt(10, 0, 0))
    .bind(airport_a)
    .bind(airport_b)
    .execute(pool)
    .await?
    .last_insert_id() as i64;

    let tour_id = sqlx::query(
        "INSERT INTO tours (title, description, duration_days, base_price, status, \
         is_active, base_city_id, manager_user_id) \
         VALUES (?, NULL, 7, 500.00, 'PUBLISHED', TRUE, ?, NULL)",
    )
    .bind(format!("Tour {tag}"))
    .bind(city)
    .execute(pool)
    .await?
    .last_insert_id() as i64;

    let departure_id = sqlx::query(
        "INSERT INTO tour_departures (start_date, end_date, capacity_total, \
         capacity_reserved, price_override, status, tour_id) \
         VALUES (?, ?, ?, 0, NULL, 'PLANNED', ?)",
    )
    .bind(start_date)
    .bind(start_date + Duration::days(7))
    .bind(capacity_total)
    .bind(tour_id)
    .execute(pool)
    .await?
    .last_insert_id() as i64;

    sqlx::query("INSERT INTO flight_tour_departure (flight_id, tour_departure_id) VALUES (?, ?)")
        .bind(flight_id)
        .bind(departure_id)
        .execute(pool)
        .await?;

    Ok(World {
        departure_id,
        flight_id,
    })
}

async fn departure_state(pool: &Pool, id: i64) -> anyhow::Result<(i32, String)> {
    let row: (i32, String) =
        sqlx::query_as("SELECT capacity_reserved, status FROM tour_departures WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await?;
    Ok(row)
}

fn booking_request(world: &World, persons: i32) -> BookingCreateRequest {
    BookingCreateRequest {
        persons_count: persons,
        tour_departure_id: world.departure_id,
        outbound_flight_id: world.flight_id,
        return_flight_id: None,
    }
}

fn future_date() -> NaiveDate {
    Local::now().date_naive() + Duration::days(90)
}

#[tokio::test]
async fn booking_fills_capacity_then_closes_sales() -> anyhow::Result<()> {
    let Some(pool) = TestDb::get_instance().await? else {
        return Ok(());
    };
    let service = BookingService::new(pool.clone());
    let world = create_world(&pool, "fill", 10, future_date()).await?;
    let user = create_user(&pool, "fill").await?;

    let first = service.create(user, booking_request(&world, 4)).await?;
    assert_eq!(first.status, BookingStatus::Pending);
    // base 500 + outbound 100, times 4 persons
    assert_eq!(first.total_price, Decimal::from(2400));

    service.create(user, booking_request(&world, 6)).await?;
    let (reserved, status) = departure_state(&pool, world.departure_id).await?;
    assert_eq!(reserved, 10);
    assert_eq!(status, "SALES_CLOSED");

    let err = service
        .create(user, booking_request(&world, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CapacityExceeded(_)));
    Ok(())
}

#[tokio::test]
async fn cancelling_reopens_sales() -> anyhow::Result<()> {
    let Some(pool) = TestDb::get_instance().await? else {
        return Ok(());
    };
    let service = BookingService::new(pool.clone());
    let world = create_world(&pool, "reopen", 10, future_date()).await?;
    let user = create_user(&pool, "reopen").await?;

    service.create(user, booking_request(&world, 4)).await?;
    let big = service.create(user, booking_request(&world, 6)).await?;

    let cancelled = service.cancel_my(big.id, user).await?;
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    let (reserved, status) = departure_state(&pool, world.departure_id).await?;
    assert_eq!(reserved, 4);
    assert_eq!(status, "PLANNED");
    Ok(())
}

#[tokio::test]
async fn failed_move_leaves_source_untouched() -> anyhow::Result<()> {
    let Some(pool) = TestDb::get_instance().await? else {
        return Ok(());
    };
    let service = BookingService::new(pool.clone());
    let source = create_world(&pool, "mv_src", 10, future_date()).await?;
    let cramped = create_world(&pool, "mv_small", 3, future_date()).await?;
    let roomy = create_world(&pool, "mv_big", 10, future_date()).await?;
    let user = create_user(&pool, "move").await?;

    let booking = service.create(user, booking_request(&source, 4)).await?;

    let move_to = |world: &World| BookingUpdateRequest {
        persons_count: 4,
        status: BookingStatus::Pending,
        user_id: user,
        tour_departure_id: world.departure_id,
        outbound_flight_id: world.flight_id,
        return_flight_id: None,
    };

    let err = service.update(booking.id, move_to(&cramped)).await.unwrap_err();
    assert!(matches!(err, AppError::CapacityExceeded(_)));
    let (reserved, _) = departure_state(&pool, source.departure_id).await?;
    assert_eq!(reserved, 4);

    let moved = service.update(booking.id, move_to(&roomy)).await?;
    assert_eq!(moved.tour_departure_id, roomy.departure_id);
    let (reserved, _) = departure_state(&pool, source.departure_id).await?;
    assert_eq!(reserved, 0);
    let (reserved, _) = departure_state(&pool, roomy.departure_id).await?;
    assert_eq!(reserved, 4);
    Ok(())
}

#[tokio::test]
async fn booking_a_past_departure_fails() -> anyhow::Result<()> {
    let Some(pool) = TestDb::get_instance().await? else {
        return Ok(());
    };
    let service = BookingService::new(pool.clone());
    let yesterday = Local::now().date_naive() - Duration::days(1);
    let world = create_world(&pool, "past", 10, yesterday).await?;
    let user = create_user(&pool, "past").await?;

    let err = service
        .create(user, booking_request(&world, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DepartureInPast(_)));
    Ok(())
}

#[tokio::test]
async fn status_transitions_move_seats() -> anyhow::Result<()> {
    let Some(pool) = TestDb::get_instance().await? else {
        return Ok(());
    };
    let service = BookingService::new(pool.clone());
    let world = create_world(&pool, "st", 10, future_date()).await?;
    let user = create_user(&pool, "st").await?;

    let booking = service.create(user, booking_request(&world, 3)).await?;

    // counting to counting keeps the counter
    let confirmed = service
        .update_status(
            booking.id,
            BookingStatusUpdateRequest {
                status: BookingStatus::Confirmed,
            },
        )
        .await?;
    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    let (reserved, _) = departure_state(&pool, world.departure_id).await?;
    assert_eq!(reserved, 3);

    // leaving the counting set releases
    service
        .update_status(
            booking.id,
            BookingStatusUpdateRequest {
                status: BookingStatus::Cancelled,
            },
        )
        .await?;
    let (reserved, _) = departure_state(&pool, world.departure_id).await?;
    assert_eq!(reserved, 0);

    // re-entering it reserves again
    service
        .update_status(
            booking.id,
            BookingStatusUpdateRequest {
                status: BookingStatus::Pending,
            },
        )
        .await?;
    let (reserved, _) = departure_state(&pool, world.departure_id).await?;
    assert_eq!(reserved, 3);
    Ok(())
}

#[tokio::test]
async fn cancel_requires_ownership_and_pending() -> anyhow::Result<()> {
    let Some(pool) = TestDb::get_instance().await? else {
        return Ok(());
    };
    let service = BookingService::new(pool.clone());
    let world = create_world(&pool, "cx", 10, future_date()).await?;
    let owner = create_user(&pool, "cx_owner").await?;
    let stranger = create_user(&pool, "cx_other").await?;

    let booking = service.create(owner, booking_request(&world, 2)).await?;

    let err = service.cancel_my(booking.id, stranger).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    service
        .update_status(
            booking.id,
            BookingStatusUpdateRequest {
                status: BookingStatus::Confirmed,
            },
        )
        .await?;
    let err = service.cancel_my(booking.id, owner).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}

#[tokio::test]
async fn concurrent_bookings_respect_capacity() -> anyhow::Result<()> {
    let Some(pool) = TestDb::get_instance().await? else {
        return Ok(());
    };
    let world = create_world(&pool, "cc", 1, future_date()).await?;

    let mut users = Vec::new();
    for i in 0..10 {
        users.push(create_user(&pool, &format!("cc_{i}")).await?);
    }

    let mut set = JoinSet::new();
    for user in users {
        let service = BookingService::new(pool.clone());
        let request = booking_request(&world, 1);
        set.spawn(async move { service.create(user, request).await });
    }

    let mut successes = 0;
    while let Some(joined) = set.join_next().await {
        if joined?.is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);

    let (reserved, status) = departure_state(&pool, world.departure_id).await?;
    assert_eq!(reserved, 1);
    assert_eq!(status, "SALES_CLOSED");
    Ok(())
}
