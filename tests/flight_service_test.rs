use ctor::dtor;
use rust_decimal::Decimal;
use sqlx::mysql::MySqlPool as Pool;
use tour_agency_backend::models::flight::{FlightCreateRequest, FlightStatus};
use tour_agency_backend::services::flight_service::FlightService;
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

struct Geography {
    riga_airport: i64,
    vilnius_airport: i64,
    riga_tour_id: i64,
}

async fn create_geography(pool: &Pool, tag: &str) -> anyhow::Result<Geography> {
    let riga = sqlx::query("INSERT INTO cities (name, country, timezone) VALUES (?, 'Latvia', NULL)")
        .bind(format!("Riga {tag}"))
        .execute(pool)
        .await?
        .last_insert_id() as i64;
    let vilnius =
        sqlx::query("INSERT INTO cities (name, country, timezone) VALUES (?, 'Lithuania', NULL)")
            .bind(format!("Vilnius {tag}"))
            .execute(pool)
            .await?
            .last_insert_id() as i64;

    let riga_airport =
        sqlx::query("INSERT INTO airports (iata_code, name, city_id) VALUES (?, 'Riga Intl', ?)")
            .bind(format!("R{tag}"))
            .bind(riga)
            .execute(pool)
            .await?
            .last_insert_id() as i64;
    let vilnius_airport =
        sqlx::query("INSERT INTO airports (iata_code, name, city_id) VALUES (?, 'Vilnius', ?)")
            .bind(format!("V{tag}"))
            .bind(vilnius)
            .execute(pool)
            .await?
            .last_insert_id() as i64;

    let riga_tour_id = sqlx::query(
        "INSERT INTO tours (title, description, duration_days, base_price, status, \
         is_active, base_city_id, manager_user_id) \
         VALUES (?, NULL, 3, 300.00, 'PUBLISHED', TRUE, ?, NULL)",
    )
    .bind(format!("Riga break {tag}"))
    .bind(riga)
    .execute(pool)
    .await?
    .last_insert_id() as i64;

    Ok(Geography {
        riga_airport,
        vilnius_airport,
        riga_tour_id,
    })
}

async fn create_departure(
    pool: &Pool,
    tour_id: i64,
    start: &str,
    end: &str,
) -> anyhow::Result<i64> {
    let id = sqlx::query(
        "INSERT INTO tour_departures (start_date, end_date, capacity_total, \
         capacity_reserved, price_override, status, tour_id) \
         VALUES (?, ?, 10, 0, NULL, 'PLANNED', ?)",
    )
    .bind(start.parse::<chrono::NaiveDate>()?)
    .bind(end.parse::<chrono::NaiveDate>()?)
    .bind(tour_id)
    .execute(pool)
    .await?
    .last_insert_id() as i64;
    Ok(id)
}

fn flight_request(geo: &Geography, number: &str, depart_day: &str) -> FlightCreateRequest {
    FlightCreateRequest {
        flight_number: number.to_string(),
        carrier: "Baltic Test Air".to_string(),
        depart_at: format!("{depart_day}T10:00:00").parse().expect("valid timestamp"),
        arrive_at: format!("{depart_day}T12:00:00").parse().expect("valid timestamp"),
        base_price: Decimal::from(60),
        status: Some(FlightStatus::Scheduled),
        departure_airport_id: geo.riga_airport,
        arrival_airport_id: geo.vilnius_airport,
    }
}

#[tokio::test]
async fn disjoint_dates_block_linking() -> anyhow::Result<()> {
    let Some(pool) = TestDb::get_instance().await? else {
        return Ok(());
    };
    let service = FlightService::new(pool.clone());
    let geo = create_geography(&pool, "win").await?;

    let flight = service
        .create(flight_request(&geo, "BT101S5", "2026-01-20"))
        .await?;
    let departure = create_departure(&pool, geo.riga_tour_id, "2026-01-10", "2026-01-12").await?;

    let err = service
        .add_departure_link(flight.id, departure)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::FlightNotCompatible(_)));

    // a window covering the flight's dates links fine
    let overlapping =
        create_departure(&pool, geo.riga_tour_id, "2026-01-18", "2026-01-22").await?;
    service.add_departure_link(flight.id, overlapping).await?;

    let err = service
        .add_departure_link(flight.id, overlapping)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    Ok(())
}

#[tokio::test]
async fn update_revalidates_existing_links() -> anyhow::Result<()> {
    let Some(pool) = TestDb::get_instance().await? else {
        return Ok(());
    };
    let service = FlightService::new(pool.clone());
    let geo = create_geography(&pool, "rv").await?;

    let flight = service
        .create(flight_request(&geo, "BT202RV", "2026-03-05"))
        .await?;
    let departure = create_departure(&pool, geo.riga_tour_id, "2026-03-01", "2026-03-08").await?;
    service.add_departure_link(flight.id, departure).await?;

    // moving the flight outside the linked window is refused
    let err = service
        .update(flight.id, flight_request(&geo, "BT202RV", "2026-05-05"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::FlightNotCompatible(_)));

    // inside the window it goes through
    let updated = service
        .update(flight.id, flight_request(&geo, "BT202RV", "2026-03-07"))
        .await?;
    assert_eq!(updated.depart_at.date(), "2026-03-07".parse()?);
    Ok(())
}

#[tokio::test]
async fn flight_number_lookup_and_validation() -> anyhow::Result<()> {
    let Some(pool) = TestDb::get_instance().await? else {
        return Ok(());
    };
    let service = FlightService::new(pool.clone());
    let geo = create_geography(&pool, "lk").await?;

    let mut bad = flight_request(&geo, "BT303LK", "2026-04-01");
    bad.arrive_at = bad.depart_at;
    let err = service.create(bad).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    let mut same_airport = flight_request(&geo, "BT303LK", "2026-04-01");
    same_airport.arrival_airport_id = geo.riga_airport;
    let err = service.create(same_airport).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    service
        .create(flight_request(&geo, "BT303LK", "2026-04-01"))
        .await?;
    let found = service.find_by_flight_number("BT303LK").await?;
    assert_eq!(found.flight_number, "BT303LK");

    let err = service
        .create(flight_request(&geo, "BT303LK", "2026-04-02"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = service.find_by_flight_number("NOPE123").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn discovery_respects_the_compatibility_predicate() -> anyhow::Result<()> {
    let Some(pool) = TestDb::get_instance().await? else {
        return Ok(());
    };
    let service = FlightService::new(pool.clone());
    let geo = create_geography(&pool, "dc").await?;

    let inside = service
        .create(flight_request(&geo, "BT404DC", "2026-07-03"))
        .await?;
    let outside = service
        .create(flight_request(&geo, "BT405DC", "2026-09-01"))
        .await?;
    let departure = create_departure(&pool, geo.riga_tour_id, "2026-07-01", "2026-07-08").await?;

    let candidates = service.flights_for_departure(departure).await?;
    let ids: Vec<i64> = candidates.iter().map(|f| f.id).collect();
    assert!(ids.contains(&inside.id));
    assert!(!ids.contains(&outside.id));
    Ok(())
}
