use chrono::Duration;
use ctor::dtor;
use rust_decimal::Decimal;
use sqlx::mysql::MySqlPool as Pool;
use std::str::FromStr;
use tour_agency_backend::models::recommendation::UserSearchCreateRequest;
use tour_agency_backend::services::recommendation_engine::RecommendationEngineClient;
use tour_agency_backend::services::recommendation_service::RecommendationService;
use tour_agency_backend::services::user_search_service::UserSearchService;
use tour_agency_backend::utils::config::AppConfig;
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

/// Engine client aimed at a port nothing listens on.
fn dead_engine() -> RecommendationEngineClient {
    let config = AppConfig {
        database_url: String::new(),
        admin_email: String::new(),
        admin_password: String::new(),
        recreate_demo_data: false,
        recommendation_engine_url: "http://127.0.0.1:1".to_string(),
        engine_connect_timeout: std::time::Duration::from_millis(200),
        engine_read_timeout: std::time::Duration::from_millis(200),
    };
    RecommendationEngineClient::new(&config)
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

async fn create_departure(pool: &Pool, tag: &str, base_price: &str) -> anyhow::Result<i64> {
    let city = sqlx::query("INSERT INTO cities (name, country, timezone) VALUES (?, 'Testland', NULL)")
        .bind(format!("City {tag}"))
        .execute(pool)
        .await?
        .last_insert_id() as i64;
    let tour_id = sqlx::query(
        "INSERT INTO tours (title, description, duration_days, base_price, status, \
         is_active, base_city_id, manager_user_id) \
         VALUES (?, NULL, 7, ?, 'PUBLISHED', TRUE, ?, NULL)",
    )
    .bind(format!("Tour {tag}"))
    .bind(Decimal::from_str(base_price)?)
    .bind(city)
    .execute(pool)
    .await?
    .last_insert_id() as i64;
    let start = chrono::Local::now().date_naive() + Duration::days(60);
    let departure_id = sqlx::query(
        "INSERT INTO tour_departures (start_date, end_date, capacity_total, \
         capacity_reserved, price_override, status, tour_id) \
         VALUES (?, ?, 10, 0, NULL, 'PLANNED', ?)",
    )
    .bind(start)
    .bind(start + Duration::days(7))
    .bind(tour_id)
    .execute(pool)
    .await?
    .last_insert_id() as i64;
    Ok(departure_id)
}

async fn seed_recommendation(
    pool: &Pool,
    search_id: i64,
    departure_id: i64,
    score: &str,
) -> anyhow::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO recommendations (score, is_shown, is_selected, user_search_id, \
         tour_departure_id) VALUES (?, FALSE, FALSE, ?, ?)",
    )
    .bind(Decimal::from_str(score)?)
    .bind(search_id)
    .bind(departure_id)
    .execute(pool)
    .await?;
    Ok(result.last_insert_id() as i64)
}

fn empty_search_request() -> UserSearchCreateRequest {
    UserSearchCreateRequest {
        date_from: None,
        date_to: None,
        persons_count: None,
        budget_min: None,
        budget_max: None,
        destination_city_id: None,
    }
}

#[tokio::test]
async fn unreachable_engine_yields_an_empty_page() -> anyhow::Result<()> {
    let Some(pool) = TestDb::get_instance().await? else {
        return Ok(());
    };
    let searches = UserSearchService::new(pool.clone());
    let service = RecommendationService::new(pool.clone(), dead_engine());

    let user = create_user(&pool, "eng_down").await?;
    let search = searches.create(user, empty_search_request()).await?;

    let page = service.fetch_my_paged(search.search_id, user, 0, 20).await?;
    assert_eq!(page.total_elements, 0);
    assert!(page.content.is_empty());
    Ok(())
}

#[tokio::test]
async fn fetching_pages_by_score_and_marks_shown() -> anyhow::Result<()> {
    let Some(pool) = TestDb::get_instance().await? else {
        return Ok(());
    };
    let searches = UserSearchService::new(pool.clone());
    let service = RecommendationService::new(pool.clone(), dead_engine());

    let user = create_user(&pool, "pages").await?;
    let search = searches.create(user, empty_search_request()).await?;
    let low = create_departure(&pool, "pages_low", "400.00").await?;
    let high = create_departure(&pool, "pages_high", "900.00").await?;
    seed_recommendation(&pool, search.search_id, low, "0.3100").await?;
    seed_recommendation(&pool, search.search_id, high, "0.9200").await?;

    let page = service.fetch_my_paged(search.search_id, user, 0, 20).await?;
    assert_eq!(page.total_elements, 2);
    assert_eq!(page.content[0].tour_departure_id, high);
    assert_eq!(page.content[0].price_per_person, Decimal::from(900));
    assert_eq!(page.content[1].tour_departure_id, low);

    let shown: Vec<bool> =
        sqlx::query_scalar("SELECT is_shown FROM recommendations WHERE user_search_id = ?")
            .bind(search.search_id)
            .fetch_all(&pool)
            .await?;
    assert!(shown.iter().all(|s| *s));

    // a second read serves the same committed set, no regeneration
    let again = service.fetch_my_paged(search.search_id, user, 0, 20).await?;
    assert_eq!(again.total_elements, 2);
    assert_eq!(again.content[0].tour_departure_id, high);
    Ok(())
}

#[tokio::test]
async fn selecting_is_owner_scoped() -> anyhow::Result<()> {
    let Some(pool) = TestDb::get_instance().await? else {
        return Ok(());
    };
    let searches = UserSearchService::new(pool.clone());
    let service = RecommendationService::new(pool.clone(), dead_engine());

    let owner = create_user(&pool, "sel_owner").await?;
    let stranger = create_user(&pool, "sel_other").await?;
    let search = searches.create(owner, empty_search_request()).await?;
    let departure = create_departure(&pool, "sel", "500.00").await?;
    let recommendation = seed_recommendation(&pool, search.search_id, departure, "0.5000").await?;

    // another user's recommendation looks like a missing one
    let err = service.mark_selected(recommendation, stranger).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    service.mark_selected(recommendation, owner).await?;
    let selected: bool =
        sqlx::query_scalar("SELECT is_selected FROM recommendations WHERE id = ?")
            .bind(recommendation)
            .fetch_one(&pool)
            .await?;
    assert!(selected);

    // the stranger cannot read the search either
    let err = service
        .fetch_my_paged(search.search_id, stranger, 0, 20)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn search_creation_validates_its_windows() -> anyhow::Result<()> {
    let Some(pool) = TestDb::get_instance().await? else {
        return Ok(());
    };
    let searches = UserSearchService::new(pool.clone());
    let user = create_user(&pool, "win_chk").await?;

    let mut request = empty_search_request();
    request.date_from = Some("2026-09-10".parse()?);
    request.date_to = Some("2026-09-01".parse()?);
    let err = searches.create(user, request).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    let mut request = empty_search_request();
    request.budget_min = Some(Decimal::from(500));
    request.budget_max = Some(Decimal::from(100));
    let err = searches.create(user, request).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    let mut request = empty_search_request();
    request.destination_city_id = Some(i64::MAX);
    let err = searches.create(user, request).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}
