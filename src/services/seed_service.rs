use crate::models::tour::TourStatus;
use crate::models::tour_departure::TourDepartureStatus;
use crate::models::user::UserRole;
use crate::utils::config::AppConfig;
use crate::utils::error::{AppError, AppResult};
use chrono::{Duration, Local};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use sqlx::MySqlPool;

/// Startup seeding: an admin account always, demo data only when asked.
pub struct SeedService {
    pool: MySqlPool,
}

impl SeedService {
    pub fn new(pool: MySqlPool) -> Self {
        SeedService { pool }
    }

    pub async fn run(&self, config: &AppConfig) -> AppResult<()> {
        self.ensure_admin(&config.admin_email, &config.admin_password)
            .await?;
        if config.recreate_demo_data {
            self.recreate_demo_data().await?;
        }
        Ok(())
    }

    async fn ensure_admin(&self, email: &str, password: &str) -> AppResult<()> {
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM app_users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        if existing > 0 {
            return Ok(());
        }
        let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|e| AppError::AuthError(format!("Failed to hash password: {e}")))?;
        sqlx::query(
            "INSERT INTO app_users (username, email, password_hash, phone, role, is_active) \
             VALUES ('admin', ?, ?, NULL, ?, TRUE)",
        )
        .bind(email)
        .bind(&password_hash)
        .bind(UserRole::Admin)
        .execute(&self.pool)
        .await?;
        info!("bootstrapped admin account {email}");
        Ok(())
    }

    async fn recreate_demo_data(&self) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        for table in [
            "recommendations",
            "user_searches",
            "bookings",
            "flight_tour_departure",
            "tour_departures",
            "tours",
            "flights",
            "airports",
            "cities",
        ] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await?;
        }

        let cities = [
            ("Riga", "Latvia", "Europe/Riga"),
            ("Vilnius", "Lithuania", "Europe/Vilnius"),
            ("Tallinn", "Estonia", "Europe/Tallinn"),
            ("Warsaw", "Poland", "Europe/Warsaw"),
        ];
        let mut city_ids = Vec::new();
        for (name, country, tz) in cities {
            let result =
                sqlx::query("INSERT INTO cities (name, country, timezone) VALUES (?, ?, ?)")
                    .bind(name)
                    .bind(country)
                    .bind(tz)
                    .execute(&mut *tx)
                    .await?;
            city_ids.push(result.last_insert_id() as i64);
        }

        let airports = [("RIX", "Riga International"), ("VNO", "Vilnius Airport"),
            ("TLL", "Tallinn Lennart Meri"), ("WAW", "Warsaw Chopin")];
        let mut airport_ids = Vec::new();
        for (i, (code, name)) in airports.iter().enumerate() {
            let result =
                sqlx::query("INSERT INTO airports (iata_code, name, city_id) VALUES (?, ?, ?)")
                    .bind(code)
                    .bind(name)
                    .bind(city_ids[i])
                    .execute(&mut *tx)
                    .await?;
            airport_ids.push(result.last_insert_id() as i64);
        }

        let mut rng = StdRng::from_entropy();
        let today = Local::now().date_naive();

        let mut flight_ids = Vec::new();
        for i in 0..airport_ids.len() {
            for j in 0..airport_ids.len() {
                if i == j {
                    continue;
                }
                let offset_days = rng.gen_range(7..90);
                let depart = today + Duration::days(offset_days);
                let depart_at = depart
                    .and_hms_opt(rng.gen_range(6u32..20), 0, 0)
                    .unwrap_or_default();
                let arrive_at = depart_at + Duration::hours(2);
                let price = Decimal::from(rng.gen_range(40..220));
                let result = sqlx::query(
                    "INSERT INTO flights (flight_number, carrier, depart_at, arrive_at, \
                     status, base_price, departure_airport_id, arrival_airport_id) \
                     VALUES (?, 'Baltic Demo Air', ?, ?, 'SCHEDULED', ?, ?, ?)",
                )
                .bind(format!("BD{}{}{}", i + 1, j + 1, rng.gen_range(10..100)))
                .bind(depart_at)
                .bind(arrive_at)
                .bind(price)
                .bind(airport_ids[i])
                .bind(airport_ids[j])
                .execute(&mut *tx)
                .await?;
                flight_ids.push(result.last_insert_id() as i64);
            }
        }

        for (i, &city_id) in city_ids.iter().enumerate() {
            let duration = rng.gen_range(3..10);
            let base_price = Decimal::from(rng.gen_range(300..1200));
            let result = sqlx::query(
                "INSERT INTO tours (title, description, duration_days, base_price, status, \
                 is_active, base_city_id, manager_user_id) \
                 VALUES (?, 'Demo tour seeded at startup', ?, ?, ?, TRUE, ?, NULL)",
            )
            .bind(format!("Demo tour {}", i + 1))
            .bind(duration)
            .bind(base_price)
            .bind(TourStatus::Published)
            .bind(city_id)
            .execute(&mut *tx)
            .await?;
            let tour_id = result.last_insert_id() as i64;

            for _ in 0..2 {
                let start = today + Duration::days(rng.gen_range(14..120));
                let end = start + Duration::days(i64::from(duration));
                sqlx::query(
                    "INSERT INTO tour_departures (start_date, end_date, capacity_total, \
                     capacity_reserved, price_override, status, tour_id) \
                     VALUES (?, ?, ?, 0, NULL, ?, ?)",
                )
                .bind(start)
                .bind(end)
                .bind(rng.gen_range(10..40))
                .bind(TourDepartureStatus::Planned)
                .bind(tour_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        info!("demo data recreated: {} flights seeded", flight_ids.len());
        Ok(())
    }
}
