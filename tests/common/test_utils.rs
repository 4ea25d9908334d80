use dotenv::dotenv;
use once_cell::sync::OnceCell;
use sqlx::mysql::{MySqlPool as Pool, MySqlPoolOptions};
use sqlx::Error;
use std::env;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

static TEST_DB: OnceCell<Mutex<Option<TestDb>>> = OnceCell::new();
static DB_NAME: OnceCell<String> = OnceCell::new();

/// A throwaway database shared by all tests in one binary, created on
/// first use and dropped from a `#[dtor]` hook. Tests are skipped when
/// DATABASE_URL is not set, so the suite still passes on machines
/// without MySQL.
pub struct TestDb {
    pub pool: Pool,
    pub db_name: String,
}

fn base_url() -> Option<String> {
    dotenv().ok();
    let db_url = env::var("DATABASE_URL").ok()?;
    Some(db_url.split('/').collect::<Vec<&str>>()[..3].join("/"))
}

async fn create_connection_pool_without_db() -> Result<Option<Pool>, Error> {
    let base = match base_url() {
        Some(base) => base,
        None => return Ok(None),
    };
    let pool = MySqlPoolOptions::new()
        .max_connections(10)
        .connect(&base)
        .await?;
    Ok(Some(pool))
}

async fn create_connection_pool_with_db(db_name: &str) -> Result<Pool, Error> {
    let base = base_url().ok_or_else(|| Error::PoolClosed)?;
    MySqlPoolOptions::new()
        .max_connections(10)
        .connect(&format!("{base}/{db_name}"))
        .await
}

impl TestDb {
    /// Returns a pool onto the shared test database, or `None` when no
    /// database is configured.
    pub async fn get_instance() -> Result<Option<Pool>, Error> {
        let test_db = TEST_DB.get_or_init(|| Mutex::new(None));
        let mut guard = test_db.lock().await;

        if let Some(db) = guard.as_ref() {
            return Ok(Some(db.pool.clone()));
        }

        match Self::setup_database().await? {
            Some(db) => {
                let pool = db.pool.clone();
                *guard = Some(db);
                Ok(Some(pool))
            }
            None => Ok(None),
        }
    }

    async fn setup_database() -> Result<Option<Self>, Error> {
        let admin_pool = match create_connection_pool_without_db().await? {
            Some(pool) => pool,
            None => {
                eprintln!("DATABASE_URL not set, database tests will be skipped");
                return Ok(None);
            }
        };

        let db_name = DB_NAME
            .get_or_init(|| {
                let timestamp = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                format!("tour_agency_test_{timestamp}")
            })
            .clone();

        sqlx::query(&format!("CREATE DATABASE IF NOT EXISTS {db_name}"))
            .execute(&admin_pool)
            .await?;

        let pool = create_connection_pool_with_db(&db_name).await?;
        tour_agency_backend::db::ensure_schema(&pool).await?;

        Ok(Some(Self { pool, db_name }))
    }

    pub async fn cleanup_database() -> Result<(), Error> {
        if let Some(test_db) = TEST_DB.get() {
            if let Some(db) = test_db.lock().await.take() {
                if let Some(admin_pool) = create_connection_pool_without_db().await? {
                    sqlx::query(&format!("DROP DATABASE IF EXISTS {}", db.db_name))
                        .execute(&admin_pool)
                        .await?;
                }
            }
        }
        Ok(())
    }

    pub fn cleanup_database_sync() -> Result<(), Error> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(Error::Io)?;
        runtime.block_on(Self::cleanup_database())
    }
}
