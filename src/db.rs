use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;

// Database connection manager
pub struct Database {
    pub pool: MySqlPool,
}

impl Database {
    // Create a new database connection pool
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = MySqlPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }
}

/// Creates every table the application needs, in FK order. Safe to run on
/// every startup; uniqueness constraints live here so the invariants hold
/// at the database as well. MySQL's default collation makes the unique
/// flight_number case-insensitive.
pub async fn ensure_schema(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    let tables = vec![
        "CREATE TABLE IF NOT EXISTS cities (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            name VARCHAR(150) NOT NULL,
            country VARCHAR(150) NOT NULL,
            timezone VARCHAR(50) NULL,
            CONSTRAINT cities_name_country_uindex UNIQUE (name, country)
        )",
        "CREATE TABLE IF NOT EXISTS airports (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            iata_code VARCHAR(10) NOT NULL,
            name VARCHAR(150) NOT NULL,
            city_id BIGINT NOT NULL,
            CONSTRAINT airports_iata_code_uindex UNIQUE (iata_code),
            CONSTRAINT airports_city_id_fk
                FOREIGN KEY (city_id) REFERENCES cities(id)
        )",
        "CREATE TABLE IF NOT EXISTS app_users (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            username VARCHAR(255) NOT NULL,
            email VARCHAR(255) NOT NULL,
            password_hash VARCHAR(255) NOT NULL,
            phone VARCHAR(50) NULL,
            role ENUM('USER', 'MANAGER', 'ADMIN') DEFAULT 'USER' NOT NULL,
            is_active BOOLEAN DEFAULT TRUE NOT NULL,
            CONSTRAINT app_users_email_uindex UNIQUE (email)
        )",
        "CREATE TABLE IF NOT EXISTS flights (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            flight_number VARCHAR(20) NOT NULL,
            carrier VARCHAR(150) NOT NULL,
            depart_at DATETIME NOT NULL,
            arrive_at DATETIME NOT NULL,
            status ENUM('SCHEDULED', 'BOARDING', 'DEPARTED', 'ARRIVED', 'CANCELLED', 'DELAYED')
                DEFAULT 'SCHEDULED' NOT NULL,
            base_price DECIMAL(10,2) NOT NULL,
            departure_airport_id BIGINT NOT NULL,
            arrival_airport_id BIGINT NOT NULL,
            CONSTRAINT flights_flight_number_uindex UNIQUE (flight_number),
            CONSTRAINT flights_departure_airport_fk
                FOREIGN KEY (departure_airport_id) REFERENCES airports(id),
            CONSTRAINT flights_arrival_airport_fk
                FOREIGN KEY (arrival_airport_id) REFERENCES airports(id)
        )",
        "CREATE TABLE IF NOT EXISTS tours (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            title VARCHAR(200) NOT NULL,
            description VARCHAR(500) NULL,
            duration_days INT NOT NULL,
            base_price DECIMAL(10,2) NOT NULL,
            status ENUM('DRAFT', 'PUBLISHED', 'ARCHIVED') DEFAULT 'DRAFT' NOT NULL,
            is_active BOOLEAN DEFAULT TRUE NOT NULL,
            base_city_id BIGINT NOT NULL,
            manager_user_id BIGINT NULL,
            CONSTRAINT tours_base_city_fk
                FOREIGN KEY (base_city_id) REFERENCES cities(id),
            CONSTRAINT tours_manager_user_fk
                FOREIGN KEY (manager_user_id) REFERENCES app_users(id)
        )",
        "CREATE TABLE IF NOT EXISTS tour_departures (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            start_date DATE NOT NULL,
            end_date DATE NOT NULL,
            capacity_total INT NOT NULL,
            capacity_reserved INT DEFAULT 0 NOT NULL,
            price_override DECIMAL(10,2) NULL,
            status ENUM('PLANNED', 'SALES_CLOSED', 'CANCELLED', 'IN_PROGRESS', 'COMPLETED')
                DEFAULT 'PLANNED' NOT NULL,
            tour_id BIGINT NOT NULL,
            CONSTRAINT tour_departures_tour_fk
                FOREIGN KEY (tour_id) REFERENCES tours(id)
        )",
        "CREATE TABLE IF NOT EXISTS flight_tour_departure (
            flight_id BIGINT NOT NULL,
            tour_departure_id BIGINT NOT NULL,
            PRIMARY KEY (flight_id, tour_departure_id),
            CONSTRAINT ftd_flight_fk
                FOREIGN KEY (flight_id) REFERENCES flights(id),
            CONSTRAINT ftd_tour_departure_fk
                FOREIGN KEY (tour_departure_id) REFERENCES tour_departures(id)
        )",
        "CREATE TABLE IF NOT EXISTS bookings (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            persons_count INT NOT NULL,
            total_price DECIMAL(10,2) NOT NULL,
            status ENUM('PENDING', 'CONFIRMED', 'CANCELLED') DEFAULT 'PENDING' NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP NOT NULL,
            user_id BIGINT NOT NULL,
            tour_departure_id BIGINT NOT NULL,
            outbound_flight_id BIGINT NOT NULL,
            return_flight_id BIGINT NULL,
            CONSTRAINT bookings_user_fk
                FOREIGN KEY (user_id) REFERENCES app_users(id),
            CONSTRAINT bookings_tour_departure_fk
                FOREIGN KEY (tour_departure_id) REFERENCES tour_departures(id),
            CONSTRAINT bookings_outbound_flight_fk
                FOREIGN KEY (outbound_flight_id) REFERENCES flights(id),
            CONSTRAINT bookings_return_flight_fk
                FOREIGN KEY (return_flight_id) REFERENCES flights(id)
        )",
        "CREATE TABLE IF NOT EXISTS user_searches (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP NOT NULL,
            date_from DATE NULL,
            date_to DATE NULL,
            persons_count INT NULL,
            budget_min DECIMAL(10,2) NULL,
            budget_max DECIMAL(10,2) NULL,
            user_id BIGINT NOT NULL,
            destination_city_id BIGINT NULL,
            CONSTRAINT user_searches_user_fk
                FOREIGN KEY (user_id) REFERENCES app_users(id),
            CONSTRAINT user_searches_destination_city_fk
                FOREIGN KEY (destination_city_id) REFERENCES cities(id)
        )",
        "CREATE TABLE IF NOT EXISTS recommendations (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            score DECIMAL(6,4) NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP NOT NULL,
            is_shown BOOLEAN DEFAULT FALSE NOT NULL,
            is_selected BOOLEAN DEFAULT FALSE NOT NULL,
            user_search_id BIGINT NOT NULL,
            tour_departure_id BIGINT NOT NULL,
            CONSTRAINT recommendations_search_departure_uindex
                UNIQUE (user_search_id, tour_departure_id),
            CONSTRAINT recommendations_user_search_fk
                FOREIGN KEY (user_search_id) REFERENCES user_searches(id),
            CONSTRAINT recommendations_tour_departure_fk
                FOREIGN KEY (tour_departure_id) REFERENCES tour_departures(id)
        )",
    ];

    for create_sql in tables {
        sqlx::query(create_sql).execute(pool).await?;
    }

    Ok(())
}
