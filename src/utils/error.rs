use rocket::http::ContentType;
use rocket::http::Status;
use rocket::response::Responder;
use rocket::Request;
use rocket::Response;
use rocket_okapi::JsonSchema;
use serde::Serialize;
use serde_json::json;
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug, Serialize, JsonSchema)]
pub enum AppError {
    #[error("Database error")]
    DatabaseError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Departure closed: {0}")]
    DepartureClosed(String),

    #[error("Departure in past: {0}")]
    DepartureInPast(String),

    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("Flight not linked: {0}")]
    FlightNotLinked(String),

    #[error("Return flight equals outbound: {0}")]
    ReturnEqualsOutbound(String),

    #[error("Flight not compatible with departure: {0}")]
    FlightNotCompatible(String),

    /// Reserved for the wire contract. Engine failures currently degrade
    /// to an empty page instead of surfacing this status.
    #[error("Recommendation engine unavailable: {0}")]
    RecommendationUnavailable(String),
}

// Convert sqlx::Error (database error) to AppError::DatabaseError
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

// Define a type alias for the result type
pub type AppResult<T> = Result<T, AppError>;

/// MySQL duplicate-key entry (errno 1062).
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    mysql_errno(err) == Some(1062)
}

/// MySQL foreign-key violation: delete/update of a referenced row (1451)
/// or insert/update pointing at a missing parent (1452).
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(mysql_errno(err), Some(1451) | Some(1452))
}

fn mysql_errno(err: &sqlx::Error) -> Option<u16> {
    err.as_database_error()
        .and_then(|e| e.try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>())
        .map(|e| e.number() as u16)
}

// Implement the Responder trait for AppError
// Format all error from route level to a Http Response at route level
#[rocket::async_trait]
impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, _: &'r Request<'_>) -> rocket::response::Result<'static> {
        let status = match self {
            AppError::DatabaseError(_) => Status::InternalServerError,
            AppError::AuthError(_) => Status::Unauthorized,
            AppError::Forbidden(_) => Status::Forbidden,
            AppError::NotFound(_) => Status::NotFound,
            AppError::Conflict(_) => Status::Conflict,
            AppError::ValidationError(_)
            | AppError::BadRequest(_)
            | AppError::DepartureClosed(_)
            | AppError::DepartureInPast(_)
            | AppError::CapacityExceeded(_)
            | AppError::FlightNotLinked(_)
            | AppError::ReturnEqualsOutbound(_)
            | AppError::FlightNotCompatible(_) => Status::BadRequest,
            AppError::RecommendationUnavailable(_) => Status::ServiceUnavailable,
        };

        let json = json!({
            "error": self.to_string()
        });

        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(None, Cursor::new(json.to_string()))
            .ok()
    }
}
