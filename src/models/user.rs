use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use validator::Validate;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display, EnumString,
    sqlx::Type,
)]
#[sqlx(type_name = "ENUM")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    #[sqlx(rename = "USER")]
    User,
    #[sqlx(rename = "MANAGER")]
    Manager,
    #[sqlx(rename = "ADMIN")]
    Admin,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct UserRegistrationRequest {
    #[validate(length(min = 1, max = 255))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 255))]
    pub password: String,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UserLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct UserLoginResponse {
    pub token: String,
    pub user_id: i64,
    pub role: UserRole,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct RegisterResponse {
    pub user_id: i64,
    pub status: String,
}

/// Admin-created account; unlike registration the role is free to pick.
#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct UserCreateRequest {
    #[validate(length(min = 1, max = 255))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 255))]
    pub password: String,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    pub role: UserRole,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct UserUpdateRequest {
    #[validate(length(min = 1, max = 255))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    /// When set, the password is re-hashed; otherwise left untouched.
    #[validate(length(min = 8, max = 255))]
    pub password: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    pub role: UserRole,
    pub active: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub active: bool,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        UserResponse {
            id: u.id,
            username: u.username,
            email: u.email,
            phone: u.phone,
            role: u.role,
            active: u.is_active,
        }
    }
}

/// Optional filters for the admin user listing; absent means no constraint.
#[derive(Debug, Default)]
pub struct UserFilter {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub active: Option<bool>,
}
