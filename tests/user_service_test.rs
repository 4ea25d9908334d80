use ctor::dtor;
use tour_agency_backend::models::user::{
    UserFilter, UserLoginRequest, UserRegistrationRequest, UserRole,
};
use tour_agency_backend::services::user_service::UserService;
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

fn registration(tag: &str) -> UserRegistrationRequest {
    UserRegistrationRequest {
        username: format!("user_{tag}"),
        email: format!("{tag}@example.com"),
        password: "password123".to_string(),
        phone: None,
    }
}

fn login(tag: &str, password: &str) -> UserLoginRequest {
    UserLoginRequest {
        email: format!("{tag}@example.com"),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn register_then_login_round_trip() -> anyhow::Result<()> {
    let Some(pool) = TestDb::get_instance().await? else {
        return Ok(());
    };
    std::env::set_var("JWT_SECRET", "test-secret");
    let service = UserService::new(pool.clone());

    let registered = service.register(registration("auth")).await?;
    assert_eq!(registered.status, "registered");

    let session = service.login(login("auth", "password123")).await?;
    assert_eq!(session.user_id, registered.user_id);
    assert_eq!(session.role, UserRole::User);
    assert!(!session.token.is_empty());

    let err = service.login(login("auth", "wrong")).await.unwrap_err();
    assert!(matches!(err, AppError::AuthError(_)));
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() -> anyhow::Result<()> {
    let Some(pool) = TestDb::get_instance().await? else {
        return Ok(());
    };
    let service = UserService::new(pool.clone());

    service.register(registration("dup")).await?;
    let err = service.register(registration("dup")).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    Ok(())
}

#[tokio::test]
async fn short_password_is_rejected() -> anyhow::Result<()> {
    let Some(pool) = TestDb::get_instance().await? else {
        return Ok(());
    };
    let service = UserService::new(pool.clone());

    let mut request = registration("short");
    request.password = "abc".to_string();
    let err = service.register(request).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
    Ok(())
}

#[tokio::test]
async fn deactivated_accounts_cannot_log_in() -> anyhow::Result<()> {
    let Some(pool) = TestDb::get_instance().await? else {
        return Ok(());
    };
    std::env::set_var("JWT_SECRET", "test-secret");
    let service = UserService::new(pool.clone());

    let registered = service.register(registration("inactive")).await?;
    let deactivated = service.deactivate(registered.user_id).await?;
    assert!(!deactivated.active);

    let err = service
        .login(login("inactive", "password123"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AuthError(_)));
    Ok(())
}

#[tokio::test]
async fn listing_filters_by_email() -> anyhow::Result<()> {
    let Some(pool) = TestDb::get_instance().await? else {
        return Ok(());
    };
    let service = UserService::new(pool.clone());

    service.register(registration("list_a")).await?;
    service.register(registration("list_b")).await?;

    let filter = UserFilter {
        email: Some("list_a@example.com".to_string()),
        ..Default::default()
    };
    let page = service.list_paged(&filter, 0, 20).await?;
    assert_eq!(page.total_elements, 1);
    assert_eq!(page.content[0].email, "list_a@example.com");
    Ok(())
}
