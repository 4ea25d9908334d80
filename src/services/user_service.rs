use crate::models::pagination::{offset, PageResponse};
use crate::models::user::{
    RegisterResponse, User, UserCreateRequest, UserFilter, UserLoginRequest, UserLoginResponse,
    UserRegistrationRequest, UserResponse, UserRole, UserUpdateRequest,
};
use crate::utils::error::{is_foreign_key_violation, is_unique_violation, AppError, AppResult};
use crate::utils::jwt;
use sqlx::{MySql, MySqlPool, QueryBuilder};
use validator::Validate;

const USER_COLUMNS: &str = "id, username, email, password_hash, phone, role, is_active";

pub struct UserService {
    pool: MySqlPool,
}

impl UserService {
    pub fn new(pool: MySqlPool) -> Self {
        UserService { pool }
    }

    /// Self-service registration; always creates a USER role account.
    pub async fn register(&self, request: UserRegistrationRequest) -> AppResult<RegisterResponse> {
        request
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let password_hash = bcrypt::hash(&request.password, bcrypt::DEFAULT_COST)
            .map_err(|e| AppError::AuthError(format!("Failed to hash password: {e}")))?;

        let result = sqlx::query(
            "INSERT INTO app_users (username, email, password_hash, phone, role, is_active) \
             VALUES (?, ?, ?, ?, ?, TRUE)",
        )
        .bind(&request.username)
        .bind(&request.email)
        .bind(&password_hash)
        .bind(&request.phone)
        .bind(UserRole::User)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Email {} is already registered", request.email))
            } else {
                e.into()
            }
        })?;

        Ok(RegisterResponse {
            user_id: result.last_insert_id() as i64,
            status: "registered".to_string(),
        })
    }

    pub async fn login(&self, request: UserLoginRequest) -> AppResult<UserLoginResponse> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM app_users WHERE email = ?"
        ))
        .bind(&request.email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::AuthError("Invalid email or password".to_string()))?;

        if !user.is_active {
            return Err(AppError::AuthError("Account is deactivated".to_string()));
        }

        let valid = bcrypt::verify(&request.password, &user.password_hash)
            .map_err(|e| AppError::AuthError(format!("Failed to verify password: {e}")))?;
        if !valid {
            return Err(AppError::AuthError("Invalid email or password".to_string()));
        }

        let token = jwt::generate_token(user.id, user.role)
            .map_err(|e| AppError::AuthError(format!("Failed to generate token: {e}")))?;
        Ok(UserLoginResponse {
            token,
            user_id: user.id,
            role: user.role,
        })
    }

    /// Admin creation with an explicit role.
    pub async fn create(&self, request: UserCreateRequest) -> AppResult<UserResponse> {
        request
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let password_hash = bcrypt::hash(&request.password, bcrypt::DEFAULT_COST)
            .map_err(|e| AppError::AuthError(format!("Failed to hash password: {e}")))?;

        let result = sqlx::query(
            "INSERT INTO app_users (username, email, password_hash, phone, role, is_active) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.username)
        .bind(&request.email)
        .bind(&password_hash)
        .bind(&request.phone)
        .bind(request.role)
        .bind(request.active.unwrap_or(true))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Email {} is already registered", request.email))
            } else {
                e.into()
            }
        })?;

        self.get_by_id(result.last_insert_id() as i64).await
    }

    pub async fn update(&self, id: i64, request: UserUpdateRequest) -> AppResult<UserResponse> {
        request
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let current = self.require(id).await?;
        let password_hash = match request.password {
            Some(ref password) => bcrypt::hash(password, bcrypt::DEFAULT_COST)
                .map_err(|e| AppError::AuthError(format!("Failed to hash password: {e}")))?,
            None => current.password_hash,
        };

        sqlx::query(
            "UPDATE app_users SET username = ?, email = ?, password_hash = ?, phone = ?, \
             role = ?, is_active = ? WHERE id = ?",
        )
        .bind(&request.username)
        .bind(&request.email)
        .bind(&password_hash)
        .bind(&request.phone)
        .bind(request.role)
        .bind(request.active)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Email {} is already registered", request.email))
            } else {
                e.into()
            }
        })?;

        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM app_users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await;
        match result {
            Ok(r) if r.rows_affected() == 0 => {
                Err(AppError::NotFound(format!("User with id={id} not found")))
            }
            Ok(_) => Ok(()),
            Err(e) if is_foreign_key_violation(&e) => Err(AppError::Conflict(format!(
                "User with id={id} has bookings or tours and cannot be deleted"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn deactivate(&self, id: i64) -> AppResult<UserResponse> {
        self.require(id).await?;
        sqlx::query("UPDATE app_users SET is_active = FALSE WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.get_by_id(id).await
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<UserResponse> {
        Ok(self.require(id).await?.into())
    }

    pub async fn list_paged(
        &self,
        filter: &UserFilter,
        page: u32,
        size: u32,
    ) -> AppResult<PageResponse<UserResponse>> {
        let mut count = QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM app_users WHERE 1=1");
        push_user_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query =
            QueryBuilder::<MySql>::new(format!("SELECT {USER_COLUMNS} FROM app_users WHERE 1=1"));
        push_user_filters(&mut query, filter);
        query.push(" ORDER BY username ASC, id ASC LIMIT ");
        query.push_bind(size);
        query.push(" OFFSET ");
        query.push_bind(offset(page, size));

        let users = query.build_query_as::<User>().fetch_all(&self.pool).await?;

        Ok(PageResponse::new(
            page,
            size,
            total as u64,
            users.into_iter().map(UserResponse::from).collect(),
        ))
    }

    async fn require(&self, id: i64) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM app_users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id={id} not found")))
    }
}

fn push_user_filters(qb: &mut QueryBuilder<'_, MySql>, filter: &UserFilter) {
    if let Some(ref username) = filter.username {
        qb.push(" AND username LIKE ")
            .push_bind(format!("%{username}%"));
    }
    if let Some(ref email) = filter.email {
        qb.push(" AND email = ").push_bind(email.clone());
    }
    if let Some(role) = filter.role {
        qb.push(" AND role = ").push_bind(role);
    }
    if let Some(active) = filter.active {
        qb.push(" AND is_active = ").push_bind(active);
    }
}
