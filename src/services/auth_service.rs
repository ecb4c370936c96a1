use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit,
    db::OrmConn,
    dto::auth::{Claims, LoginRequest, LoginResponse, RegisterRequest},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, jwt_secret},
    models::{DEFAULT_AVATAR, User, UserRole},
    response::ApiResponse,
    state::AppState,
};

const TOKEN_TTL_HOURS: i64 = 24;
const USERNAME_TAKEN: &str = "Username is already taken";

/// Passwords are trimmed before hashing and before verification.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.trim().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.trim().as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn issue_token(user_id: Uuid, role: UserRole, secret: &str) -> AppResult<(String, i64)> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(TOKEN_TTL_HOURS))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.as_str().to_string(),
        exp: expiration.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;

    Ok((token, expiration.timestamp()))
}

/// Look up a user by credentials; `None` when the username is unknown or the
/// password does not match.
pub async fn auth_user(
    orm: &OrmConn,
    username: &str,
    password: &str,
) -> AppResult<Option<UserModel>> {
    let user = Users::find()
        .filter(UserCol::Username.eq(username.trim()))
        .one(orm)
        .await?;

    match user {
        Some(user) if verify_password(password, &user.password_hash)? => Ok(Some(user)),
        _ => Ok(None),
    }
}

/// Register a customer account.
pub async fn add_user(
    orm: &OrmConn,
    payload: RegisterRequest,
    role: UserRole,
) -> AppResult<UserModel> {
    let RegisterRequest {
        name,
        username,
        password,
        avatar,
    } = payload;
    let username = username.trim().to_string();

    if username.is_empty() {
        return Err(AppError::BadRequest("Username is required".into()));
    }
    if password.trim().is_empty() {
        return Err(AppError::BadRequest("Password is required".into()));
    }

    let exist = Users::find()
        .filter(UserCol::Username.eq(username.as_str()))
        .one(orm)
        .await?;
    if exist.is_some() {
        return Err(AppError::BadRequest(USERNAME_TAKEN.into()));
    }

    let avatar = avatar
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_AVATAR.to_string());

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.filter(|n| !n.trim().is_empty())),
        username: Set(username),
        password_hash: Set(hash_password(&password)?),
        avatar: Set(avatar),
        role: Set(role.as_str().to_string()),
        created_at: NotSet,
    }
    .insert(orm)
    .await
    .map_err(|e| AppError::unique_or(e, USERNAME_TAKEN))?;

    Ok(user)
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    let user = add_user(&state.orm, payload, UserRole::Customer).await?;
    tracing::info!(user_id = %user.id, username = %user.username, "user registered");

    audit::record(
        &state.pool,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success("User created", user_from_entity(user), None))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { username, password } = payload;
    let user = match auth_user(&state.orm, &username, &password).await? {
        Some(u) => u,
        None => return Err(AppError::BadRequest("Invalid username or password".into())),
    };

    let role = user
        .role
        .parse::<UserRole>()
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
    let (token, expires_at) = issue_token(user.id, role, &jwt_secret()?)?;

    audit::record(
        &state.pool,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::single(
        "Logged in",
        LoginResponse {
            token,
            token_type: "Bearer".into(),
            expires_at,
        },
    ))
}

pub async fn get_user_by_id(orm: &OrmConn, id: Uuid) -> AppResult<Option<UserModel>> {
    Ok(Users::find_by_id(id).one(orm).await?)
}

pub async fn current_user(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let found = get_user_by_id(&state.orm, user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::single("Current user", user_from_entity(found)))
}

pub(crate) fn user_from_entity(model: UserModel) -> User {
    User {
        id: model.id,
        name: model.name,
        username: model.username,
        avatar: model.avatar,
        role: model.role,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
