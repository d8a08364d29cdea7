use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::models::{
    ChangePasswordRequest, LoginRequest, NewUser, RegisterRequest, UpdateProfileRequest, User,
};
use crate::state::AppState;

pub const EMAIL_ALREADY_REGISTERED: &str = "An account with this email already exists";
pub const EMAIL_IN_USE: &str = "This email is already in use";
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const WRONG_CURRENT_PASSWORD: &str = "Current password is incorrect";
const ACCOUNT_GONE: &str = "User belonging to this token no longer exists";

/// A user together with a freshly issued session token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

pub async fn register(state: &AppState, request: RegisterRequest) -> Result<Session, AppError> {
    let request = request.normalized();
    request.validate()?;

    if state.users.email_in_use(&request.email, None).await? {
        return Err(AppError::Conflict(EMAIL_ALREADY_REGISTERED.into()));
    }

    let password_hash = state.passwords.hash(&request.password).await?;
    let user = state
        .users
        .insert_user(NewUser {
            name: request.name,
            email: request.email,
            password_hash,
        })
        .await?;
    let token = state.tokens.issue(user.id)?;

    log::info!("registered user {}", user.id);
    Ok(Session { user, token })
}

/// Checks the credentials and issues a new token.
///
/// An unknown email and a wrong password fail with the same message and the
/// same bcrypt work, so callers cannot tell which addresses are registered.
pub async fn login(state: &AppState, request: LoginRequest) -> Result<Session, AppError> {
    let request = request.normalized();
    request.validate()?;

    let Some(credentials) = state.users.find_credentials_by_email(&request.email).await? else {
        state.passwords.verify_decoy(&request.password).await?;
        log::debug!("login failed: unknown email");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    };

    if !state
        .passwords
        .verify(&request.password, &credentials.password_hash())
        .await?
    {
        log::debug!("login failed: wrong password for {}", credentials.user.id);
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let token = state.tokens.issue(credentials.user.id)?;
    Ok(Session {
        user: credentials.user,
        token,
    })
}

pub async fn me(state: &AppState, caller_id: Uuid) -> Result<User, AppError> {
    state
        .users
        .find_user(caller_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized(ACCOUNT_GONE.into()))
}

/// Changes name, email, bio and avatar. Nothing else on the account is reachable from here.
pub async fn update_profile(
    state: &AppState,
    caller: &User,
    request: UpdateProfileRequest,
) -> Result<User, AppError> {
    let request = request.normalized();
    request.validate()?;
    let changes = request.into_changes();

    if let Some(email) = changes.email.as_deref().filter(|email| *email != caller.email) {
        if state.users.email_in_use(email, Some(caller.id)).await? {
            return Err(AppError::Conflict(EMAIL_IN_USE.into()));
        }
    }

    if changes.is_empty() {
        return me(state, caller.id).await;
    }

    state
        .users
        .update_profile(caller.id, &changes)
        .await?
        .ok_or_else(|| AppError::Unauthorized(ACCOUNT_GONE.into()))
}

/// Replaces the password and returns a new token. Earlier tokens keep working until they expire.
pub async fn change_password(
    state: &AppState,
    caller_id: Uuid,
    request: ChangePasswordRequest,
) -> Result<String, AppError> {
    request.validate()?;

    let credentials = state
        .users
        .find_credentials(caller_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized(ACCOUNT_GONE.into()))?;

    if !state
        .passwords
        .verify(&request.current_password, &credentials.password_hash())
        .await?
    {
        return Err(AppError::Unauthorized(WRONG_CURRENT_PASSWORD.into()));
    }

    let new_hash = state.passwords.hash(&request.new_password).await?;
    if !state.users.update_password(caller_id, &new_hash).await? {
        return Err(AppError::Unauthorized(ACCOUNT_GONE.into()));
    }

    log::info!("password changed for user {}", caller_id);
    Ok(state.tokens.issue(caller_id)?)
}
