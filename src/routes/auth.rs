use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{ChangePasswordRequest, LoginRequest, RegisterRequest, UpdateProfileRequest},
    response::ApiResponse,
    services::accounts,
    state::AppState,
};
use actix_web::{get, post, put, web, HttpResponse, Responder};

/// Register a new user
///
/// Creates the account and returns its public fields together with a session token.
///
/// ## Responses:
/// - `201 Created`: `{ success, message, data: User, token }`.
/// - `400 Bad Request`: Name, email or password fail validation.
/// - `409 Conflict`: The email is already registered.
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    let session = accounts::register(&state, register_data.into_inner()).await?;

    Ok(HttpResponse::Created().json(
        ApiResponse::data(session.user)
            .with_message("Account created successfully")
            .with_token(session.token),
    ))
}

/// Login user
///
/// Unknown email and wrong password both answer `401 Invalid email or password`.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let session = accounts::login(&state, login_data.into_inner()).await?;

    Ok(HttpResponse::Ok().json(
        ApiResponse::data(session.user)
            .with_message("Login successful")
            .with_token(session.token),
    ))
}

#[get("/me")]
pub async fn me(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let user = accounts::me(&state, user.id()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(user)))
}

/// Update the caller's name, email, bio or avatar.
///
/// Other keys in the body (password, id, timestamps) are ignored.
#[put("/profile")]
pub async fn update_profile(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    profile_data: web::Json<UpdateProfileRequest>,
) -> Result<impl Responder, AppError> {
    let user = accounts::update_profile(&state, &user.0, profile_data.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(user).with_message("Profile updated successfully")))
}

/// Change the caller's password and hand back a fresh token.
#[put("/password")]
pub async fn change_password(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    password_data: web::Json<ChangePasswordRequest>,
) -> Result<impl Responder, AppError> {
    let token = accounts::change_password(&state, user.id(), password_data.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Password updated successfully").with_token(token)))
}
