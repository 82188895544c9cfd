use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use bcrypt::verify;
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::http_error::AppError;
use crate::plugins::auth::handlers::AuthUser;
use crate::plugins::media::store::DynMediaStore;
use crate::plugins::users::models::{
    ChangePassword, CreateUser, Message, OtpRequest, ProfileDto, ResetPassword, SearchQuery, UpdateProfile, UserDto,
    UserSummary, VerifyOtp,
};
use crate::plugins::users::otp::{Channel, OtpPurpose, OtpService};
use crate::plugins::users::repo::{self, NewUser};

#[derive(Clone)]
pub struct UsersState {
    pub pool: PgPool,
    pub otp: OtpService,
    pub media: DynMediaStore,
}

const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn validate_username(username: &str) -> Result<(), AppError> {
    let len = username.chars().count();
    if !(3..=150).contains(&len) {
        return Err(AppError::bad_request("username must be 3 to 150 characters"));
    }
    if !username.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
        return Err(AppError::bad_request("username may only contain letters, digits, '_' and '.'"));
    }
    Ok(())
}

pub(crate) fn validate_new_password(password: &str, confirm: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request("password too short"));
    }
    if password != confirm {
        return Err(AppError::bad_request("password and confirm password do not match"));
    }
    Ok(())
}

pub(crate) fn validate_registration(payload: &CreateUser) -> Result<(), AppError> {
    validate_username(&payload.username)?;
    if !payload.email.contains('@') {
        return Err(AppError::bad_request("invalid email"));
    }
    validate_new_password(&payload.password, &payload.confirm_password)?;
    if let Some(phone) = payload.phone_number.as_deref() {
        validate_phone(phone)?;
    }
    Ok(())
}

/// Accepts E.164-style numbers: a leading `+` and 8 to 15 digits.
pub(crate) fn validate_phone(phone: &str) -> Result<(), AppError> {
    let digits = phone.strip_prefix('+').unwrap_or("");
    if !(8..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::bad_request("invalid phone number"));
    }
    Ok(())
}

pub(crate) fn validate_date_of_birth(date: NaiveDate, today: NaiveDate) -> Result<(), AppError> {
    if date > today {
        return Err(AppError::bad_request("date of birth is in the future"));
    }
    Ok(())
}

pub async fn register(State(state): State<UsersState>, Json(payload): Json<CreateUser>) -> Result<(StatusCode, Json<UserDto>), AppError> {
    validate_registration(&payload)?;

    let user = repo::insert_user(
        &state.pool,
        NewUser {
            username: payload.username.trim(),
            email: payload.email.trim(),
            password: &payload.password,
            first_name: payload.first_name.trim(),
            last_name: payload.last_name.trim(),
            phone_number: payload.phone_number.as_deref(),
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn send_code(state: &UsersState, req: &OtpRequest, purpose: OtpPurpose) -> Result<(), AppError> {
    let contact = repo::find_contact(&state.pool, &req.username).await?;
    let address = match req.channel {
        Channel::Email => contact.email,
        Channel::Sms => contact
            .phone_number
            .ok_or_else(|| AppError::bad_request("no phone number on file").with_code("missing_phone"))?,
    };
    state
        .otp
        .issue(contact.id, purpose, req.channel, &address)
        .await
        .map_err(|e| AppError::internal(format!("otp delivery failed: {e}")))
}

async fn check_code(state: &UsersState, user_id: Uuid, purpose: OtpPurpose, code: &str) -> Result<(), AppError> {
    let ok = state
        .otp
        .verify(user_id, purpose, code)
        .await
        .map_err(|e| AppError::internal(e.to_string()))?;
    if !ok {
        return Err(AppError::bad_request("invalid or expired otp").with_code("invalid_otp"));
    }
    Ok(())
}

pub async fn request_activation(State(state): State<UsersState>, Json(req): Json<OtpRequest>) -> Result<Json<Message>, AppError> {
    send_code(&state, &req, OtpPurpose::Activation).await?;
    Ok(Json(Message::new("OTP sent successfully")))
}

pub async fn verify_activation(State(state): State<UsersState>, Json(req): Json<VerifyOtp>) -> Result<Json<Message>, AppError> {
    let contact = repo::find_contact(&state.pool, &req.username).await?;
    check_code(&state, contact.id, OtpPurpose::Activation, &req.otp).await?;
    repo::activate(&state.pool, contact.id).await?;
    tracing::info!(user_id = %contact.id, "account activated");
    Ok(Json(Message::new("OTP verified successfully and account activated")))
}

pub async fn request_password_reset(State(state): State<UsersState>, Json(req): Json<OtpRequest>) -> Result<Json<Message>, AppError> {
    send_code(&state, &req, OtpPurpose::PasswordReset).await?;
    Ok(Json(Message::new("OTP sent successfully")))
}

pub async fn reset_password(State(state): State<UsersState>, Json(req): Json<ResetPassword>) -> Result<Json<Message>, AppError> {
    validate_new_password(&req.new_password, &req.confirm_password)?;
    let contact = repo::find_contact(&state.pool, &req.username).await?;
    check_code(&state, contact.id, OtpPurpose::PasswordReset, &req.otp).await?;
    repo::set_password(&state.pool, contact.id, &req.new_password).await?;
    Ok(Json(Message::new("Password updated successfully")))
}

pub async fn me(State(state): State<UsersState>, auth: AuthUser) -> Result<Json<ProfileDto>, AppError> {
    Ok(Json(repo::get_profile(&state.pool, auth.user_id).await?))
}

pub async fn update_me(State(state): State<UsersState>, auth: AuthUser, Json(update): Json<UpdateProfile>) -> Result<Json<ProfileDto>, AppError> {
    if let Some(phone) = update.phone_number.as_deref() {
        validate_phone(phone)?;
    }
    if let Some(date) = update.date_of_birth {
        validate_date_of_birth(date, Utc::now().date_naive())?;
    }
    repo::update_profile(&state.pool, auth.user_id, update).await?;
    Ok(Json(repo::get_profile(&state.pool, auth.user_id).await?))
}

/// Replaces the profile picture with the `image` file of a multipart body.
pub async fn upload_image(State(state): State<UsersState>, auth: AuthUser, mut multipart: Multipart) -> Result<Json<ProfileDto>, AppError> {
    let mut image = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await?;
        if image.replace((file_name, bytes)).is_some() {
            return Err(AppError::bad_request("send a single image").with_code("duplicate_media"));
        }
    }
    let Some((file_name, bytes)) = image.filter(|(_, bytes)| !bytes.is_empty()) else {
        return Err(AppError::bad_request("an image file is required").with_code("invalid_media"));
    };

    let reference = state
        .media
        .put(file_name.as_deref(), &bytes)
        .await
        .map_err(|e| AppError::internal(format!("write error: {e}")))?;
    let previous = match repo::set_image(&state.pool, auth.user_id, &reference).await {
        Ok(previous) => previous,
        Err(e) => {
            let _ = state.media.remove(&reference).await;
            return Err(e);
        }
    };
    if let Some(old) = previous {
        if let Err(e) = state.media.remove(&old).await {
            tracing::warn!(error = %e, reference = %old, "could not drop replaced profile picture");
        }
    }
    Ok(Json(repo::get_profile(&state.pool, auth.user_id).await?))
}

pub async fn change_password(State(state): State<UsersState>, auth: AuthUser, Json(req): Json<ChangePassword>) -> Result<Json<Message>, AppError> {
    let current = repo::password_hash(&state.pool, auth.user_id).await?;
    let ok = verify(&req.password, &current).map_err(|e| AppError::internal(e.to_string()))?;
    if !ok {
        return Err(AppError::bad_request("wrong password").with_code("invalid_credentials"));
    }
    validate_new_password(&req.new_password, &req.confirm_password)?;
    repo::set_password(&state.pool, auth.user_id, &req.new_password).await?;
    Ok(Json(Message::new("Password updated successfully")))
}

pub async fn delete_me(State(state): State<UsersState>, auth: AuthUser) -> Result<StatusCode, AppError> {
    repo::delete_user(&state.pool, auth.user_id).await?;
    tracing::info!(user_id = %auth.user_id, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn search(State(state): State<UsersState>, _auth: AuthUser, Query(q): Query<SearchQuery>) -> Result<Json<Vec<UserSummary>>, AppError> {
    let term = q.search.as_deref().map(str::trim).unwrap_or("");
    if term.is_empty() {
        return Ok(Json(Vec::new()));
    }
    Ok(Json(repo::search_users(&state.pool, term).await?))
}

pub async fn profile(State(state): State<UsersState>, _auth: AuthUser, Path(id): Path<Uuid>) -> Result<Json<ProfileDto>, AppError> {
    Ok(Json(repo::get_profile(&state.pool, id).await?))
}
