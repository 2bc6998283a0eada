use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::auth::{
    dto::{
        ForgotPasswordRequest, LoginData, LoginRequest, PublicUser, RegisterRequest,
        ResendOtpRequest, ResetPasswordRequest, VerifyOtpRequest,
    },
    repo::{self, NewUser, UserUpdate},
    services::{
        generate_otp, hash_password, is_strong_password, is_valid_email, is_valid_phone,
        otp_expiry_ts, verify_password, JwtKeys,
    },
};
use crate::db::now_ts;
use crate::email::{otp_email, password_changed_email, password_reset_email};
use crate::error::{ApiError, Envelope};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/verify-otp", post(verify_otp))
        .route("/resend-otp", post(resend_otp))
        .route("/login", post(login))
        .route("/forgot", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

fn validate_register(payload: &RegisterRequest) -> Vec<String> {
    let mut errors = Vec::new();
    if payload.full_name.is_empty() {
        errors.push("Full name is required".to_string());
    } else if payload.full_name.len() > 100 {
        errors.push("Full name cannot exceed 100 characters".to_string());
    }
    if !is_valid_email(&payload.email) {
        errors.push("Please provide a valid email".to_string());
    }
    if !is_valid_phone(&payload.phone_number) {
        errors.push("Please provide a valid phone number".to_string());
    }
    if !is_strong_password(&payload.password) {
        errors.push(
            "Password must be at least 8 characters with one uppercase letter, one lowercase \
             letter, one number and one special character"
                .to_string(),
        );
    }
    errors
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Envelope<PublicUser>>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.full_name = payload.full_name.trim().to_string();
    payload.phone_number = payload.phone_number.trim().to_string();

    let errors = validate_register(&payload);
    if !errors.is_empty() {
        warn!(email = %payload.email, "register validation failed");
        return Err(ApiError::Validation(errors));
    }

    if repo::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::BadRequest(
            "User already exists with this email".to_string(),
        ));
    }

    let otp = generate_otp();
    let user = repo::create(
        &state.db,
        NewUser {
            full_name: payload.full_name,
            email: payload.email.clone(),
            phone_number: payload.phone_number,
            password_hash: hash_password(&payload.password)?,
            otp: otp.clone(),
            otp_expires: otp_expiry_ts(state.config.otp_expiry_minutes),
            role: "student".to_string(),
        },
    )
    .await?;

    let (subject, html) = otp_email(&otp, state.config.otp_expiry_minutes);
    state.mailer.send(&user.email, &subject, &html).await?;

    info!(user_id = %user.user_id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Envelope::data(
            "OTP sent to your email for verification",
            PublicUser::from(&user),
        ),
    ))
}

#[instrument(skip(state, payload))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<Envelope<PublicUser>>, ApiError> {
    let user = repo::find_by_email(&state.db, payload.email.trim()).await?;
    let now = now_ts();

    let user = match user {
        Some(u) if u.otp.is_some() && u.otp_expires.map(|e| e >= now).unwrap_or(false) => u,
        _ => {
            warn!(email = %payload.email, "otp missing or expired");
            return Err(ApiError::BadRequest(
                "Invalid OTP or OTP expired".to_string(),
            ));
        }
    };

    if user.otp.as_deref() != Some(payload.otp.trim()) {
        warn!(user_id = %user.user_id, "otp mismatch");
        return Err(ApiError::BadRequest("Invalid OTP".to_string()));
    }

    let updated = repo::update(
        &state.db,
        user.user_id,
        UserUpdate {
            email_verified: Some(true),
            otp: Some(None),
            otp_expires: Some(None),
            ..Default::default()
        },
    )
    .await?;

    info!(user_id = %updated.user_id, "email verified");
    Ok(Envelope::data(
        "Email verified successfully",
        PublicUser::from(&updated),
    ))
}

#[instrument(skip(state, payload))]
pub async fn resend_otp(
    State(state): State<AppState>,
    Json(payload): Json<ResendOtpRequest>,
) -> Result<Json<Envelope<()>>, ApiError> {
    let user = repo::find_by_email(&state.db, payload.email.trim())
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if user.email_verified {
        return Err(ApiError::BadRequest(
            "Email is already verified".to_string(),
        ));
    }

    let otp = generate_otp();
    repo::update(
        &state.db,
        user.user_id,
        UserUpdate {
            otp: Some(Some(otp.clone())),
            otp_expires: Some(Some(otp_expiry_ts(state.config.otp_expiry_minutes))),
            ..Default::default()
        },
    )
    .await?;

    let (subject, html) = otp_email(&otp, state.config.otp_expiry_minutes);
    state.mailer.send(&user.email, &subject, &html).await?;

    info!(user_id = %user.user_id, "otp resent");
    Ok(Envelope::message("New OTP sent to your email"))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<Envelope<LoginData>>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    if !is_valid_email(&payload.email) || payload.password.is_empty() {
        return Err(ApiError::Validation(vec![
            "Email and password are required".to_string(),
        ]));
    }

    let user = repo::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            ApiError::Unauthorized("Invalid credentials".to_string())
        })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.user_id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    // Correct credentials are not enough: the address has to be verified.
    if !user.email_verified {
        return Err(ApiError::Forbidden(
            "Email not verified. Please verify your email first.".to_string(),
        ));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_access(user.user_id, &user.email, &user.role)?;

    info!(user_id = %user.user_id, "user logged in");
    Ok(Envelope::data(
        "Login successful",
        LoginData {
            token,
            user: PublicUser::from(&user),
        },
    ))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<Envelope<()>>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::Validation(vec![
            "Please provide a valid email".to_string(),
        ]));
    }

    // Same response whether or not the account exists, to block enumeration.
    let Some(user) = repo::find_by_email(&state.db, &email).await? else {
        return Ok(Envelope::message(
            "If an account exists with this email, a password reset link has been sent",
        ));
    };

    let keys = JwtKeys::from_ref(&state);
    let reset_token = keys.sign_reset(user.user_id, &user.email)?;
    repo::update(
        &state.db,
        user.user_id,
        UserUpdate {
            reset_token: Some(Some(reset_token.clone())),
            reset_token_expires: Some(Some(now_ts() + state.config.jwt.reset_expires_secs)),
            ..Default::default()
        },
    )
    .await?;

    let reset_url = format!(
        "{}/reset-password?token={}",
        state.config.client_url, reset_token
    );
    let (subject, html) = password_reset_email(&reset_url);
    state.mailer.send(&user.email, &subject, &html).await?;

    info!(user_id = %user.user_id, "password reset link sent");
    Ok(Envelope::message("Password reset link sent to your email"))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<Envelope<()>>, ApiError> {
    if !is_strong_password(&payload.password) {
        return Err(ApiError::Validation(vec![
            "Password must be at least 8 characters with one uppercase letter, one lowercase \
             letter, one number and one special character"
                .to_string(),
        ]));
    }

    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_reset(&payload.token)?;

    let user = repo::find_by_id(&state.db, claims.sub).await?;
    let user = match user {
        Some(u)
            if u.reset_token.as_deref() == Some(payload.token.as_str())
                && u.reset_token_expires.is_some() =>
        {
            u
        }
        _ => {
            warn!(user_id = %claims.sub, "reset token not on record");
            return Err(ApiError::BadRequest(
                "Invalid or expired reset token".to_string(),
            ));
        }
    };

    if user.reset_token_expires.unwrap_or(0) < now_ts() {
        return Err(ApiError::BadRequest("Reset token has expired".to_string()));
    }

    repo::update(
        &state.db,
        user.user_id,
        UserUpdate {
            password_hash: Some(hash_password(&payload.password)?),
            reset_token: Some(None),
            reset_token_expires: Some(None),
            ..Default::default()
        },
    )
    .await?;

    let (subject, html) = password_changed_email();
    state.mailer.send(&user.email, &subject, &html).await?;

    info!(user_id = %user.user_id, "password reset");
    Ok(Envelope::message("Password reset successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_register() -> RegisterRequest {
        RegisterRequest {
            full_name: "Hana Sato".into(),
            email: "hana@example.com".into(),
            phone_number: "+91 98765 43210".into(),
            password: "Str0ng!Pass".into(),
        }
    }

    #[test]
    fn valid_registration_passes_validation() {
        assert!(validate_register(&valid_register()).is_empty());
    }

    #[test]
    fn register_validation_accumulates_errors() {
        let payload = RegisterRequest {
            full_name: "".into(),
            email: "not-an-email".into(),
            phone_number: "x".into(),
            password: "weak".into(),
        };
        let errors = validate_register(&payload);
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn overlong_name_is_rejected() {
        let mut payload = valid_register();
        payload.full_name = "x".repeat(101);
        let errors = validate_register(&payload);
        assert_eq!(errors, vec!["Full name cannot exceed 100 characters"]);
    }

    #[test]
    fn masked_user_serialization_has_no_secrets() {
        let user = crate::auth::repo::UserRecord {
            user_id: uuid::Uuid::new_v4(),
            full_name: "Hana Sato".into(),
            email: "hana@example.com".into(),
            phone_number: "+91 98765 43210".into(),
            password_hash: "$argon2id$secret".into(),
            email_verified: true,
            otp: Some("042917".into()),
            otp_expires: Some(1_900_000_000),
            reset_token: Some("tok".into()),
            reset_token_expires: Some(1_900_000_000),
            role: "student".into(),
            created_at: 0,
            updated_at: 0,
        };
        let json = serde_json::to_string(&PublicUser::from(&user)).unwrap();
        assert!(json.contains("hana@example.com"));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("042917"));
        assert!(!json.contains("resetToken"));
    }
}
