use actix_web::{
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header,
    middleware::Next,
    web, Error, HttpMessage, HttpRequest, HttpResponse,
};
use actix_web::cookie::{time::Duration, Cookie, SameSite};
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand_core::OsRng;
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    db,
    error::{AppError, AppResult},
    models::UserRow,
    state::AppState,
    validation::{normalize_email, validate_registration, ValidationError},
};

pub const SESSION_COOKIE: &str = "docpanel_session";
const INVALID_CREDENTIALS: &str = "Identifiants invalides.";

pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// A digest that does not parse is a failed verification, not an error.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub async fn register_practitioner(
    pool: &SqlitePool,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> AppResult<String> {
    validate_registration(email, password, confirm_password)?;

    let email = normalize_email(email);
    if db::email_exists(pool, &email).await? {
        return Err(ValidationError::EmailTaken.into());
    }

    let password_hash =
        hash_password(password).map_err(|err| AppError::Hashing(err.to_string()))?;
    let id = db::insert_user(pool, &email, &password_hash).await?;
    log::info!("Registered practitioner {id}");
    Ok(id)
}

pub async fn authenticate_credentials(
    pool: &SqlitePool,
    email: &str,
    password: &str,
) -> AppResult<UserRow> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(AppError::Auth("Email et mot de passe requis.".to_string()));
    }

    let user = db::find_user_by_email(pool, &email)
        .await?
        .ok_or_else(|| AppError::Auth(INVALID_CREDENTIALS.to_string()))?;

    if !verify_password(password, &user.password_hash) {
        log::warn!("Failed login for practitioner {}", user.id);
        return Err(AppError::Auth(INVALID_CREDENTIALS.to_string()));
    }

    Ok(user)
}

pub fn session_cookie(req: &HttpRequest, token: &str, ttl: chrono::Duration) -> Cookie<'static> {
    let mut builder = Cookie::build(SESSION_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(ttl.num_seconds()));
    if req.connection_info().scheme() == "https" {
        builder = builder.secure(true);
    }
    builder.finish()
}

pub fn clear_session_cookie(req: &HttpRequest) -> Cookie<'static> {
    let mut builder = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(0));
    if req.connection_info().scheme() == "https" {
        builder = builder.secure(true);
    }
    builder.finish()
}

pub fn session_token(req: &HttpRequest) -> Option<String> {
    req.cookie(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

pub async fn session_guard<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<BoxBody>, Error>
where
    B: actix_web::body::MessageBody + 'static,
{
    let state = req.app_data::<web::Data<AppState>>().cloned();
    let context = match (state, session_token(req.request())) {
        (Some(state), Some(token)) => state.sessions.get(&token).await,
        _ => None,
    };

    let Some(context) = context else {
        let response = if req.path().starts_with("/api") {
            HttpResponse::Unauthorized()
                .insert_header((header::CACHE_CONTROL, "no-store"))
                .json(json!({ "error": "Non autorisé" }))
        } else {
            HttpResponse::SeeOther()
                .append_header((header::LOCATION, "/login"))
                .insert_header((header::CACHE_CONTROL, "no-store"))
                .finish()
        };
        return Ok(req.into_response(response));
    };

    req.extensions_mut().insert(context);
    let res = next.call(req).await?;
    Ok(res.map_into_boxed_body())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::memory_pool;

    #[test]
    fn hashed_password_verifies() {
        let digest = hash_password("secret-pass").unwrap();
        assert!(verify_password("secret-pass", &digest));
        assert!(!verify_password("wrong-pass", &digest));
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("secret-pass").unwrap();
        let second = hash_password("secret-pass").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_digest_fails_verification() {
        assert!(!verify_password("secret-pass", "not-a-phc-string"));
        assert!(!verify_password("secret-pass", ""));
    }

    #[actix_web::test]
    async fn registration_normalizes_and_rejects_duplicates() {
        let pool = memory_pool().await;
        let id = register_practitioner(&pool, " Dr@Example.MA ", "secret1", "secret1")
            .await
            .unwrap();

        let user = db::find_user(&pool, &id).await.unwrap().unwrap();
        assert_eq!(user.email, "dr@example.ma");
        assert_eq!(user.language, "both");

        let duplicate = register_practitioner(&pool, "DR@example.ma", "secret1", "secret1").await;
        match duplicate {
            Err(AppError::Validation(errors)) => assert_eq!(errors, vec!["Email déjà utilisé."]),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[actix_web::test]
    async fn registration_enforces_password_policy() {
        let pool = memory_pool().await;
        let short = register_practitioner(&pool, "dr@example.ma", "abc", "abc").await;
        assert!(matches!(short, Err(AppError::Validation(_))));
        let mismatch = register_practitioner(&pool, "dr@example.ma", "abcdef", "abcdeg").await;
        assert!(matches!(mismatch, Err(AppError::Validation(_))));
        assert!(!db::email_exists(&pool, "dr@example.ma").await.unwrap());
    }

    #[actix_web::test]
    async fn login_checks_password_and_email() {
        let pool = memory_pool().await;
        register_practitioner(&pool, "dr@example.ma", "secret1", "secret1")
            .await
            .unwrap();

        let user = authenticate_credentials(&pool, "DR@example.ma", "secret1")
            .await
            .unwrap();
        assert_eq!(user.email, "dr@example.ma");

        let wrong = authenticate_credentials(&pool, "dr@example.ma", "secret2").await;
        assert!(matches!(wrong, Err(AppError::Auth(ref msg)) if msg == INVALID_CREDENTIALS));
        let unknown = authenticate_credentials(&pool, "nobody@example.ma", "secret1").await;
        assert!(matches!(unknown, Err(AppError::Auth(ref msg)) if msg == INVALID_CREDENTIALS));
    }
}
