use sqlx::SqlitePool;

use crate::{
    db,
    error::{AppError, AppResult},
    models::ProfileRecord,
    session::SessionStore,
    validation::{validate_profile, ProfileForm},
};

pub fn decode_profile(raw: &str) -> AppResult<ProfileRecord> {
    if raw.trim().is_empty() {
        return Ok(ProfileRecord::default());
    }
    Ok(serde_json::from_str(raw)?)
}

pub async fn get_profile(pool: &SqlitePool, practitioner_id: &str) -> AppResult<ProfileRecord> {
    let user = db::find_user(pool, practitioner_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Praticien introuvable".to_string()))?;
    decode_profile(&user.profile_data)
}

/// Any validation error rejects the submission; nothing is written in that case.
pub async fn update_profile(
    pool: &SqlitePool,
    sessions: &SessionStore,
    token: &str,
    practitioner_id: &str,
    form: &ProfileForm,
) -> AppResult<ProfileRecord> {
    let errors = validate_profile(form);
    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }

    let record = ProfileRecord::from_form(form);
    let payload = serde_json::to_string(&record)?;
    if db::update_profile_data(pool, practitioner_id, &payload).await? == 0 {
        return Err(AppError::NotFound("Praticien introuvable".to_string()));
    }

    sessions
        .update(token, |session| {
            session.profile = record.clone();
            session.email = record.email.clone();
        })
        .await;

    log::info!("Profile updated for practitioner {practitioner_id}");
    Ok(record)
}
