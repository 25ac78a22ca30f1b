use std::{env, fs, path::Path, str::FromStr};

use chrono::{Duration, Local, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::{
    auth::{hash_password, new_id},
    models::{DisplayLanguage, PatientRow, UserRow, STATUS_RESERVED},
};

const USER_COLUMNS: &str =
    "id, email, password_hash, language, profile_data, calendar, created_at, updated_at";

const PATIENT_COLUMNS: &str = "id, doctor_id, patient_nom, patient_telephone, patient_email, \
     patient_date_reservation, patient_time_reservation, status, created_at, updated_at";

pub async fn connect(db_url: &str) -> Result<SqlitePool, Box<dyn std::error::Error>> {
    ensure_sqlite_dir(db_url)?;

    let connect_options = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let path = if let Some(path) = db_url.strip_prefix("sqlite://") {
        Some(path)
    } else if let Some(path) = db_url.strip_prefix("sqlite:") {
        Some(path)
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(());
    };

    let path = path.split('?').next().unwrap_or(path);
    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    let path = path.strip_prefix("file:").unwrap_or(path);
    let db_path = Path::new(path);
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub async fn find_user_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = ? LIMIT 1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn find_user(pool: &SqlitePool, user_id: &str) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ? LIMIT 1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn email_exists(pool: &SqlitePool, email: &str) -> Result<bool, sqlx::Error> {
    let existing = sqlx::query_as::<_, (String,)>("SELECT id FROM users WHERE email = ? LIMIT 1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(existing.is_some())
}

pub async fn insert_user(
    pool: &SqlitePool,
    email: &str,
    password_hash: &str,
) -> Result<String, sqlx::Error> {
    let id = new_id();
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"INSERT INTO users (id, email, password_hash, language, profile_data, calendar, created_at, updated_at)
           VALUES (?, ?, ?, ?, '{}', '{}', ?, ?)"#,
    )
    .bind(&id)
    .bind(email)
    .bind(password_hash)
    .bind(DisplayLanguage::Both.as_str())
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn update_profile_data(
    pool: &SqlitePool,
    user_id: &str,
    profile_json: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET profile_data = ?, updated_at = ? WHERE id = ?")
        .bind(profile_json)
        .bind(Utc::now().to_rfc3339())
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn update_calendar(
    pool: &SqlitePool,
    user_id: &str,
    calendar_json: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET calendar = ?, updated_at = ? WHERE id = ?")
        .bind(calendar_json)
        .bind(Utc::now().to_rfc3339())
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn fetch_patients(
    pool: &SqlitePool,
    doctor_id: &str,
) -> Result<Vec<PatientRow>, sqlx::Error> {
    sqlx::query_as::<_, PatientRow>(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients WHERE doctor_id = ? ORDER BY created_at, rowid"
    ))
    .bind(doctor_id)
    .fetch_all(pool)
    .await
}

pub async fn find_patient(
    pool: &SqlitePool,
    patient_id: &str,
) -> Result<Option<PatientRow>, sqlx::Error> {
    sqlx::query_as::<_, PatientRow>(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ? LIMIT 1"
    ))
    .bind(patient_id)
    .fetch_optional(pool)
    .await
}

/// Every patient mutation is scoped to the owning practitioner; zero rows means not found.
pub async fn set_patient_status(
    pool: &SqlitePool,
    patient_id: &str,
    doctor_id: &str,
    status: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE patients SET status = ?, updated_at = ? WHERE id = ? AND doctor_id = ?",
    )
    .bind(status)
    .bind(Utc::now().to_rfc3339())
    .bind(patient_id)
    .bind(doctor_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn reschedule_patient(
    pool: &SqlitePool,
    patient_id: &str,
    doctor_id: &str,
    date: &str,
    time: &str,
    status: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE patients
           SET patient_date_reservation = ?, patient_time_reservation = ?, status = ?, updated_at = ?
           WHERE id = ? AND doctor_id = ?"#,
    )
    .bind(date)
    .bind(time)
    .bind(status)
    .bind(Utc::now().to_rfc3339())
    .bind(patient_id)
    .bind(doctor_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete_patient(
    pool: &SqlitePool,
    patient_id: &str,
    doctor_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM patients WHERE id = ? AND doctor_id = ?")
        .bind(patient_id)
        .bind(doctor_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[derive(Debug, Clone, Default)]
pub struct NewPatient<'a> {
    pub doctor_id: &'a str,
    pub name: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub email: Option<&'a str>,
    pub date: Option<&'a str>,
    pub time: Option<&'a str>,
}

pub async fn insert_patient(pool: &SqlitePool, patient: NewPatient<'_>) -> Result<String, sqlx::Error> {
    let id = new_id();
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"INSERT INTO patients
           (id, doctor_id, patient_nom, patient_telephone, patient_email,
            patient_date_reservation, patient_time_reservation, status, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(patient.doctor_id)
    .bind(patient.name)
    .bind(patient.phone)
    .bind(patient.email)
    .bind(patient.date)
    .bind(patient.time)
    .bind(STATUS_RESERVED)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn seed_demo(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let email = env::var("DEMO_EMAIL").unwrap_or_else(|_| "demo@docpanel.local".to_string());
    if email_exists(pool, &email).await? {
        return Ok(());
    }

    let password = env::var("DEMO_PASSWORD").unwrap_or_else(|_| "change-me".to_string());
    if password == "change-me" {
        log::warn!("DEMO_PASSWORD not set. Using default password 'change-me'. Set DEMO_PASSWORD in production.");
    }

    let password_hash = hash_password(&password)
        .map_err(|_| sqlx::Error::Protocol("password hash failed".into()))?;
    let doctor_id = insert_user(pool, &email, &password_hash).await?;

    let tomorrow = (Local::now().date_naive() + Duration::days(1))
        .format("%Y-%m-%d")
        .to_string();
    let mut calendar = serde_json::Map::new();
    calendar.insert(
        tomorrow.clone(),
        serde_json::json!([
            { "start": format!("{tomorrow}T09:00"), "end": format!("{tomorrow}T09:30") },
            { "start": format!("{tomorrow}T09:30"), "end": format!("{tomorrow}T10:00") },
            { "start": format!("{tomorrow}T10:00"), "end": format!("{tomorrow}T10:30") },
        ]),
    );
    update_calendar(pool, &doctor_id, &serde_json::Value::Object(calendar).to_string()).await?;

    for (name, time) in [("Karim Idrissi", "09:30"), ("Salma Tazi", "11:00")] {
        insert_patient(
            pool,
            NewPatient {
                doctor_id: &doctor_id,
                name: Some(name),
                phone: Some("0600000000"),
                email: None,
                date: Some(&tomorrow),
                time: Some(time),
            },
        )
        .await?;
    }

    log::info!("Seeded demo practitioner {email}");
    Ok(())
}
