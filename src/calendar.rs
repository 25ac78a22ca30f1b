use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::{
    db,
    error::{AppError, AppResult},
    models::{PatientRow, ReservationStatus},
};

pub const RESERVATION_MINUTES: i64 = 30;

const SLOT_TITLE: &str = "Disponible";
const DEFAULT_PATIENT_NAME: &str = "Patient";
const NOT_PROVIDED: &str = "Non fourni";
const RESERVATION_NOT_FOUND: &str = "Rendez-vous non trouvé";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: String,
    pub end: String,
}

pub type AvailabilityCalendar = BTreeMap<String, Vec<Slot>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Available,
    Reserved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventDetails {
    Reservation {
        patient_id: String,
        patient_name: String,
        patient_phone: String,
        patient_email: String,
        date: String,
        time: String,
        reservation_status: ReservationStatus,
    },
    Slot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start: String,
    pub end: String,
    pub color: &'static str,
    pub border_color: &'static str,
    pub text_color: &'static str,
    pub status: EventStatus,
    pub extended_props: EventDetails,
    #[serde(skip)]
    pub starts_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationView {
    pub patient_id: String,
    pub patient_name: String,
    pub patient_phone: String,
    pub patient_email: String,
    pub start: String,
    pub end: String,
    pub status: ReservationStatus,
    pub date: String,
    pub time: String,
    #[serde(skip)]
    pub starts_at: NaiveDateTime,
}

impl ReservationView {
    pub fn status_label(&self) -> &'static str {
        match self.status {
            ReservationStatus::Reserved => "Réservé",
            ReservationStatus::Confirmed => "Confirmé",
            ReservationStatus::Rescheduled => "Reporté",
        }
    }
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

/// Accepts `YYYY-MM-DDTHH:MM[:SS]`, with `T` or a space between date and time.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    let (date, time) = value.split_once('T').or_else(|| value.split_once(' '))?;
    Some(parse_date(date)?.and_time(parse_time(time)?))
}

pub fn format_timestamp(value: NaiveDateTime) -> String {
    if value.second() == 0 {
        value.format("%Y-%m-%dT%H:%M").to_string()
    } else {
        value.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

pub fn reservation_window(date: &str, time: &str) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let start = parse_date(date)?.and_time(parse_time(time)?);
    let end = start.checked_add_signed(Duration::minutes(RESERVATION_MINUTES))?;
    Some((start, end))
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

fn to_view(row: &PatientRow) -> Option<ReservationView> {
    let (Some(date), Some(time)) = (
        present(&row.patient_date_reservation),
        present(&row.patient_time_reservation),
    ) else {
        return None;
    };

    let Some((start, end)) = reservation_window(date, time) else {
        log::warn!(
            "Skipping reservation {} with unreadable date/time {date:?} {time:?}",
            row.id
        );
        return None;
    };

    let or_default = |value: &Option<String>, default: &str| {
        present(value).unwrap_or(default).to_string()
    };

    Some(ReservationView {
        patient_id: row.id.clone(),
        patient_name: or_default(&row.patient_nom, DEFAULT_PATIENT_NAME),
        patient_phone: or_default(&row.patient_telephone, NOT_PROVIDED),
        patient_email: or_default(&row.patient_email, NOT_PROVIDED),
        start: format_timestamp(start),
        end: format_timestamp(end),
        status: ReservationStatus::from_db(&row.status),
        date: date.to_string(),
        time: time.to_string(),
        starts_at: start,
    })
}

fn reservation_event(row: &PatientRow, view: ReservationView) -> CalendarEvent {
    let text = |value: &Option<String>| present(value).unwrap_or("").to_string();
    CalendarEvent {
        id: format!("patient_{}", view.patient_id),
        title: view.patient_name,
        start: view.start,
        end: view.end,
        color: "#ffc107",
        border_color: "#e0a800",
        text_color: "#212529",
        status: EventStatus::Reserved,
        extended_props: EventDetails::Reservation {
            patient_id: view.patient_id,
            patient_name: text(&row.patient_nom),
            patient_phone: text(&row.patient_telephone),
            patient_email: text(&row.patient_email),
            date: view.date,
            time: view.time,
            reservation_status: view.status,
        },
        starts_at: view.starts_at,
    }
}

fn slot_event(start: NaiveDateTime, end: NaiveDateTime) -> CalendarEvent {
    let start_text = format_timestamp(start);
    CalendarEvent {
        id: format!("slot_{start_text}"),
        title: SLOT_TITLE.to_string(),
        start: start_text,
        end: format_timestamp(end),
        color: "#d1ecf1",
        border_color: "#bee5eb",
        text_color: "#0c5460",
        status: EventStatus::Available,
        extended_props: EventDetails::Slot,
        starts_at: start,
    }
}

/// Reservations are keyed by start instant and a later row replaces an earlier one at the
/// same instant. Slots colliding with a reservation start are dropped. Slot events come
/// first, followed by reservation events in start order.
pub fn merge_calendar(
    reservations: &[PatientRow],
    calendar: &AvailabilityCalendar,
) -> Vec<CalendarEvent> {
    let mut reserved: BTreeMap<NaiveDateTime, CalendarEvent> = BTreeMap::new();
    for row in reservations {
        if let Some(view) = to_view(row) {
            reserved.insert(view.starts_at, reservation_event(row, view));
        }
    }

    let mut events = Vec::new();
    for slots in calendar.values() {
        for slot in slots {
            let (Some(start), Some(end)) = (parse_timestamp(&slot.start), parse_timestamp(&slot.end))
            else {
                log::warn!("Skipping unreadable availability slot {:?}", slot.start);
                continue;
            };
            if reserved.contains_key(&start) {
                continue;
            }
            events.push(slot_event(start, end));
        }
    }

    events.extend(reserved.into_values());
    events
}

pub async fn build_calendar_view(
    pool: &SqlitePool,
    practitioner_id: &str,
    calendar: &AvailabilityCalendar,
) -> AppResult<Vec<CalendarEvent>> {
    let reservations = db::fetch_patients(pool, practitioner_id).await?;
    Ok(merge_calendar(&reservations, calendar))
}

pub async fn list_reservations(
    pool: &SqlitePool,
    practitioner_id: &str,
) -> AppResult<Vec<ReservationView>> {
    let rows = db::fetch_patients(pool, practitioner_id).await?;
    let mut views: Vec<ReservationView> = rows.iter().filter_map(to_view).collect();
    views.sort_by_key(|view| view.starts_at);
    Ok(views)
}

pub async fn confirm(pool: &SqlitePool, reservation_id: &str, practitioner_id: &str) -> AppResult<()> {
    let updated = db::set_patient_status(
        pool,
        reservation_id,
        practitioner_id,
        ReservationStatus::Confirmed.as_str(),
    )
    .await?;
    if updated == 0 {
        return Err(AppError::NotFound(RESERVATION_NOT_FOUND.to_string()));
    }
    log::info!("Reservation {reservation_id} confirmed by {practitioner_id}");
    Ok(())
}

/// Moves a reservation. The target instant is not checked against other reservations.
pub async fn reschedule(
    pool: &SqlitePool,
    reservation_id: &str,
    practitioner_id: &str,
    new_date: Option<&str>,
    new_time: Option<&str>,
) -> AppResult<()> {
    let required = || AppError::InvalidInput("Nouvelle date et heure requises".to_string());
    let date = new_date.map(str::trim).filter(|value| !value.is_empty()).ok_or_else(required)?;
    let time = new_time.map(str::trim).filter(|value| !value.is_empty()).ok_or_else(required)?;

    if parse_date(date).is_none() {
        return Err(AppError::InvalidInput(format!("Date invalide: {date}")));
    }
    if parse_time(time).is_none() {
        return Err(AppError::InvalidInput(format!("Heure invalide: {time}")));
    }
    if reservation_window(date, time).is_none() {
        return Err(AppError::InvalidInput(format!("Date hors limites: {date} {time}")));
    }

    let updated = db::reschedule_patient(
        pool,
        reservation_id,
        practitioner_id,
        date,
        time,
        ReservationStatus::Rescheduled.as_str(),
    )
    .await?;
    if updated == 0 {
        return Err(AppError::NotFound(RESERVATION_NOT_FOUND.to_string()));
    }
    log::info!("Reservation {reservation_id} rescheduled to {date} {time} by {practitioner_id}");
    Ok(())
}

pub async fn delete(pool: &SqlitePool, reservation_id: &str, practitioner_id: &str) -> AppResult<()> {
    let deleted = db::delete_patient(pool, reservation_id, practitioner_id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound(RESERVATION_NOT_FOUND.to_string()));
    }
    log::info!("Reservation {reservation_id} deleted by {practitioner_id}");
    Ok(())
}

pub fn decode_calendar(raw: &str) -> AvailabilityCalendar {
    let mut calendar = AvailabilityCalendar::new();
    let value = match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(err) => {
            if !raw.trim().is_empty() {
                log::warn!("Ignoring unreadable calendar: {err}");
            }
            return calendar;
        }
    };
    let Value::Object(entries) = value else {
        return calendar;
    };

    for (key, slots) in entries {
        let Value::Array(slots) = slots else {
            continue;
        };
        let slots: Vec<Slot> = slots
            .into_iter()
            .filter_map(|slot| serde_json::from_value(slot).ok())
            .collect();
        if !slots.is_empty() {
            calendar.insert(key, slots);
        }
    }
    calendar
}

/// Returns `false` when an identical slot is already present.
pub fn add_slot(calendar: &mut AvailabilityCalendar, slot: &Slot) -> AppResult<bool> {
    let start = parse_timestamp(&slot.start)
        .ok_or_else(|| AppError::InvalidInput(format!("Début invalide: {}", slot.start)))?;
    let end = parse_timestamp(&slot.end)
        .ok_or_else(|| AppError::InvalidInput(format!("Fin invalide: {}", slot.end)))?;
    if start >= end {
        return Err(AppError::InvalidInput(
            "Le créneau doit se terminer après son début".to_string(),
        ));
    }

    let normalized = Slot {
        start: format_timestamp(start),
        end: format_timestamp(end),
    };
    let day = calendar
        .entry(start.date().format("%Y-%m-%d").to_string())
        .or_default();
    if day.contains(&normalized) {
        return Ok(false);
    }
    day.push(normalized);
    day.sort_by_key(|slot| parse_timestamp(&slot.start));
    Ok(true)
}

pub fn remove_slot(calendar: &mut AvailabilityCalendar, start: &str) -> AppResult<usize> {
    let start = parse_timestamp(start)
        .ok_or_else(|| AppError::InvalidInput(format!("Début invalide: {start}")))?;

    let mut removed = 0;
    for slots in calendar.values_mut() {
        let before = slots.len();
        slots.retain(|slot| parse_timestamp(&slot.start) != Some(start));
        removed += before - slots.len();
    }
    calendar.retain(|_, slots| !slots.is_empty());
    Ok(removed)
}
