use std::collections::HashMap;

use actix_web::{http::header, middleware::from_fn, web, HttpRequest, HttpResponse};
use askama::Template;

use crate::{
    auth::{clear_session_cookie, session_guard},
    calendar::{list_reservations, ReservationView, Slot},
    error::AppError,
    models::{DisplayLanguage, ProfileRecord, Side, ATTRIBUTES, FIELD_EMAIL, FIELD_TEL},
    profile::{get_profile, update_profile},
    session::{Flash, SessionContext},
    state::AppState,
    templates::{error_views, flash_views, render, FlashView},
    validation::{validate_profile, ProfileForm, ValidationError},
};

#[derive(Clone, Debug)]
struct ProfileRow {
    label_fr: &'static str,
    label_ar: &'static str,
    fr: String,
    ar: String,
}

#[derive(Clone, Debug)]
struct DayView {
    key: String,
    slots: Vec<Slot>,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    flashes: Vec<FlashView>,
    logged_in: bool,
    email: String,
    account_language: &'static str,
    display_language: &'static str,
    show_fr: bool,
    show_ar: bool,
    has_profile: bool,
    name_fr: String,
    name_ar: String,
    rows: Vec<ProfileRow>,
    tel: String,
    profile_email: String,
    days: Vec<DayView>,
}

#[derive(Clone, Debug)]
struct FieldRow {
    label_fr: &'static str,
    label_ar: &'static str,
    fr_key: &'static str,
    ar_key: &'static str,
    fr_value: String,
    ar_value: String,
    fr_invalid: bool,
    ar_invalid: bool,
}

#[derive(Template)]
#[template(path = "edit_profile.html")]
struct EditProfileTemplate {
    flashes: Vec<FlashView>,
    logged_in: bool,
    fields: Vec<FieldRow>,
    tel: String,
    email: String,
    tel_invalid: bool,
    email_invalid: bool,
}

#[derive(Template)]
#[template(path = "edit_calendar.html")]
struct EditCalendarTemplate {
    flashes: Vec<FlashView>,
    logged_in: bool,
    reservations: Vec<ReservationView>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/logout")
            .wrap(from_fn(session_guard))
            .route(web::get().to(logout)),
    )
    .service(
        web::resource("/dashboard")
            .wrap(from_fn(session_guard))
            .route(web::get().to(dashboard)),
    )
    .service(
        web::resource("/profile/edit")
            .wrap(from_fn(session_guard))
            .route(web::get().to(show_profile))
            .route(web::post().to(save_profile)),
    )
    .service(
        web::resource("/calendar/edit")
            .wrap(from_fn(session_guard))
            .route(web::get().to(edit_calendar)),
    )
    .service(
        web::resource("/set_language/{lang}")
            .wrap(from_fn(session_guard))
            .route(web::get().to(set_language)),
    );
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .append_header((header::LOCATION, location))
        .finish()
}

async fn logout(
    state: web::Data<AppState>,
    session: web::ReqData<SessionContext>,
    req: HttpRequest,
) -> HttpResponse {
    state.sessions.remove(&session.token).await;
    log::info!("Practitioner {} logged out", session.user_id);
    HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/login?logged_out=1"))
        .cookie(clear_session_cookie(&req))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}

async fn dashboard(
    state: web::Data<AppState>,
    session: web::ReqData<SessionContext>,
) -> HttpResponse {
    let flashes = state.sessions.take_flashes(&session.token).await;
    let session = session.into_inner();
    let language = session.display_language;
    let profile = &session.profile;

    let rows = ATTRIBUTES
        .into_iter()
        .skip(2)
        .map(|attribute| {
            let value = profile.attribute(attribute);
            ProfileRow {
                label_fr: attribute.label(Side::Fr),
                label_ar: attribute.label(Side::Ar),
                fr: value.fr.clone(),
                ar: value.ar.clone(),
            }
        })
        .collect();

    let days = session
        .calendar
        .iter()
        .map(|(key, slots)| DayView {
            key: key.clone(),
            slots: slots.clone(),
        })
        .collect();

    render(DashboardTemplate {
        flashes: flash_views(flashes),
        logged_in: true,
        email: session.email.clone(),
        account_language: session.language.as_str(),
        display_language: language.as_str(),
        show_fr: language.shows_fr(),
        show_ar: language.shows_ar(),
        has_profile: !profile.is_empty(),
        name_fr: profile.display_name(Side::Fr),
        name_ar: profile.display_name(Side::Ar),
        rows,
        tel: profile.tel.clone(),
        profile_email: profile.email.clone(),
        days,
    })
}

fn profile_template(
    form: &ProfileForm,
    flashes: Vec<FlashView>,
    invalid: &[&'static str],
) -> EditProfileTemplate {
    let flagged = |key: &str| invalid.iter().any(|field| *field == key);
    let fields = ATTRIBUTES
        .into_iter()
        .map(|attribute| {
            let fr_key = attribute.form_key(Side::Fr);
            let ar_key = attribute.form_key(Side::Ar);
            FieldRow {
                label_fr: attribute.label(Side::Fr),
                label_ar: attribute.label(Side::Ar),
                fr_key,
                ar_key,
                fr_value: form.get(fr_key).to_string(),
                ar_value: form.get(ar_key).to_string(),
                fr_invalid: flagged(fr_key),
                ar_invalid: flagged(ar_key),
            }
        })
        .collect();

    EditProfileTemplate {
        flashes,
        logged_in: true,
        fields,
        tel: form.get(FIELD_TEL).to_string(),
        email: form.get(FIELD_EMAIL).to_string(),
        tel_invalid: flagged(FIELD_TEL),
        email_invalid: flagged(FIELD_EMAIL),
    }
}

fn initial_form(profile: &ProfileRecord, account_email: &str) -> ProfileForm {
    let mut form = profile.to_form();
    if form.get(FIELD_EMAIL).is_empty() {
        form.set(FIELD_EMAIL, account_email);
    }
    form
}

async fn show_profile(
    state: web::Data<AppState>,
    session: web::ReqData<SessionContext>,
) -> HttpResponse {
    // The stored record wins over the session copy; fall back to the cache if the read fails.
    let profile = match get_profile(&state.db, &session.user_id).await {
        Ok(profile) => profile,
        Err(err) => {
            log::warn!("Using cached profile for practitioner {}: {err}", session.user_id);
            session.profile.clone()
        }
    };
    let flashes = state.sessions.take_flashes(&session.token).await;
    render(profile_template(
        &initial_form(&profile, &session.email),
        flash_views(flashes),
        &[],
    ))
}

async fn save_profile(
    state: web::Data<AppState>,
    session: web::ReqData<SessionContext>,
    form: web::Form<HashMap<String, String>>,
) -> HttpResponse {
    let form = ProfileForm::from_submission(form.into_inner());
    let result = update_profile(
        &state.db,
        &state.sessions,
        &session.token,
        &session.user_id,
        &form,
    )
    .await;

    let (messages, invalid) = match result {
        Ok(_) => {
            state
                .sessions
                .push_flash(&session.token, Flash::success("Profil mis à jour avec succès."))
                .await;
            return redirect("/dashboard");
        }
        Err(AppError::Validation(messages)) => {
            let invalid: Vec<&'static str> = validate_profile(&form)
                .iter()
                .filter_map(ValidationError::field)
                .collect();
            (messages, invalid)
        }
        Err(err) => {
            log::error!("Profile update failed for practitioner {}: {err}", session.user_id);
            (vec!["Erreur technique lors de la mise à jour.".to_string()], Vec::new())
        }
    };

    render(profile_template(&form, error_views(messages), &invalid))
}

async fn edit_calendar(
    state: web::Data<AppState>,
    session: web::ReqData<SessionContext>,
) -> HttpResponse {
    let reservations = match list_reservations(&state.db, &session.user_id).await {
        Ok(reservations) => reservations,
        Err(err) => {
            log::error!("Loading reservations failed for practitioner {}: {err}", session.user_id);
            state
                .sessions
                .push_flash(
                    &session.token,
                    Flash::error("Erreur lors du chargement des rendez-vous."),
                )
                .await;
            return redirect("/dashboard");
        }
    };

    let flashes = state.sessions.take_flashes(&session.token).await;
    render(EditCalendarTemplate {
        flashes: flash_views(flashes),
        logged_in: true,
        reservations,
    })
}

async fn set_language(
    state: web::Data<AppState>,
    session: web::ReqData<SessionContext>,
    path: web::Path<String>,
    req: HttpRequest,
) -> HttpResponse {
    if let Some(language) = DisplayLanguage::parse(&path.into_inner()) {
        state
            .sessions
            .update(&session.token, |context| {
                context.display_language = language;
                context.flashes.push(Flash::info(format!(
                    "Langue d'affichage changée vers: {}",
                    language.as_str()
                )));
            })
            .await;
    }

    let back = req
        .headers()
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .unwrap_or("/dashboard")
        .to_string();
    redirect(&back)
}
