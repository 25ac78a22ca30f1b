use actix_web::{middleware::from_fn, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::session_guard,
    calendar::{self, add_slot, build_calendar_view, remove_slot, Slot},
    db,
    error::{AppError, AppResult},
    models::ReservationStatus,
    session::SessionContext,
    state::AppState,
};

#[derive(Deserialize)]
struct RescheduleRequest {
    new_date: Option<String>,
    new_time: Option<String>,
}

#[derive(Deserialize)]
struct RemoveSlotRequest {
    start: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .wrap(from_fn(session_guard))
            .service(web::resource("/events").route(web::get().to(events)))
            .service(
                web::resource("/confirm_reservation/{id}").route(web::post().to(confirm_reservation)),
            )
            .service(
                web::resource("/reschedule_reservation/{id}")
                    .route(web::post().to(reschedule_reservation)),
            )
            .service(
                web::resource("/delete_reservation/{id}")
                    .route(web::delete().to(delete_reservation)),
            )
            .service(web::resource("/slots").route(web::post().to(create_slot)))
            .service(web::resource("/slots/remove").route(web::post().to(delete_slot))),
    );
}

async fn events(
    state: web::Data<AppState>,
    session: web::ReqData<SessionContext>,
) -> AppResult<HttpResponse> {
    let events = build_calendar_view(&state.db, &session.user_id, &session.calendar).await?;
    Ok(HttpResponse::Ok().json(events))
}

async fn stored_status(
    state: &AppState,
    reservation_id: &str,
) -> AppResult<Option<ReservationStatus>> {
    let row = db::find_patient(&state.db, reservation_id).await?;
    Ok(row.map(|row| ReservationStatus::from_db(&row.status)))
}

async fn confirm_reservation(
    state: web::Data<AppState>,
    session: web::ReqData<SessionContext>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let reservation_id = path.into_inner();
    calendar::confirm(&state.db, &reservation_id, &session.user_id).await?;
    let status = stored_status(&state, &reservation_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Rendez-vous confirmé",
        "status": status,
    })))
}

async fn reschedule_reservation(
    state: web::Data<AppState>,
    session: web::ReqData<SessionContext>,
    path: web::Path<String>,
    payload: web::Json<RescheduleRequest>,
) -> AppResult<HttpResponse> {
    let reservation_id = path.into_inner();
    let payload = payload.into_inner();
    calendar::reschedule(
        &state.db,
        &reservation_id,
        &session.user_id,
        payload.new_date.as_deref(),
        payload.new_time.as_deref(),
    )
    .await?;
    let status = stored_status(&state, &reservation_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Rendez-vous reporté",
        "status": status,
    })))
}

async fn delete_reservation(
    state: web::Data<AppState>,
    session: web::ReqData<SessionContext>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    calendar::delete(&state.db, &path.into_inner(), &session.user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Rendez-vous supprimé" })))
}

async fn create_slot(
    state: web::Data<AppState>,
    session: web::ReqData<SessionContext>,
    slot: web::Json<Slot>,
) -> AppResult<HttpResponse> {
    let slot = slot.into_inner();
    let added = state
        .sessions
        .update(&session.token, |context| add_slot(&mut context.calendar, &slot))
        .await
        .ok_or_else(|| AppError::Auth("Session expirée".to_string()))??;

    let message = if added {
        "Créneau ajouté"
    } else {
        "Créneau déjà présent"
    };
    Ok(HttpResponse::Ok().json(json!({ "message": message })))
}

async fn delete_slot(
    state: web::Data<AppState>,
    session: web::ReqData<SessionContext>,
    payload: web::Json<RemoveSlotRequest>,
) -> AppResult<HttpResponse> {
    let start = payload.into_inner().start;
    let removed = state
        .sessions
        .update(&session.token, |context| remove_slot(&mut context.calendar, &start))
        .await
        .ok_or_else(|| AppError::Auth("Session expirée".to_string()))??;

    if removed == 0 {
        return Err(AppError::NotFound("Créneau non trouvé".to_string()));
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "Créneau supprimé", "removed": removed })))
}

#[cfg(test)]
mod tests {
    use actix_web::{
        cookie::Cookie,
        http::{header, StatusCode},
        test, web, App,
    };
    use chrono::Duration;
    use serde_json::{json, Value};

    use crate::{
        auth::{register_practitioner, SESSION_COOKIE},
        calendar::Slot,
        db::{
            self,
            testing::{memory_pool, practitioner, reservation},
        },
        routes,
        session::{SessionSeed, SessionStore},
        state::AppState,
    };

    async fn test_state() -> AppState {
        AppState {
            db: memory_pool().await,
            sessions: SessionStore::new(Duration::hours(1)),
        }
    }

    async fn signed_in(state: &AppState, user_id: &str) -> Cookie<'static> {
        let session = state
            .sessions
            .create(SessionSeed {
                user_id: user_id.to_string(),
                email: "dr@example.ma".to_string(),
                ..SessionSeed::default()
            })
            .await;
        Cookie::new(SESSION_COOKIE, session.token)
    }

    #[actix_web::test]
    async fn api_requires_a_session() {
        let state = test_state().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(routes::configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/events").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": "Non autorisé" }));

        let req = test::TestRequest::get()
            .uri("/api/events")
            .cookie(Cookie::new(SESSION_COOKIE, "forged"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn pages_redirect_to_login_without_a_session() {
        let state = test_state().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(routes::configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/dashboard").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/login");
    }

    #[actix_web::test]
    async fn login_cookie_opens_the_api() {
        let state = test_state().await;
        register_practitioner(&state.db, "dr@example.ma", "secret1", "secret1")
            .await
            .unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(routes::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/login")
            .set_form([("email", "dr@example.ma"), ("password", "secret1")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/dashboard");
        let cookie = resp
            .response()
            .cookies()
            .find(|cookie| cookie.name() == SESSION_COOKIE)
            .expect("session cookie")
            .into_owned();
        assert_eq!(cookie.http_only(), Some(true));

        let req = test::TestRequest::get()
            .uri("/api/events")
            .cookie(cookie.clone())
            .to_request();
        let events: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(events, json!([]));

        let req = test::TestRequest::get()
            .uri("/logout")
            .cookie(cookie.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/login?logged_out=1"
        );

        let req = test::TestRequest::get()
            .uri("/api/events")
            .cookie(cookie)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn wrong_password_rerenders_the_form() {
        let state = test_state().await;
        register_practitioner(&state.db, "dr@example.ma", "secret1", "secret1")
            .await
            .unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(routes::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/login")
            .set_form([("email", "dr@example.ma"), ("password", "nope")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.response().cookies().next().is_none());
        assert_eq!(state.sessions.count().await, 0);
    }

    #[actix_web::test]
    async fn reservation_lifecycle_through_the_api() {
        let state = test_state().await;
        let owner = practitioner(&state.db, "dr@example.ma").await;
        let id = reservation(&state.db, &owner, "Amine", Some("2024-06-10"), Some("09:00")).await;
        let cookie = signed_in(&state, &owner).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(routes::configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/events")
            .cookie(cookie.clone())
            .to_request();
        let events: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(events[0]["id"], format!("patient_{id}"));
        assert_eq!(events[0]["start"], "2024-06-10T09:00");
        assert_eq!(events[0]["extendedProps"]["type"], "reservation");

        let req = test::TestRequest::post()
            .uri(&format!("/api/confirm_reservation/{id}"))
            .cookie(cookie.clone())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Rendez-vous confirmé");
        assert_eq!(body["status"], "confirmed");

        let req = test::TestRequest::post()
            .uri(&format!("/api/reschedule_reservation/{id}"))
            .cookie(cookie.clone())
            .set_json(json!({ "new_date": "2024-06-11", "new_time": "14:30" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "rescheduled");
        let row = db::find_patient(&state.db, &id).await.unwrap().unwrap();
        assert_eq!(row.patient_date_reservation.as_deref(), Some("2024-06-11"));

        let req = test::TestRequest::post()
            .uri(&format!("/api/reschedule_reservation/{id}"))
            .cookie(cookie.clone())
            .set_json(json!({ "new_date": "2024-06-11" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/delete_reservation/{id}"))
            .cookie(cookie.clone())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Rendez-vous supprimé");

        let req = test::TestRequest::delete()
            .uri(&format!("/api/delete_reservation/{id}"))
            .cookie(cookie)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn foreign_reservations_are_not_found() {
        let state = test_state().await;
        let owner = practitioner(&state.db, "owner@example.ma").await;
        let intruder = practitioner(&state.db, "other@example.ma").await;
        let id = reservation(&state.db, &owner, "Amine", Some("2024-06-10"), Some("09:00")).await;
        let cookie = signed_in(&state, &intruder).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(routes::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/confirm_reservation/{id}"))
            .cookie(cookie)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Rendez-vous non trouvé");

        let row = db::find_patient(&state.db, &id).await.unwrap().unwrap();
        assert_eq!(row.status, "reserved");
    }

    #[actix_web::test]
    async fn session_slots_feed_the_event_feed() {
        let state = test_state().await;
        let owner = practitioner(&state.db, "dr@example.ma").await;
        reservation(&state.db, &owner, "Amine", Some("2024-06-10"), Some("09:00")).await;
        let cookie = signed_in(&state, &owner).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(routes::configure),
        )
        .await;

        for (start, end) in [
            ("2024-06-10T09:00", "2024-06-10T09:30"),
            ("2024-06-10T10:00", "2024-06-10T10:30"),
        ] {
            let req = test::TestRequest::post()
                .uri("/api/slots")
                .cookie(cookie.clone())
                .set_json(Slot {
                    start: start.to_string(),
                    end: end.to_string(),
                })
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }

        let req = test::TestRequest::post()
            .uri("/api/slots")
            .cookie(cookie.clone())
            .set_json(json!({ "start": "2024-06-10T11:00", "end": "2024-06-10T10:00" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/api/events")
            .cookie(cookie.clone())
            .to_request();
        let events: Value = test::call_and_read_body_json(&app, req).await;
        let events = events.as_array().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["id"], "slot_2024-06-10T10:00");
        assert_eq!(events[1]["extendedProps"]["type"], "reservation");

        let req = test::TestRequest::post()
            .uri("/api/slots/remove")
            .cookie(cookie.clone())
            .set_json(json!({ "start": "2024-06-10T10:00" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["removed"], 1);

        let req = test::TestRequest::post()
            .uri("/api/slots/remove")
            .cookie(cookie)
            .set_json(json!({ "start": "2024-06-10T10:00" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
