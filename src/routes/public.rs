use actix_web::{http::header, web, HttpRequest, HttpResponse};
use askama::Template;
use serde::Deserialize;

use crate::{
    auth::{authenticate_credentials, register_practitioner, session_cookie, session_token},
    calendar::decode_calendar,
    error::AppError,
    models::DisplayLanguage,
    profile::decode_profile,
    session::{Flash, SessionSeed},
    state::AppState,
    templates::{error_views, render, FlashView},
};

#[derive(Template)]
#[template(path = "register.html")]
struct RegisterTemplate {
    flashes: Vec<FlashView>,
    logged_in: bool,
    email: String,
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    flashes: Vec<FlashView>,
    logged_in: bool,
    email: String,
}

#[derive(Deserialize)]
struct RegisterForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    confirm_password: String,
}

#[derive(Deserialize)]
struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
struct LoginQuery {
    registered: Option<String>,
    logged_out: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/health").route(web::get().to(health)))
        .service(
            web::resource("/register")
                .route(web::get().to(show_register))
                .route(web::post().to(register)),
        )
        .service(
            web::resource("/login")
                .route(web::get().to(show_login))
                .route(web::post().to(login)),
        );
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

async fn index(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let authenticated = match session_token(&req) {
        Some(token) => state.sessions.get(&token).await.is_some(),
        None => false,
    };
    let target = if authenticated { "/dashboard" } else { "/login" };
    HttpResponse::Found()
        .append_header((header::LOCATION, target))
        .finish()
}

async fn show_register() -> HttpResponse {
    render(RegisterTemplate {
        flashes: Vec::new(),
        logged_in: false,
        email: String::new(),
    })
}

async fn register(state: web::Data<AppState>, form: web::Form<RegisterForm>) -> HttpResponse {
    let form = form.into_inner();
    let result =
        register_practitioner(&state.db, &form.email, &form.password, &form.confirm_password).await;

    let messages = match result {
        Ok(_) => {
            return HttpResponse::SeeOther()
                .append_header((header::LOCATION, "/login?registered=1"))
                .finish();
        }
        Err(AppError::Validation(messages)) => messages,
        Err(err) => {
            log::error!("Registration failed: {err}");
            vec!["Erreur technique lors de l'inscription. Veuillez réessayer plus tard.".to_string()]
        }
    };

    render(RegisterTemplate {
        flashes: error_views(messages),
        logged_in: false,
        email: form.email.trim().to_string(),
    })
}

async fn show_login(query: web::Query<LoginQuery>) -> HttpResponse {
    let mut flashes = Vec::new();
    if query.registered.is_some() {
        flashes.push(FlashView {
            kind: "success",
            message: "Inscription réussie ! Connectez-vous maintenant.".to_string(),
        });
    }
    if query.logged_out.is_some() {
        flashes.push(FlashView {
            kind: "info",
            message: "Déconnexion réussie.".to_string(),
        });
    }
    render(LoginTemplate {
        flashes,
        logged_in: false,
        email: String::new(),
    })
}

async fn login(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<LoginForm>,
) -> HttpResponse {
    let form = form.into_inner();
    let opened = match authenticate_credentials(&state.db, &form.email, &form.password).await {
        Ok(user) => decode_profile(&user.profile_data).map(|profile| SessionSeed {
            language: DisplayLanguage::parse(&user.language).unwrap_or_default(),
            calendar: decode_calendar(&user.calendar),
            user_id: user.id,
            email: user.email,
            profile,
        }),
        Err(err) => Err(err),
    };

    let seed = match opened {
        Ok(seed) => seed,
        Err(err @ (AppError::Auth(_) | AppError::Validation(_))) => {
            return login_failed(&form.email, err.messages());
        }
        Err(err) => {
            log::error!("Login failed: {err}");
            return login_failed(&form.email, vec!["Erreur technique. Veuillez réessayer.".to_string()]);
        }
    };

    let session = state.sessions.create(seed).await;
    state
        .sessions
        .push_flash(&session.token, Flash::success("Connexion réussie."))
        .await;
    log::info!(
        "Practitioner {} logged in ({} active sessions)",
        session.user_id,
        state.sessions.count().await
    );

    HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/dashboard"))
        .cookie(session_cookie(&req, &session.token, state.sessions.ttl()))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}

fn login_failed(email: &str, messages: Vec<String>) -> HttpResponse {
    render(LoginTemplate {
        flashes: error_views(messages),
        logged_in: false,
        email: email.trim().to_string(),
    })
}
