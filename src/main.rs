mod auth;
mod calendar;
mod config;
mod db;
mod error;
mod models;
mod profile;
mod routes;
mod session;
mod state;
mod templates;
mod validation;

use actix_files::Files;
use actix_web::{middleware, web, App, HttpServer};

use crate::{config::AppConfig, session::SessionStore, state::AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(err) = run().await {
        eprintln!("Startup error: {err}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let config = AppConfig::from_env();
    let pool = db::connect(&config.database_url).await?;

    db::run_migrations(&pool).await?;
    if config.seed_demo {
        db::seed_demo(&pool).await?;
    }

    let state = AppState {
        db: pool.clone(),
        sessions: SessionStore::new(config.session_ttl),
    };

    let address = config.bind_address();
    log::info!(
        "Starting DocPanel on http://{address} (sessions expire after {}h)",
        config.session_ttl.num_hours()
    );

    let static_dir = config.static_dir.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .service(Files::new("/static", &static_dir).prefer_utf8(true))
            .configure(routes::configure)
    })
    .bind(address)?
    .run()
    .await?;

    Ok(())
}
