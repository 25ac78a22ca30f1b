use actix_web::web;

pub mod api;
pub mod practitioner;
pub mod public;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(public::configure)
        .configure(practitioner::configure)
        .configure(api::configure);
}
