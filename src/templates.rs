use actix_web::HttpResponse;
use askama::Template;

use crate::session::Flash;

pub fn render<T: Template>(template: T) -> HttpResponse {
    match template.render() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(body),
        Err(err) => {
            log::error!("Template render error: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(Clone, Debug)]
pub struct FlashView {
    pub kind: &'static str,
    pub message: String,
}

pub fn flash_views(flashes: Vec<Flash>) -> Vec<FlashView> {
    flashes
        .into_iter()
        .map(|flash| FlashView {
            kind: flash.kind.as_str(),
            message: flash.message,
        })
        .collect()
}

pub fn error_views(messages: Vec<String>) -> Vec<FlashView> {
    messages
        .into_iter()
        .map(|message| FlashView {
            kind: "error",
            message,
        })
        .collect()
}
