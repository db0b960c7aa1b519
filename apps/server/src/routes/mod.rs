//! HTTP route wiring.

use actix_web::web;

use crate::error::AppError;

pub mod health;
pub mod realtime;
pub mod rooms;

pub fn configure(cfg: &mut web::ServiceConfig) {
    health::configure_routes(cfg);
    rooms::configure_routes(cfg);
    realtime::configure_routes(cfg);
}

/// JSON extractor config that keeps body errors in our `{error, message}`
/// shape instead of actix's default.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        actix_web::Error::from(AppError::invalid_json(err.to_string()))
    })
}
