//! Liveness endpoint.

use actix_web::{web, HttpResponse};
use serde::Serialize;

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse { ok: true })
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/health").route(web::get().to(health)));
}
