use actix_web::{get, web, HttpResponse, Responder};
use humantime::format_duration;
use serde::Serialize;
use std::time::Duration;

use crate::{constants::START_TIME, repositories::location::LocationRepository, AppState};

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub uptime: String,
    pub timestamp: String,
    pub start_at: String,
    pub database: String,
    pub open_albums: usize,
    pub cpu_count: usize,
    pub version: String,
}

async fn build_health_response(state: &AppState) -> HealthCheckResponse {
    let now_utc = chrono::Utc::now();
    let uptime_secs = now_utc.signed_duration_since(*START_TIME).num_seconds().max(0) as u64;

    let database_ok = state.location_handler.location_repo.check_connection().await.is_ok();
    if !database_ok {
        tracing::warn!("Health check could not reach the database");
    }

    HealthCheckResponse {
        status: if database_ok { "healthy" } else { "degraded" }.to_string(),
        uptime: format_duration(Duration::from_secs(uptime_secs)).to_string(),
        timestamp: now_utc.to_rfc3339(),
        start_at: START_TIME.to_rfc3339(),
        database: if database_ok { "OK" } else { "Unavailable" }.to_string(),
        open_albums: state.photo_set_handler.open_albums(),
        cpu_count: num_cpus::get(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

#[get("/health")]
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let response = build_health_response(&state).await;

    if response.database == "OK" {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}
