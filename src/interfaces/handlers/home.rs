use actix_web::{get, HttpResponse, Responder};

#[get("/")]
pub async fn home() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "Virtual Tourist photo album API",
        "status": "Ok",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "locations": "/api/v1/locations",
            "album": "/api/v1/locations/{id}/album",
            "image": "/api/v1/photos/{photo_id}/image",
            "health": "/health"
        }
    }))
}
