use actix_web::web;

use crate::handlers::{album, locations, photos};

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/locations")
            .service(
                web::resource("")
                    .route(web::get().to(locations::list_locations))
                    .route(web::post().to(locations::create_location))
            )
            .service(
                web::resource("/lookup")
                    .route(web::get().to(locations::lookup_location))
            )
            .service(
                web::resource("/{location_id}")
                    .route(web::get().to(locations::get_location))
                    .route(web::delete().to(locations::delete_location))
            )
            .service(
                web::resource("/{location_id}/album")
                    .route(web::get().to(album::open_album))
                    .route(web::delete().to(album::close_album))
            )
            .service(
                web::resource("/{location_id}/album/new-collection")
                    .route(web::post().to(album::new_collection))
            )
            .service(
                web::resource("/{location_id}/album/selection/{photo_id}")
                    .route(web::post().to(album::toggle_selection))
            )
            .service(
                web::resource("/{location_id}/album/prefetch")
                    .route(web::post().to(album::prefetch_album))
            )
    );

    cfg.service(
        web::scope("/photos")
            .service(
                web::resource("/{photo_id}/image")
                    .route(web::get().to(photos::get_photo_image))
            )
    );
}
