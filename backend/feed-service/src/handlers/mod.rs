/// REST handlers
pub mod auth;
pub mod feed;
pub mod health;

use actix_web::web;

/// Register the REST routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/signup", web::put().to(auth::signup))
            .route("/login", web::post().to(auth::login))
            .service(
                web::resource("/status")
                    .route(web::get().to(auth::get_status))
                    .route(web::patch().to(auth::update_status)),
            ),
    )
    .service(
        web::scope("/feed")
            .route("/posts", web::get().to(feed::get_posts))
            .route("/post", web::post().to(feed::create_post))
            .service(
                web::resource("/post/{id}")
                    .route(web::get().to(feed::get_post))
                    .route(web::put().to(feed::update_post))
                    .route(web::delete().to(feed::delete_post)),
            ),
    )
    .route("/post-image", web::put().to(feed::post_image))
    .route("/health", web::get().to(health::liveness))
    .route("/health/ready", web::get().to(health::readiness));
}
