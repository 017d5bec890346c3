use actix_web::{web, HttpResponse};

use crate::metrics::gather_metrics;

async fn metrics_handler() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4; charset=utf-8")
        .body(gather_metrics())
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/metrics", web::get().to(metrics_handler)).service(
        web::scope("/api/v1")
            .service(web::scope("/health").configure(routes::health::configure))
            .service(web::scope("/webhooks").configure(routes::webhooks::configure))
            .service(web::scope("/videos").configure(routes::videos::configure))
            .service(web::scope("/views").configure(routes::views::configure)),
    );
}

mod routes {
    pub mod health {
        use actix_web::web;

        use crate::handlers::health;

        pub fn configure(cfg: &mut web::ServiceConfig) {
            cfg.route("", web::get().to(health::health_check))
                .route("/ready", web::get().to(health::readiness_check));
        }
    }

    pub mod webhooks {
        use actix_web::web;

        use crate::handlers::webhooks;

        pub fn configure(cfg: &mut web::ServiceConfig) {
            cfg.route("/provider", web::post().to(webhooks::provider_webhook));
        }
    }

    pub mod videos {
        use actix_web::web;

        use crate::handlers::videos;

        pub fn configure(cfg: &mut web::ServiceConfig) {
            cfg.route("", web::post().to(videos::register_video))
                .route("/{id}", web::get().to(videos::get_video))
                .route("/{id}/publish", web::post().to(videos::publish_video))
                .route("/{id}/unpublish", web::post().to(videos::unpublish_video))
                .route("/{id}/republish", web::post().to(videos::republish_video));
        }
    }

    pub mod views {
        use actix_web::web;

        use crate::handlers::views;

        pub fn configure(cfg: &mut web::ServiceConfig) {
            cfg.route("/start", web::post().to(views::start_view))
                .route("/update", web::post().to(views::update_view))
                .route("/complete", web::post().to(views::complete_view));
        }
    }
}
