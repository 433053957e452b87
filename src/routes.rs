use actix_web::{web, HttpResponse};

use crate::middleware::RequireSession;
use crate::{api, pages};

async fn root() -> HttpResponse {
    pages::see_other("/auth")
}

/// Todas as rotas do serviço. A ordem importa: `/{store_id}` é catch-all e
/// tem que ficar por último.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(root))
        .route("/health", web::get().to(api::health::health_check))
        .route("/metrics", web::get().to(api::metrics::get_metrics))
        // ===== JSON API =====
        .service(
            web::scope("/api/v1/auth")
                .route("/login", web::post().to(api::auth::login))
                .route("/logout", web::post().to(api::auth::logout))
                .service(
                    web::resource("/me")
                        .wrap(RequireSession::bearer())
                        .route(web::get().to(api::auth::get_me)),
                ),
        )
        .service(
            web::scope("/api/v1/stores")
                .wrap(RequireSession::bearer())
                .route("", web::get().to(api::stores::list_stores))
                .route("", web::post().to(api::stores::create_store))
                .route("/{id}", web::get().to(api::stores::get_store))
                .route("/{id}", web::patch().to(api::stores::rename_store))
                .route("/{id}", web::delete().to(api::stores::delete_store))
                .route("/{id}/orders", web::get().to(api::stores::list_store_orders))
                .route("/{id}/orders", web::post().to(api::orders::create_order)),
        )
        .service(
            web::scope("/api/v1/orders")
                .wrap(RequireSession::bearer())
                .route("/{id}/status", web::patch().to(api::orders::update_order_status)),
        )
        .service(
            web::scope("/api/v1/display")
                .route("/{store_id}", web::get().to(api::display::get_board))
                .route("/{store_id}/events", web::get().to(api::display::board_events)),
        )
        // ===== HTML =====
        .service(
            web::resource("/auth")
                .route(web::get().to(pages::auth::login_page))
                .route(web::post().to(pages::auth::login_submit)),
        )
        .route("/auth/logout", web::post().to(pages::auth::logout))
        .service(
            web::scope("/admin")
                .wrap(RequireSession::redirect_to("/auth"))
                .route("", web::get().to(pages::admin::stores_page))
                .route("/stores", web::post().to(pages::admin::create_store))
                .route("/stores/{id}/rename", web::post().to(pages::admin::rename_store))
                .route("/stores/{id}/delete", web::post().to(pages::admin::delete_store))
                .route("/{store_id}", web::get().to(pages::admin::orders_page))
                .route("/{store_id}/orders", web::post().to(pages::admin::create_order))
                .route(
                    "/{store_id}/orders/{id}/status",
                    web::post().to(pages::admin::update_order_status),
                ),
        )
        .route("/{store_id}", web::get().to(pages::display::display_page)); // DEVE FICAR POR ÚLTIMO (catch-all)
}
