mod api;
mod config;
mod database;
mod display;
mod jobs;
mod middleware;
mod models;
mod pages;
mod routes;
mod services;
mod state;
mod utils;

#[cfg(test)]
mod testing;

use actix_cors::Cors;
use actix_web::{dev::Service as _, http::header, middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::state::{AppMetrics, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Sem SUPABASE_URL / SUPABASE_ANON_KEY não sobe
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ Invalid configuration: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    log::info!("🚀 Starting Order Display...");
    log::info!("🗄️  Supabase: {}", config.supabase_url);
    log::info!(
        "⏱️  Display poll every {}s, stale after {}s",
        config.poll_interval.as_secs(),
        config.stale_after_secs
    );
    if config.supabase_jwt_secret.is_none() {
        log::warn!("⚠️  SUPABASE_JWT_SECRET not set; access tokens are checked against Supabase Auth");
    }

    let host = config.host.clone();
    let port = config.port;
    let allowed_origins = config.allowed_origins.clone();

    let state = AppState::with_supabase(config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    let state = web::Data::new(state);

    // Limpeza periódica das lojas que ninguém consulta mais
    jobs::start_cache_gc(state.order_queries.clone(), std::time::Duration::from_secs(60));

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);
    log::info!("📄 OpenAPI spec at: http://{}:{}/api-docs/openapi.json", host, port);

    HttpServer::new(move || {
        let cors = allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::ACCEPT,
                header::CACHE_CONTROL,
            ])
            .expose_headers(vec![header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(state.clone())
            .wrap_fn(|req, srv| {
                let metrics = req
                    .app_data::<web::Data<AppState>>()
                    .map(|s| s.metrics.clone());
                let fut = srv.call(req);
                async move {
                    let res = fut.await;
                    if let Some(metrics) = metrics {
                        AppMetrics::increment(&metrics.http_requests_total);
                        let failed = match &res {
                            Ok(res) => res.status().is_server_error(),
                            Err(_) => true,
                        };
                        if failed {
                            AppMetrics::increment(&metrics.http_errors_total);
                        }
                    }
                    res
                }
            })
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
            .configure(routes::configure)
    })
    .bind(format!("{}:{}", host, port))?
    .run()
    .await
}
