use actix_web::{web, HttpResponse};

use crate::state::{AppMetrics, AppState};

#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Health",
    responses(
        (status = 200, description = "Prometheus metrics", content_type = "text/plain")
    )
)]
pub async fn get_metrics(state: web::Data<AppState>) -> HttpResponse {
    let m = &state.metrics;

    let metrics = format!(
        "# HELP http_requests_total Total number of HTTP requests\n\
         # TYPE http_requests_total counter\n\
         http_requests_total {}\n\
         \n\
         # HELP http_errors_total Total number of HTTP errors\n\
         # TYPE http_errors_total counter\n\
         http_errors_total {}\n\
         \n\
         # HELP order_fetches_total Order reads issued to the backend\n\
         # TYPE order_fetches_total counter\n\
         order_fetches_total {}\n\
         \n\
         # HELP order_fetch_errors_total Order reads that failed\n\
         # TYPE order_fetch_errors_total counter\n\
         order_fetch_errors_total {}\n\
         \n\
         # HELP display_pollers_active Stores with at least one open display\n\
         # TYPE display_pollers_active gauge\n\
         display_pollers_active {}\n\
         \n\
         # HELP display_connections_open Open display connections\n\
         # TYPE display_connections_open gauge\n\
         display_connections_open {}\n",
        AppMetrics::get(&m.http_requests_total),
        AppMetrics::get(&m.http_errors_total),
        AppMetrics::get(&m.order_fetches_total),
        AppMetrics::get(&m.order_fetch_errors_total),
        state.poller.active_stores(),
        state.poller.open_displays(),
    );

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics)
}
