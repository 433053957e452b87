use actix_web::{http::header, web, HttpResponse};
use chrono::Utc;

use crate::display::render;
use crate::models::StoreId;
use crate::state::AppState;
use crate::utils::AppError;

/// 📺 GET /{store_id} - tela pública do balcão
///
/// Renders the board once from the cache; the page then keeps itself current
/// through the SSE stream.
pub async fn display_page(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let store_id = StoreId::parse(&path)
        .ok_or_else(|| AppError::InvalidRequest("store id must not be empty".into()))?;

    state.query_orders(Some(store_id.clone())).await;
    let board = state.board_from_cache(&store_id);

    let body = render::render_page(
        &board,
        Utc::now(),
        state.config.display_offset,
        state.config.poll_interval.as_secs(),
    )?;

    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .body(body))
}
