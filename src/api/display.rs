use std::convert::Infallible;
use std::time::Duration;

use actix_web::{http::header, web, HttpResponse, Responder};
use actix_web_lab::sse;
use chrono::Utc;
use futures::{stream, Stream, StreamExt};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::display::{render, DisplayBoard};
use crate::jobs::DisplaySubscription;
use crate::models::StoreId;
use crate::state::AppState;
use crate::utils::AppError;

// ==================== PUBLIC DISPLAY ====================
// Sem autenticação: é o que a tela na frente do balcão consome.

/// Re-render cadence of an open board, independent of how long a poll takes.
const BOARD_REFRESH: Duration = Duration::from_secs(1);
const KEEP_ALIVE: Duration = Duration::from_secs(15);

#[utoipa::path(
    get,
    path = "/api/v1/display/{store_id}",
    tag = "Display",
    params(("store_id" = String, Path, description = "Store id")),
    responses((status = 200, description = "Current board of the store", body = DisplayBoard))
)]
pub async fn get_board(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let store_id = StoreId::parse(&path)
        .ok_or_else(|| AppError::InvalidRequest("store id must not be empty".into()))?;

    state.query_orders(Some(store_id.clone())).await;
    let board = state.board_from_cache(&store_id);

    Ok(HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json(board))
}

/// Boards of one mounted display: one right away, then after every poll and
/// at least every `refresh`, so the staleness flag keeps moving while a
/// fetch hangs. Ends when the poll loop goes away.
pub(crate) fn board_updates(
    subscription: DisplaySubscription,
    state: web::Data<AppState>,
    refresh: Duration,
) -> impl Stream<Item = DisplayBoard> {
    let mut ticker = interval_at(Instant::now() + refresh, refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    stream::unfold(
        (subscription, state, ticker, false),
        |(mut subscription, state, mut ticker, started)| async move {
            if started {
                tokio::select! {
                    alive = subscription.changed() => {
                        if !alive {
                            return None;
                        }
                    }
                    _ = ticker.tick() => {}
                }
            }

            let board = state.board_from_cache(subscription.store_id());
            Some((board, (subscription, state, ticker, true)))
        },
    )
}

/// 📺 GET /api/v1/display/{store_id}/events
///
/// Server-sent events: `board` events carrying the rendered board. The stream
/// owns the display subscription, so a closed connection stops the polling
/// for that screen.
pub async fn board_events(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let subscription = state
        .poller
        .mount(StoreId::parse(&path))
        .ok_or_else(|| AppError::InvalidRequest("store id must not be empty".into()))?;

    let offset = state.config.display_offset;
    let events = board_updates(subscription, state, BOARD_REFRESH).map(move |board| {
        let event = match render::render_fragment(&board, Utc::now(), offset) {
            Ok(html) => sse::Data::new(html).event("board").into(),
            Err(e) => {
                log::error!("❌ Failed to render board: {}", e);
                sse::Event::Comment("render error".into())
            }
        };
        Ok::<_, Infallible>(event)
    });

    Ok(sse::Sse::from_stream(events).with_keep_alive(KEEP_ALIVE))
}
