use askama::Template;
use chrono::{DateTime, FixedOffset, Utc};

use super::DisplayBoard;
use crate::models::Order;
use crate::utils::{time, AppError};

pub struct CardView {
    pub order_id: String,
    pub name: String,
    pub updated_label: String,
}

impl CardView {
    fn from_order(order: &Order, offset: FixedOffset) -> Self {
        Self {
            order_id: order.order_id.clone(),
            name: order.name.clone(),
            updated_label: time::clock_label(order.updated_at, offset),
        }
    }
}

pub struct BoardView {
    pub preparing: Vec<CardView>,
    pub completed: Vec<CardView>,
    pub stale: bool,
    pub fetch_failed: bool,
    pub clock_label: String,
    pub updated_label: String,
    /// Idade dos dados (ms) no momento do render; `None` se nunca buscou.
    pub age_ms: Option<i64>,
    pub stale_after_secs: i64,
}

impl BoardView {
    pub fn new(board: &DisplayBoard, now: DateTime<Utc>, offset: FixedOffset) -> Self {
        let updated_label = match board.data_updated_at {
            Some(updated) => format!("Diperbarui {}", time::relative_label(now, updated, offset)),
            None => "Belum ada data".to_string(),
        };

        Self {
            preparing: board.preparing.iter().map(|o| CardView::from_order(o, offset)).collect(),
            completed: board.completed.iter().map(|o| CardView::from_order(o, offset)).collect(),
            stale: board.is_stale,
            fetch_failed: board.last_error.is_some(),
            clock_label: time::clock_label(now, offset),
            updated_label,
            age_ms: board
                .data_updated_at
                .map(|updated| (now - updated).num_milliseconds().max(0)),
            stale_after_secs: board.stale_after_secs,
        }
    }
}

#[derive(Template)]
#[template(path = "display.html")]
pub struct DisplayPageTemplate {
    /// Already percent-encoded, so it is emitted unescaped into the script.
    pub events_url: String,
    pub poll_secs: u64,
    pub board: BoardView,
}

/// Só o quadro; é o que o stream SSE empurra a cada ciclo.
#[derive(Template)]
#[template(path = "display_board.html")]
pub struct BoardFragmentTemplate {
    pub board: BoardView,
}

pub fn render_page(board: &DisplayBoard, now: DateTime<Utc>, offset: FixedOffset, poll_secs: u64) -> Result<String, AppError> {
    let template = DisplayPageTemplate {
        events_url: format!(
            "/api/v1/display/{}/events",
            urlencoding::encode(board.store_id.as_str())
        ),
        poll_secs,
        board: BoardView::new(board, now, offset),
    };
    Ok(template.render()?)
}

pub fn render_fragment(board: &DisplayBoard, now: DateTime<Utc>, offset: FixedOffset) -> Result<String, AppError> {
    let template = BoardFragmentTemplate {
        board: BoardView::new(board, now, offset),
    };
    Ok(template.render()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::tests::order;
    use crate::models::{OrderStatus, StoreId};
    use crate::utils::QuerySnapshot;
    use chrono::{Duration, TimeZone};

    fn wib() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn board(updated: Option<DateTime<Utc>>, orders: Vec<Order>) -> DisplayBoard {
        let snapshot = QuerySnapshot {
            data: orders,
            data_updated_at: updated,
            error: None,
            failure_count: 0,
            is_fetching: false,
        };
        let now = updated.unwrap_or_else(Utc::now);
        DisplayBoard::build(StoreId::parse("store-1").unwrap(), &snapshot, now, 30)
    }

    #[test]
    fn test_page_renders_both_columns() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let b = board(
            Some(t0),
            vec![
                order("17", OrderStatus::Preparing, t0),
                order("18", OrderStatus::Completed, t0),
            ],
        );

        let html = render_page(&b, t0 + Duration::seconds(3), wib(), 5).unwrap();
        assert!(html.contains("Sedang di Masak"));
        assert!(html.contains("Selesai"));
        assert!(html.contains("Customer 17"));
        assert!(html.contains("/api/v1/display/store-1/events"));
        assert!(html.contains("Diperbarui baru saja"));
    }

    #[test]
    fn test_fragment_shows_empty_states_and_stale_marker() {
        let b = board(None, vec![]);
        let html = render_fragment(&b, Utc::now(), wib()).unwrap();

        assert!(html.contains("Tidak ada pesanan yang sedang dimasak"));
        assert!(html.contains("Tidak ada pesanan yang selesai"));
        assert!(html.contains("Belum ada data"));
        assert!(html.contains("is-stale"));
    }

    #[test]
    fn test_customer_names_are_escaped() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let mut o = order("1", OrderStatus::Preparing, t0);
        o.name = "<script>alert(1)</script>".into();

        let html = render_fragment(&board(Some(t0), vec![o]), t0, wib()).unwrap();
        assert!(!html.contains("<script>alert(1)</script>"));
    }

    #[test]
    fn test_footer_carries_age_for_client_side_staleness() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let b = board(Some(t0), vec![]);

        let fresh = render_fragment(&b, t0 + Duration::milliseconds(30_500), wib()).unwrap();
        assert!(fresh.contains(r#"data-age-ms="30500""#));
        assert!(fresh.contains(r#"data-stale-after="30""#));
        assert!(fresh.contains("is-fresh"));

        // o flag em si vem do board; o script só continua a contagem
        let mut old = b.clone();
        old.is_stale = true;
        let stale = render_fragment(&old, t0 + Duration::seconds(45), wib()).unwrap();
        assert!(stale.contains(r#"data-age-ms="45000""#));
        assert!(stale.contains("is-stale"));
    }
}
