use actix_web::{web, HttpResponse};
use askama::Template;
use chrono::{FixedOffset, Utc};
use serde::Deserialize;

use super::{html, see_other};
use crate::middleware::auth::login_location;
use crate::models::{Order, OrderStatus, Session, Store, StoreId};
use crate::state::AppState;
use crate::utils::{time, AppError};

// ==================== ADMIN PAGES ====================
// Todas as rotas daqui passam pelo RequireSession, então a sessão já está
// nas extensions. Formulários fazem POST e voltam com 303.

#[derive(Debug, Deserialize)]
pub struct FlashQuery {
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StoreForm {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderForm {
    pub order_id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

pub struct StoreRow {
    pub id: String,
    pub name: String,
    pub admin_url: String,
    pub display_url: String,
}

impl From<&Store> for StoreRow {
    fn from(store: &Store) -> Self {
        let encoded = urlencoding::encode(store.id.as_str()).into_owned();
        Self {
            id: store.id.to_string(),
            name: store.name.clone(),
            admin_url: format!("/admin/{}", encoded),
            display_url: format!("/{}", encoded),
        }
    }
}

pub struct StatusAction {
    pub value: &'static str,
    pub label: &'static str,
}

pub struct OrderRow {
    pub id: String,
    pub order_id: String,
    pub name: String,
    pub status_value: &'static str,
    pub status_label: &'static str,
    pub updated_label: String,
    pub actions: Vec<StatusAction>,
}

impl OrderRow {
    fn new(order: &Order, now: chrono::DateTime<Utc>, offset: FixedOffset) -> Self {
        let actions = OrderStatus::assignable()
            .into_iter()
            .filter(|s| *s != order.status)
            .map(|s| StatusAction { value: s.as_str(), label: s.label() })
            .collect();

        Self {
            id: order.id.clone(),
            order_id: order.order_id.clone(),
            name: order.name.clone(),
            status_value: order.status.as_str(),
            status_label: order.status.label(),
            updated_label: time::relative_label(now, order.updated_at, offset),
            actions,
        }
    }
}

#[derive(Template)]
#[template(path = "admin_stores.html")]
pub struct StoresPageTemplate {
    pub email: String,
    pub stores: Vec<StoreRow>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "admin_orders.html")]
pub struct OrdersPageTemplate {
    pub email: String,
    pub store: StoreRow,
    pub orders: Vec<OrderRow>,
    pub error: Option<String>,
}

fn email_of(session: &Session) -> String {
    session.user.email.clone().unwrap_or_else(|| session.user.id.clone())
}

fn store_path(store_id: &StoreId) -> String {
    format!("/admin/{}", urlencoding::encode(store_id.as_str()))
}

fn parse_store_id(raw: &str) -> Result<StoreId, AppError> {
    StoreId::parse(raw).ok_or_else(|| AppError::InvalidRequest("store id must not be empty".into()))
}

/// Turns a failed form action into a redirect: validation problems go back to
/// `back` with `?error=`, a revoked session goes to the login page.
fn recover(err: AppError, back: &str) -> Result<HttpResponse, AppError> {
    match err {
        AppError::InvalidRequest(message) | AppError::NotFound(message) => {
            log::warn!("⚠️  Admin action rejected: {}", message);
            Ok(see_other(&format!("{}?error={}", back, urlencoding::encode(&message))))
        }
        AppError::Unauthorized(_) => Ok(see_other(&login_location("/auth", back))),
        other => Err(other),
    }
}

/// GET /admin - lista de lojas
pub async fn stores_page(
    session: web::ReqData<Session>,
    state: web::Data<AppState>,
    query: web::Query<FlashQuery>,
) -> Result<HttpResponse, AppError> {
    let stores = match state.stores.list_stores(&session).await {
        Ok(stores) => stores,
        Err(AppError::Unauthorized(_)) => return Ok(see_other(&login_location("/auth", "/admin"))),
        Err(e) => return Err(e),
    };

    let template = StoresPageTemplate {
        email: email_of(&session),
        stores: stores.iter().map(StoreRow::from).collect(),
        error: query.error.clone(),
    };
    Ok(html(template.render()?))
}

/// GET /admin/{store_id} - pedidos de uma loja, todos os status
pub async fn orders_page(
    session: web::ReqData<Session>,
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<FlashQuery>,
) -> Result<HttpResponse, AppError> {
    let store_id = parse_store_id(&path)?;

    let store = match state.stores.get_store(&session, &store_id).await {
        Ok(Some(store)) => store,
        Ok(None) => return recover(AppError::NotFound(format!("Store {} not found", store_id)), "/admin"),
        Err(e) => return recover(e, "/admin"),
    };

    let mut orders = match state.orders.get_orders(&store_id).await {
        Ok(orders) => orders,
        Err(e) => return recover(e, "/admin"),
    };
    orders.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

    let now = Utc::now();
    let offset = state.config.display_offset;
    let template = OrdersPageTemplate {
        email: email_of(&session),
        store: StoreRow::from(&store),
        orders: orders.iter().map(|o| OrderRow::new(o, now, offset)).collect(),
        error: query.error.clone(),
    };
    Ok(html(template.render()?))
}

/// POST /admin/stores
pub async fn create_store(
    session: web::ReqData<Session>,
    state: web::Data<AppState>,
    form: web::Form<StoreForm>,
) -> Result<HttpResponse, AppError> {
    match state.stores.create_store(&session, &form.name).await {
        Ok(store) => {
            log::info!("🏪 Store created: {} ({})", store.name, store.id);
            Ok(see_other("/admin"))
        }
        Err(e) => recover(e, "/admin"),
    }
}

/// POST /admin/stores/{id}/rename
pub async fn rename_store(
    session: web::ReqData<Session>,
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Form<StoreForm>,
) -> Result<HttpResponse, AppError> {
    let store_id = parse_store_id(&path)?;
    match state.stores.rename_store(&session, &store_id, &form.name).await {
        Ok(_) => Ok(see_other("/admin")),
        Err(e) => recover(e, "/admin"),
    }
}

/// POST /admin/stores/{id}/delete
pub async fn delete_store(
    session: web::ReqData<Session>,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let store_id = parse_store_id(&path)?;
    match state.stores.delete_store(&session, &store_id).await {
        Ok(()) => {
            log::info!("🗑️  Store deleted: {}", store_id);
            state.order_queries.invalidate(&store_id);
            Ok(see_other("/admin"))
        }
        Err(e) => recover(e, "/admin"),
    }
}

/// POST /admin/{store_id}/orders
pub async fn create_order(
    session: web::ReqData<Session>,
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Form<OrderForm>,
) -> Result<HttpResponse, AppError> {
    let store_id = parse_store_id(&path)?;
    let back = store_path(&store_id);

    match state
        .orders
        .create_order(&session, &store_id, &form.order_id, &form.name)
        .await
    {
        Ok(order) => {
            log::info!("➕ Order {} created for store {}", order.order_id, store_id);
            state.order_queries.invalidate(&store_id);
            Ok(see_other(&back))
        }
        Err(e) => recover(e, &back),
    }
}

/// POST /admin/{store_id}/orders/{id}/status
pub async fn update_order_status(
    session: web::ReqData<Session>,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    form: web::Form<StatusForm>,
) -> Result<HttpResponse, AppError> {
    let (raw_store, id) = path.into_inner();
    let store_id = parse_store_id(&raw_store)?;
    let back = store_path(&store_id);

    let Some(status) = OrderStatus::parse(&form.status) else {
        return recover(AppError::InvalidRequest(format!("Unknown status '{}'", form.status)), &back);
    };

    match state
        .orders
        .update_order_status(&session, Some(&store_id), &id, status)
        .await
    {
        Ok(order) => {
            log::info!("🔄 Order {} -> {}", order.order_id, status.as_str());
            state.order_queries.invalidate(&order.store_id);
            Ok(see_other(&back))
        }
        Err(e) => recover(e, &back),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::tests::order;
    use chrono::TimeZone;

    #[test]
    fn test_order_row_offers_other_statuses() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let row = OrderRow::new(
            &order("1", OrderStatus::Preparing, t0),
            t0,
            FixedOffset::east_opt(7 * 3600).unwrap(),
        );

        let values: Vec<_> = row.actions.iter().map(|a| a.value).collect();
        assert_eq!(values, vec!["COMPLETED", "CANCELLED"]);
        assert_eq!(row.status_label, "Sedang di Masak");
    }

    #[test]
    fn test_recover_redirects_validation_errors() {
        let res = recover(AppError::InvalidRequest("name must not be empty".into()), "/admin").unwrap();
        assert_eq!(res.status(), actix_web::http::StatusCode::SEE_OTHER);
        let location = res.headers().get("location").unwrap().to_str().unwrap();
        assert!(location.starts_with("/admin?error="));

        let res = recover(AppError::Unauthorized("JWT expired".into()), "/admin/s-1").unwrap();
        let location = res.headers().get("location").unwrap().to_str().unwrap();
        assert!(location.starts_with("/auth?next="));

        assert!(recover(AppError::Network("timeout".into()), "/admin").is_err());
    }
}
