use actix_web::{web, HttpResponse};

use crate::api::stores::store_id_from;
use crate::models::{CreateOrderRequest, OrderResponse, Session, UpdateOrderStatusRequest};
use crate::state::AppState;
use crate::utils::AppError;

// ==================== ORDERS API ====================
// Mutações feitas pelo admin. Depois de cada uma o cache da loja é
// invalidado para o painel buscar de novo no próximo acesso.

/// 🔒 POST /api/v1/stores/{id}/orders
#[utoipa::path(
    post,
    path = "/api/v1/stores/{id}/orders",
    tag = "Orders",
    params(("id" = String, Path, description = "Store id")),
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created with status PREPARING", body = OrderResponse),
        (status = 400, description = "Blank order number or name")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_order(
    session: web::ReqData<Session>,
    state: web::Data<AppState>,
    path: web::Path<String>,
    request: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let store_id = store_id_from(&path)?;
    log::info!("➕ Creating order {} for store {}", request.order_id, store_id);

    let order = state
        .orders
        .create_order(&session, &store_id, &request.order_id, &request.name)
        .await?;
    state.order_queries.invalidate(&store_id);

    Ok(HttpResponse::Created().json(OrderResponse { success: true, order }))
}

/// 🔒 PATCH /api/v1/orders/{id}/status
#[utoipa::path(
    patch,
    path = "/api/v1/orders/{id}/status",
    tag = "Orders",
    params(("id" = String, Path, description = "Order row id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = OrderResponse),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_order_status(
    session: web::ReqData<Session>,
    state: web::Data<AppState>,
    path: web::Path<String>,
    request: web::Json<UpdateOrderStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::info!("🔄 Order {} -> {}", id, request.status.as_str());

    let order = state
        .orders
        .update_order_status(&session, None, &id, request.status)
        .await?;
    state.order_queries.invalidate(&order.store_id);

    Ok(HttpResponse::Ok().json(OrderResponse { success: true, order }))
}
