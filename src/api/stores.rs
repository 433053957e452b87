use actix_web::{web, HttpResponse};

use crate::models::{OrdersResponse, Session, StoreId, StoreRequest, StoreResponse, StoresResponse};
use crate::state::AppState;
use crate::utils::AppError;

pub(crate) fn store_id_from(raw: &str) -> Result<StoreId, AppError> {
    StoreId::parse(raw).ok_or_else(|| AppError::InvalidRequest("store id must not be empty".into()))
}

/// GET /api/v1/stores - Lista as lojas visíveis para o usuário
#[utoipa::path(
    get,
    path = "/api/v1/stores",
    tag = "Stores",
    responses(
        (status = 200, description = "Stores of the signed-in admin", body = StoresResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_stores(
    session: web::ReqData<Session>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let stores = state.stores.list_stores(&session).await?;
    Ok(HttpResponse::Ok().json(StoresResponse {
        success: true,
        count: stores.len(),
        stores,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores",
    tag = "Stores",
    request_body = StoreRequest,
    responses(
        (status = 201, description = "Store created", body = StoreResponse),
        (status = 400, description = "Blank name")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_store(
    session: web::ReqData<Session>,
    state: web::Data<AppState>,
    request: web::Json<StoreRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🏪 Creating store '{}' for user {}", request.name, session.user.id);
    let store = state.stores.create_store(&session, &request.name).await?;
    Ok(HttpResponse::Created().json(StoreResponse { success: true, store }))
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{id}",
    tag = "Stores",
    params(("id" = String, Path, description = "Store id")),
    responses(
        (status = 200, description = "Store", body = StoreResponse),
        (status = 404, description = "Store not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_store(
    session: web::ReqData<Session>,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = store_id_from(&path)?;
    let store = state
        .stores
        .get_store(&session, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Store {} not found", id)))?;
    Ok(HttpResponse::Ok().json(StoreResponse { success: true, store }))
}

#[utoipa::path(
    patch,
    path = "/api/v1/stores/{id}",
    tag = "Stores",
    params(("id" = String, Path, description = "Store id")),
    request_body = StoreRequest,
    responses(
        (status = 200, description = "Store renamed", body = StoreResponse),
        (status = 404, description = "Store not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn rename_store(
    session: web::ReqData<Session>,
    state: web::Data<AppState>,
    path: web::Path<String>,
    request: web::Json<StoreRequest>,
) -> Result<HttpResponse, AppError> {
    let id = store_id_from(&path)?;
    let store = state.stores.rename_store(&session, &id, &request.name).await?;
    Ok(HttpResponse::Ok().json(StoreResponse { success: true, store }))
}

#[utoipa::path(
    delete,
    path = "/api/v1/stores/{id}",
    tag = "Stores",
    params(("id" = String, Path, description = "Store id")),
    responses((status = 200, description = "Store deleted")),
    security(("bearer_auth" = []))
)]
pub async fn delete_store(
    session: web::ReqData<Session>,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = store_id_from(&path)?;
    state.stores.delete_store(&session, &id).await?;
    state.order_queries.invalidate(&id);
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

/// GET /api/v1/stores/{id}/orders - Todos os pedidos da loja, qualquer status
#[utoipa::path(
    get,
    path = "/api/v1/stores/{id}/orders",
    tag = "Orders",
    params(("id" = String, Path, description = "Store id")),
    responses((status = 200, description = "Orders of the store", body = OrdersResponse)),
    security(("bearer_auth" = []))
)]
pub async fn list_store_orders(
    _session: web::ReqData<Session>,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = store_id_from(&path)?;
    let mut orders = state.orders.get_orders(&id).await?;
    orders.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

    Ok(HttpResponse::Ok().json(OrdersResponse {
        success: true,
        count: orders.len(),
        orders,
    }))
}
