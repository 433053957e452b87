use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};

use crate::config::Config;
use crate::database::Supabase;
use crate::display::DisplayBoard;
use crate::jobs::OrderPoller;
use crate::models::{Order, StoreId};
use crate::services::{AuthProvider, JwtVerifier, OrderRepository, StoreRepository};
use crate::utils::{AppError, QueryCache, QueryOptions, QuerySnapshot};

pub type OrderQueries = QueryCache<StoreId, Vec<Order>>;

/// Contadores expostos em `/metrics`.
#[derive(Debug, Default)]
pub struct AppMetrics {
    pub http_requests_total: AtomicU64,
    pub http_errors_total: AtomicU64,
    pub order_fetches_total: AtomicU64,
    pub order_fetch_errors_total: AtomicU64,
}

impl AppMetrics {
    pub fn increment(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// Producer for the orders of one store, shared by the poller and the pages
/// so both go through the same cache key.
pub fn orders_fetcher(
    orders: Arc<dyn OrderRepository>,
    store_id: StoreId,
    metrics: Arc<AppMetrics>,
) -> impl Fn() -> BoxFuture<'static, Result<Vec<Order>, AppError>> + Clone + Send + Sync + 'static {
    move || {
        let orders = Arc::clone(&orders);
        let store_id = store_id.clone();
        let metrics = Arc::clone(&metrics);
        async move {
            AppMetrics::increment(&metrics.order_fetches_total);
            let result = orders.get_orders(&store_id).await;
            if result.is_err() {
                AppMetrics::increment(&metrics.order_fetch_errors_total);
            }
            result
        }
        .boxed()
    }
}

/// Estado compartilhado da aplicação, injetado via `web::Data`.
pub struct AppState {
    pub config: Config,
    pub orders: Arc<dyn OrderRepository>,
    pub stores: Arc<dyn StoreRepository>,
    pub auth: Arc<dyn AuthProvider>,
    pub jwt: Option<JwtVerifier>,
    pub order_queries: Arc<OrderQueries>,
    pub poller: OrderPoller,
    pub metrics: Arc<AppMetrics>,
}

impl AppState {
    pub fn new(
        config: Config,
        orders: Arc<dyn OrderRepository>,
        stores: Arc<dyn StoreRepository>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        let options = QueryOptions {
            stale_time: config.poll_interval,
            retry: config.query_retry,
            ..QueryOptions::default()
        };
        let order_queries = Arc::new(QueryCache::new(options));
        let metrics = Arc::new(AppMetrics::default());
        let poller = OrderPoller::new(
            Arc::clone(&orders),
            Arc::clone(&order_queries),
            Arc::clone(&metrics),
            config.poll_interval,
        );
        let jwt = config.supabase_jwt_secret.as_deref().map(JwtVerifier::new);

        Self {
            config,
            orders,
            stores,
            auth,
            jwt,
            order_queries,
            poller,
            metrics,
        }
    }

    pub fn with_supabase(config: Config) -> Result<Self, AppError> {
        let supabase = Arc::new(Supabase::new(&config)?);
        Ok(Self::new(config, supabase.clone(), supabase.clone(), supabase))
    }

    /// Orders of a store through the cache; refetches when the cached copy
    /// is older than one poll interval.
    pub async fn query_orders(&self, store_id: Option<StoreId>) -> QuerySnapshot<Vec<Order>> {
        let Some(id) = store_id else {
            return QuerySnapshot::disabled();
        };
        let fetcher = orders_fetcher(Arc::clone(&self.orders), id.clone(), Arc::clone(&self.metrics));
        self.order_queries.query(Some(id), fetcher).await
    }

    pub fn board_from_cache(&self, store_id: &StoreId) -> DisplayBoard {
        let snapshot = self.order_queries.snapshot(store_id);
        DisplayBoard::build(store_id.clone(), &snapshot, Utc::now(), self.config.stale_after_secs)
    }
}
