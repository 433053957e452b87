// ==================== DISPLAY ORDER POLLER ====================
// Enquanto existir ao menos um painel aberto para uma loja, um loop em
// background busca os pedidos dessa loja a cada intervalo e grava no cache.
// Todos os painéis da mesma loja compartilham o mesmo loop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::models::StoreId;
use crate::state::{orders_fetcher, AppMetrics, OrderQueries};
use crate::services::OrderRepository;

#[derive(Clone)]
pub struct OrderPoller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    orders: Arc<dyn OrderRepository>,
    cache: Arc<OrderQueries>,
    metrics: Arc<AppMetrics>,
    period: Duration,
    tasks: Mutex<HashMap<StoreId, PollTask>>,
}

struct PollTask {
    subscribers: usize,
    handle: JoinHandle<()>,
    updates: watch::Receiver<u64>,
}

impl OrderPoller {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        cache: Arc<OrderQueries>,
        metrics: Arc<AppMetrics>,
        period: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                orders,
                cache,
                metrics,
                period,
                tasks: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Mounts a display for `store_id`. Without a store nothing is polled and
    /// `None` comes back. Dropping the returned subscription unmounts it.
    pub fn mount(&self, store_id: Option<StoreId>) -> Option<DisplaySubscription> {
        let store_id = store_id?;
        let mut tasks = self.inner.lock();

        let updates = match tasks.get_mut(&store_id) {
            Some(task) => {
                task.subscribers += 1;
                log::debug!("📺 Display joined store {} ({} open)", store_id, task.subscribers);
                task.updates.clone()
            }
            None => {
                let (tx, rx) = watch::channel(0u64);
                let handle = self.spawn_loop(store_id.clone(), tx);
                log::info!("📺 Polling started for store {} (every {:?})", store_id, self.inner.period);
                tasks.insert(
                    store_id.clone(),
                    PollTask { subscribers: 1, handle, updates: rx.clone() },
                );
                rx
            }
        };

        Some(DisplaySubscription {
            store_id,
            inner: Arc::clone(&self.inner),
            updates,
        })
    }

    /// Lojas com pelo menos um painel aberto.
    pub fn active_stores(&self) -> usize {
        self.inner.lock().len()
    }

    /// Painéis abertos, somando todas as lojas.
    pub fn open_displays(&self) -> usize {
        self.inner.lock().values().map(|task| task.subscribers).sum()
    }

    fn spawn_loop(&self, store_id: StoreId, updates: watch::Sender<u64>) -> JoinHandle<()> {
        let cache = Arc::clone(&self.inner.cache);
        let metrics = Arc::clone(&self.inner.metrics);
        let fetcher = orders_fetcher(Arc::clone(&self.inner.orders), store_id.clone(), Arc::clone(&metrics));
        let period = self.inner.period;

        tokio::spawn(async move {
            let mut ticker = interval(period);
            // Uma busca por vez: se uma demorar mais que o período, o próximo
            // tick é adiado em vez de acumulado.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks = 0u64;

            loop {
                ticker.tick().await;

                if let Err(e) = cache.fetch(store_id.clone(), fetcher.clone()).await {
                    log::warn!("⚠️  Poll failed for store {}: {}", store_id, e);
                }

                ticks += 1;
                if updates.send(ticks).is_err() {
                    break;
                }
            }
        })
    }
}

impl PollerInner {
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<StoreId, PollTask>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn unmount(&self, store_id: &StoreId) {
        let mut tasks = self.lock();
        let Some(task) = tasks.get_mut(store_id) else {
            return;
        };

        task.subscribers = task.subscribers.saturating_sub(1);
        if task.subscribers > 0 {
            log::debug!("📺 Display left store {} ({} open)", store_id, task.subscribers);
            return;
        }

        if let Some(task) = tasks.remove(store_id) {
            task.handle.abort();
        }
        // Sai do cache junto; uma busca em andamento não grava mais nada.
        self.cache.remove(store_id);
        log::info!("🛑 Polling stopped for store {}", store_id);
    }
}

/// One mounted display. Holds the poll loop alive for its store.
pub struct DisplaySubscription {
    store_id: StoreId,
    inner: Arc<PollerInner>,
    updates: watch::Receiver<u64>,
}

impl DisplaySubscription {
    pub fn store_id(&self) -> &StoreId {
        &self.store_id
    }

    /// Waits for the next completed poll (successful or not). Returns `false`
    /// once the loop is gone.
    pub async fn changed(&mut self) -> bool {
        self.updates.changed().await.is_ok()
    }

    #[cfg(test)]
    pub fn ticks(&self) -> u64 {
        *self.updates.borrow()
    }
}

impl Drop for DisplaySubscription {
    fn drop(&mut self) {
        self.inner.unmount(&self.store_id);
    }
}
