// ==================== CACHE GC ====================
// Limpa do cache as lojas que ninguém consulta há mais de `gc_time`.
// Qualquer GET público cria uma entrada (até /favicon.ico), então sem isso
// o mapa só cresce.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::state::OrderQueries;

/// Inicia o job de limpeza; roda a cada `every`.
pub fn start_cache_gc(cache: Arc<OrderQueries>, every: Duration) -> JoinHandle<()> {
    log::info!("🧹 Starting order cache GC (every {:?})", every);

    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // o primeiro tick é imediato e não teria o que limpar
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = cache.gc();
            if removed > 0 {
                log::debug!("🧹 Cache GC removed {} idle stores ({} left)", removed, cache.len());
            }
        }
    })
}
