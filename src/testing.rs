//! Backend em memória para testes: implementa os mesmos traits que o cliente
//! do Supabase, sem rede.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use uuid::Uuid;

use crate::models::{Order, OrderStatus, Session, Store, StoreId, User};
use crate::services::order_service::{validate_new_order, validate_status};
use crate::services::store_service::validate_store_name;
use crate::services::{AuthProvider, OrderRepository, StoreRepository};
use crate::utils::AppError;

pub const TEST_PASSWORD: &str = "rahasia";

#[derive(Default)]
pub struct MemoryBackend {
    orders: Mutex<Vec<Order>>,
    stores: Mutex<Vec<Store>>,
    sessions: Mutex<HashMap<String, User>>,
    refresh_tokens: Mutex<HashMap<String, User>>,
    order_reads: AtomicU32,
    fail_reads: AtomicBool,
    read_delay: Mutex<Duration>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_reads(&self) -> u32 {
        self.order_reads.load(Ordering::SeqCst)
    }

    pub fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = delay;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn add_store(&self, name: &str) -> Store {
        let store = Store {
            id: StoreId::parse(&Uuid::new_v4().to_string()).unwrap(),
            name: name.to_string(),
            created_at: Some(Utc::now()),
        };
        self.stores.lock().unwrap().push(store.clone());
        store
    }

    pub fn add_order(&self, order: Order) {
        self.orders.lock().unwrap().push(order);
    }

    pub fn all_orders(&self) -> Vec<Order> {
        self.orders.lock().unwrap().clone()
    }

    /// Session as if the user had just signed in.
    pub fn issue_session(&self, email: &str) -> Session {
        let user = User { id: Uuid::new_v4().to_string(), email: Some(email.to_string()) };
        let access_token = format!("access-{}", Uuid::new_v4());
        let refresh_token = format!("refresh-{}", Uuid::new_v4());

        self.sessions.lock().unwrap().insert(access_token.clone(), user.clone());
        self.refresh_tokens.lock().unwrap().insert(refresh_token.clone(), user.clone());

        Session {
            access_token,
            refresh_token: Some(refresh_token),
            expires_at: Some(Utc::now() + ChronoDuration::hours(1)),
            user,
        }
    }

    fn require(&self, session: &Session) -> Result<(), AppError> {
        if self.sessions.lock().unwrap().contains_key(&session.access_token) {
            Ok(())
        } else {
            Err(AppError::Unauthorized("JWT expired".into()))
        }
    }
}

#[async_trait]
impl OrderRepository for MemoryBackend {
    async fn get_orders(&self, store_id: &StoreId) -> Result<Vec<Order>, AppError> {
        self.order_reads.fetch_add(1, Ordering::SeqCst);

        let delay = *self.read_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Network("connection refused".into()));
        }

        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .filter(|o| &o.store_id == store_id)
            .cloned()
            .collect())
    }

    async fn create_order(
        &self,
        session: &Session,
        store_id: &StoreId,
        order_id: &str,
        name: &str,
    ) -> Result<Order, AppError> {
        self.require(session)?;
        let (order_id, name) = validate_new_order(order_id, name)?;
        let now = Utc::now();

        let order = Order {
            id: Uuid::new_v4().to_string(),
            store_id: store_id.clone(),
            order_id,
            name,
            status: OrderStatus::Preparing,
            created_at: Some(now),
            updated_at: now,
        };
        self.orders.lock().unwrap().push(order.clone());
        Ok(order)
    }

    async fn update_order_status(
        &self,
        session: &Session,
        store_id: Option<&StoreId>,
        id: &str,
        status: OrderStatus,
    ) -> Result<Order, AppError> {
        self.require(session)?;
        let status = validate_status(status)?;

        let mut orders = self.orders.lock().unwrap();
        let order = orders
            .iter_mut()
            .find(|o| o.id == id && store_id.map_or(true, |s| &o.store_id == s))
            .ok_or_else(|| AppError::NotFound(format!("Order {} not found", id)))?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }
}

#[async_trait]
impl StoreRepository for MemoryBackend {
    async fn list_stores(&self, session: &Session) -> Result<Vec<Store>, AppError> {
        self.require(session)?;
        Ok(self.stores.lock().unwrap().clone())
    }

    async fn get_store(&self, session: &Session, id: &StoreId) -> Result<Option<Store>, AppError> {
        self.require(session)?;
        Ok(self.stores.lock().unwrap().iter().find(|s| &s.id == id).cloned())
    }

    async fn create_store(&self, session: &Session, name: &str) -> Result<Store, AppError> {
        self.require(session)?;
        let name = validate_store_name(name)?;
        Ok(self.add_store(&name))
    }

    async fn rename_store(&self, session: &Session, id: &StoreId, name: &str) -> Result<Store, AppError> {
        self.require(session)?;
        let name = validate_store_name(name)?;

        let mut stores = self.stores.lock().unwrap();
        let store = stores
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Store {} not found", id)))?;
        store.name = name;
        Ok(store.clone())
    }

    async fn delete_store(&self, session: &Session, id: &StoreId) -> Result<(), AppError> {
        self.require(session)?;
        self.stores.lock().unwrap().retain(|s| &s.id != id);
        self.orders.lock().unwrap().retain(|o| &o.store_id != id);
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for MemoryBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        if password != TEST_PASSWORD {
            return Err(AppError::Unauthorized("Invalid login credentials".into()));
        }
        Ok(self.issue_session(email))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AppError> {
        let user = self
            .refresh_tokens
            .lock()
            .unwrap()
            .remove(refresh_token)
            .ok_or_else(|| AppError::Unauthorized("Invalid Refresh Token".into()))?;

        let mut session = self.issue_session(user.email.as_deref().unwrap_or_default());
        session.user = user.clone();
        self.sessions.lock().unwrap().insert(session.access_token.clone(), user.clone());
        if let Some(refresh) = &session.refresh_token {
            self.refresh_tokens.lock().unwrap().insert(refresh.clone(), user);
        }
        Ok(session)
    }

    async fn get_user(&self, access_token: &str) -> Result<User, AppError> {
        self.sessions
            .lock()
            .unwrap()
            .get(access_token)
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("invalid JWT".into()))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        self.sessions.lock().unwrap().remove(access_token);
        Ok(())
    }
}
