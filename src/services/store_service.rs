use async_trait::async_trait;
use reqwest::Method;

use crate::database::Supabase;
use crate::models::{Session, Store, StoreId};
use crate::utils::AppError;

#[async_trait]
pub trait StoreRepository: Send + Sync {
    async fn list_stores(&self, session: &Session) -> Result<Vec<Store>, AppError>;
    async fn get_store(&self, session: &Session, id: &StoreId) -> Result<Option<Store>, AppError>;
    async fn create_store(&self, session: &Session, name: &str) -> Result<Store, AppError>;
    async fn rename_store(&self, session: &Session, id: &StoreId, name: &str) -> Result<Store, AppError>;
    /// Pedidos da loja são removidos pelo cascade da FK no banco.
    async fn delete_store(&self, session: &Session, id: &StoreId) -> Result<(), AppError>;
}

pub fn validate_store_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidRequest("name must not be empty".into()));
    }
    Ok(name.to_string())
}

#[async_trait]
impl StoreRepository for Supabase {
    async fn list_stores(&self, session: &Session) -> Result<Vec<Store>, AppError> {
        let request = self
            .rest(Method::GET, "stores", Some(session.access_token.as_str()))
            .query(&[("select", "*"), ("order", "created_at.asc")]);

        Supabase::send_json(request).await
    }

    async fn get_store(&self, session: &Session, id: &StoreId) -> Result<Option<Store>, AppError> {
        let request = self
            .rest(Method::GET, "stores", Some(session.access_token.as_str()))
            .query(&[("select", "*".to_string()), ("id", format!("eq.{}", id))]);

        let mut stores: Vec<Store> = Supabase::send_json(request).await?;
        Ok(stores.pop())
    }

    async fn create_store(&self, session: &Session, name: &str) -> Result<Store, AppError> {
        let name = validate_store_name(name)?;

        let request = self
            .rest(Method::POST, "stores", Some(session.access_token.as_str()))
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "name": name }));

        let mut created: Vec<Store> = Supabase::send_json(request).await?;
        created
            .pop()
            .ok_or_else(|| AppError::Backend { status: 200, message: "Insert returned no row".into() })
    }

    async fn rename_store(&self, session: &Session, id: &StoreId, name: &str) -> Result<Store, AppError> {
        let name = validate_store_name(name)?;

        let request = self
            .rest(Method::PATCH, "stores", Some(session.access_token.as_str()))
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "name": name }));

        let mut updated: Vec<Store> = Supabase::send_json(request).await?;
        updated
            .pop()
            .ok_or_else(|| AppError::NotFound(format!("Store {} not found", id)))
    }

    async fn delete_store(&self, session: &Session, id: &StoreId) -> Result<(), AppError> {
        let request = self
            .rest(Method::DELETE, "stores", Some(session.access_token.as_str()))
            .query(&[("id", format!("eq.{}", id))]);

        Supabase::send(request).await?;
        log::info!("🗑️  Store {} deleted", id);
        Ok(())
    }
}
