use std::sync::Arc;

use uuid::Uuid;

use crate::backend::Backend;
use crate::error::{AppError, AppResult};
use crate::models::Product;

/// Catalog reads. Products are immutable from the client's perspective.
pub struct ProductService {
    backend: Arc<dyn Backend>,
}

impl ProductService {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn list(&self) -> AppResult<Vec<Product>> {
        self.backend.list_products().await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Option<Product>> {
        self.backend.get_product(id).await
    }

    pub async fn search(&self, query: &str) -> AppResult<Vec<Product>> {
        if query.len() > 255 {
            return Err(AppError::Validation("search term too long".to_string()));
        }
        self.backend.search_products(query).await
    }

    pub async fn by_category(&self, category: &str) -> AppResult<Vec<Product>> {
        self.backend.products_by_category(category).await
    }

    /// Distinct categories; the backend returns the raw column sorted, so
    /// deduping adjacent values is enough.
    pub async fn categories(&self) -> AppResult<Vec<String>> {
        let mut categories = self.backend.product_categories().await?;
        categories.dedup();
        Ok(categories)
    }
}
