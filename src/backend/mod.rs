use async_trait::async_trait;
use uuid::Uuid;

use crate::dto::orders::{NewOrder, OrderFilters};
use crate::error::AppResult;
use crate::models::{CartLine, Order, Product, Session, User};

pub mod http;

pub use http::HttpBackend;

/// The hosted backend as the client sees it: three logical tables plus the
/// auth endpoints. Implementations own transport and representation; the
/// services above this trait own every business rule.
#[async_trait]
pub trait Backend: Send + Sync {
    // products, read-only
    async fn list_products(&self) -> AppResult<Vec<Product>>;
    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>>;
    async fn search_products(&self, query: &str) -> AppResult<Vec<Product>>;
    async fn products_by_category(&self, category: &str) -> AppResult<Vec<Product>>;
    /// Raw category column values in table order; callers dedupe.
    async fn product_categories(&self) -> AppResult<Vec<String>>;

    // cart lines, scoped by owner
    async fn cart_lines(&self, user_id: Uuid) -> AppResult<Vec<CartLine>>;
    async fn find_cart_line(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<Option<CartLine>>;
    async fn insert_cart_line(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<()>;
    async fn set_line_quantity(&self, line_id: Uuid, quantity: i32) -> AppResult<()>;
    /// Deleting an absent line is a success, not an error.
    async fn delete_cart_line(&self, line_id: Uuid) -> AppResult<()>;
    async fn clear_cart_lines(&self, user_id: Uuid) -> AppResult<()>;

    // orders
    async fn insert_order(&self, order: NewOrder) -> AppResult<Order>;
    async fn orders(&self, user_id: Uuid, filters: &OrderFilters) -> AppResult<Vec<Order>>;
    async fn order_by_id(&self, order_id: Uuid) -> AppResult<Option<Order>>;
    async fn order_totals(&self, user_id: Uuid) -> AppResult<Vec<i64>>;

    // auth
    async fn sign_up(&self, email: &str, password: &str, name: &str) -> AppResult<()>;
    async fn sign_in(&self, email: &str, password: &str) -> AppResult<Session>;
    async fn sign_out(&self, access_token: &str) -> AppResult<()>;
    async fn get_user(&self, access_token: &str) -> AppResult<Option<User>>;
}
