#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;
use tokio::sync::RwLock;
use uuid::Uuid;

use storefront_client::backend::Backend;
use storefront_client::dto::auth::Credentials;
use storefront_client::dto::orders::{NewOrder, OrderFilters};
use storefront_client::error::{AppError, AppResult};
use storefront_client::models::{CartLine, CartOwner, Order, Product, Session, User};
use storefront_client::session::SessionHandle;
use storefront_client::state::AppState;
use storefront_client::storage::GuestCartStore;

pub const TEST_PASSWORD: &str = "secret123";
pub const WHATSAPP_NUMBER: &str = "5511999999999";

/// In-memory stand-in for the hosted backend: products, cart lines and
/// orders live in maps, auth hands out random tokens. Cart writes are
/// counted so tests can assert how often persistence was actually hit.
#[derive(Default)]
pub struct MemoryBackend {
    products: RwLock<HashMap<Uuid, Product>>,
    cart: RwLock<Vec<CartLine>>,
    orders: RwLock<Vec<Order>>,
    users: RwLock<HashMap<String, (String, User)>>,
    sessions: RwLock<HashMap<String, User>>,
    failing_products: RwLock<HashSet<Uuid>>,
    write_delay: Option<Duration>,
    pub cart_writes: AtomicUsize,
    pub order_writes: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stretches every cart write so tests can overlap a second trigger
    /// with an in-flight one.
    pub fn with_write_delay(delay: Duration) -> Self {
        Self {
            write_delay: Some(delay),
            ..Self::default()
        }
    }

    pub async fn add_product(&self, name: &str, price: i64) -> Product {
        let product = Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: format!("{name} description"),
            price,
            image_url: format!("https://cdn.example.com/{name}.jpg"),
            category: "general".to_string(),
            created_at: Some(Utc::now()),
            updated_at: None,
        };
        self.products
            .write()
            .await
            .insert(product.id, product.clone());
        product
    }

    pub async fn remove_product(&self, id: Uuid) {
        self.products.write().await.remove(&id);
    }

    pub async fn register(&self, email: &str, password: &str, name: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
            updated_at: None,
        };
        self.users.write().await.insert(
            email.to_string(),
            (password.to_string(), user.clone()),
        );
        user
    }

    /// Cart writes touching this product will fail from now on.
    pub async fn fail_writes_for(&self, product_id: Uuid) {
        self.failing_products.write().await.insert(product_id);
    }

    pub async fn push_order(&self, order: Order) {
        self.orders.write().await.push(order);
    }

    pub fn cart_write_count(&self) -> usize {
        self.cart_writes.load(Ordering::SeqCst)
    }

    async fn before_cart_write(&self, product_id: Option<Uuid>) -> AppResult<()> {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        self.cart_writes.fetch_add(1, Ordering::SeqCst);
        if let Some(product_id) = product_id {
            if self.failing_products.read().await.contains(&product_id) {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "injected write failure for {product_id}"
                )));
            }
        }
        Ok(())
    }

    async fn with_product(&self, mut line: CartLine) -> CartLine {
        line.product = self.products.read().await.get(&line.product_id).cloned();
        line
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn list_products(&self) -> AppResult<Vec<Product>> {
        Ok(self.products.read().await.values().cloned().collect())
    }

    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn search_products(&self, query: &str) -> AppResult<Vec<Product>> {
        let query = query.to_lowercase();
        Ok(self
            .products
            .read()
            .await
            .values()
            .filter(|product| product.name.to_lowercase().contains(&query))
            .cloned()
            .collect())
    }

    async fn products_by_category(&self, category: &str) -> AppResult<Vec<Product>> {
        Ok(self
            .products
            .read()
            .await
            .values()
            .filter(|product| product.category == category)
            .cloned()
            .collect())
    }

    async fn product_categories(&self) -> AppResult<Vec<String>> {
        let mut categories: Vec<String> = self
            .products
            .read()
            .await
            .values()
            .map(|product| product.category.clone())
            .collect();
        categories.sort();
        Ok(categories)
    }

    async fn cart_lines(&self, user_id: Uuid) -> AppResult<Vec<CartLine>> {
        let lines: Vec<CartLine> = self
            .cart
            .read()
            .await
            .iter()
            .filter(|line| line.owner == CartOwner::User(user_id))
            .cloned()
            .collect();
        let mut resolved = Vec::with_capacity(lines.len());
        for line in lines {
            resolved.push(self.with_product(line).await);
        }
        Ok(resolved)
    }

    async fn find_cart_line(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<Option<CartLine>> {
        Ok(self
            .cart
            .read()
            .await
            .iter()
            .find(|line| {
                line.owner == CartOwner::User(user_id) && line.product_id == product_id
            })
            .cloned())
    }

    async fn insert_cart_line(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<()> {
        self.before_cart_write(Some(product_id)).await?;
        let now = Utc::now();
        self.cart.write().await.push(CartLine {
            id: Uuid::new_v4(),
            owner: CartOwner::User(user_id),
            product_id,
            product: None,
            quantity,
            created_at: now,
            updated_at: now,
        });
        Ok(())
    }

    async fn set_line_quantity(&self, line_id: Uuid, quantity: i32) -> AppResult<()> {
        let product_id = self
            .cart
            .read()
            .await
            .iter()
            .find(|line| line.id == line_id)
            .map(|line| line.product_id);
        self.before_cart_write(product_id).await?;
        let mut cart = self.cart.write().await;
        if let Some(line) = cart.iter_mut().find(|line| line.id == line_id) {
            line.quantity = quantity;
            line.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_cart_line(&self, line_id: Uuid) -> AppResult<()> {
        self.before_cart_write(None).await?;
        self.cart.write().await.retain(|line| line.id != line_id);
        Ok(())
    }

    async fn clear_cart_lines(&self, user_id: Uuid) -> AppResult<()> {
        self.before_cart_write(None).await?;
        self.cart
            .write()
            .await
            .retain(|line| line.owner != CartOwner::User(user_id));
        Ok(())
    }

    async fn insert_order(&self, order: NewOrder) -> AppResult<Order> {
        self.order_writes.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let stored = Order {
            id: Uuid::new_v4(),
            user_id: order.user_id,
            items: order.items,
            total: order.total,
            whatsapp_message: order.whatsapp_message,
            created_at: now,
            updated_at: now,
        };
        self.orders.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn orders(&self, user_id: Uuid, filters: &OrderFilters) -> AppResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .await
            .iter()
            .filter(|order| order.user_id == user_id)
            .filter(|order| {
                filters
                    .start_date
                    .map_or(true, |start| order.created_at >= start)
            })
            .filter(|order| filters.end_date.map_or(true, |end| order.created_at <= end))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let offset = filters.offset.unwrap_or(0).max(0) as usize;
        let mut orders: Vec<Order> = orders.into_iter().skip(offset).collect();
        if let Some(limit) = filters.limit {
            orders.truncate(limit.max(0) as usize);
        }
        Ok(orders)
    }

    async fn order_by_id(&self, order_id: Uuid) -> AppResult<Option<Order>> {
        Ok(self
            .orders
            .read()
            .await
            .iter()
            .find(|order| order.id == order_id)
            .cloned())
    }

    async fn order_totals(&self, user_id: Uuid) -> AppResult<Vec<i64>> {
        Ok(self
            .orders
            .read()
            .await
            .iter()
            .filter(|order| order.user_id == user_id)
            .map(|order| order.total)
            .collect())
    }

    async fn sign_up(&self, email: &str, password: &str, name: &str) -> AppResult<()> {
        if self.users.read().await.contains_key(email) {
            return Err(AppError::Validation(
                "email is already registered".to_string(),
            ));
        }
        self.register(email, password, name).await;
        Ok(())
    }

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<Session> {
        let users = self.users.read().await;
        let Some((stored_password, user)) = users.get(email) else {
            return Err(AppError::Validation("Invalid login credentials".to_string()));
        };
        if stored_password.as_str() != password {
            return Err(AppError::Validation("Invalid login credentials".to_string()));
        }
        let token = Uuid::new_v4().to_string();
        let user = user.clone();
        drop(users);
        self.sessions.write().await.insert(token.clone(), user.clone());
        Ok(Session {
            access_token: token,
            user,
        })
    }

    async fn sign_out(&self, access_token: &str) -> AppResult<()> {
        self.sessions.write().await.remove(access_token);
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> AppResult<Option<User>> {
        Ok(self.sessions.read().await.get(access_token).cloned())
    }
}

pub struct TestContext {
    pub state: AppState,
    pub backend: Arc<MemoryBackend>,
    pub guest_path: PathBuf,
    _dir: TempDir,
}

pub fn context() -> TestContext {
    context_with(MemoryBackend::new())
}

pub fn context_with(backend: MemoryBackend) -> TestContext {
    let backend = Arc::new(backend);
    let dir = tempfile::tempdir().expect("tempdir");
    let guest_path = dir.path().join("guest_cart.json");
    let state = AppState::with_backend(
        Arc::clone(&backend) as Arc<dyn Backend>,
        SessionHandle::new(),
        GuestCartStore::new(guest_path.clone()),
        WHATSAPP_NUMBER,
    );
    TestContext {
        state,
        backend,
        guest_path,
        _dir: dir,
    }
}

/// Registers and signs in a fresh user.
pub async fn sign_in(ctx: &TestContext, email: &str) -> User {
    ctx.backend.register(email, TEST_PASSWORD, "Test User").await;
    ctx.state
        .auth
        .sign_in(Credentials {
            email: email.to_string(),
            password: TEST_PASSWORD.to_string(),
        })
        .await
        .expect("sign in")
}
