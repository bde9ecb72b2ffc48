use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::backend::Backend;
use crate::dto::cart::{AddToCartRequest, MAX_LINE_QUANTITY};
use crate::error::{AppError, AppResult};
use crate::guard::ActionGuard;
use crate::models::{Cart, CartLine, CartOwner};
use crate::session::SessionHandle;
use crate::storage::GuestCartStore;

pub const CLEAR_CART_KEY: &str = "clear-cart";

pub fn add_key(product_id: Uuid) -> String {
    format!("add-{product_id}")
}

pub fn update_key(line_id: Uuid) -> String {
    format!("update-{line_id}")
}

pub fn remove_key(line_id: Uuid) -> String {
    format!("remove-{line_id}")
}

#[derive(Default)]
struct CartCache {
    cart: Option<Cart>,
    owner: Option<CartOwner>,
    fresh: bool,
    loaded_once: bool,
}

/// Reconciled cart over two sources of truth: the remote cart-line table
/// while a user is signed in, the guest storage file otherwise.
///
/// Every mutation runs under an action key in the [`ActionGuard`]; a
/// trigger that arrives while the same key is in flight is dropped, not
/// queued. Successful remote mutations mark the cached view stale so the
/// next read refetches; guest mutations rehydrate immediately. A failed
/// mutation leaves the cache untouched.
pub struct CartStore {
    backend: Arc<dyn Backend>,
    session: SessionHandle,
    guest: GuestCartStore,
    guard: ActionGuard,
    cache: RwLock<CartCache>,
}

impl CartStore {
    pub fn new(backend: Arc<dyn Backend>, session: SessionHandle, guest: GuestCartStore) -> Self {
        Self {
            backend,
            session,
            guest,
            guard: ActionGuard::new(),
            cache: RwLock::new(CartCache::default()),
        }
    }

    async fn current_owner(&self) -> CartOwner {
        match self.session.user().await {
            Some(user) => CartOwner::User(user.id),
            None => CartOwner::Guest,
        }
    }

    /// Returns the current cart view, reloading from the active source when
    /// the cache is stale or ownership changed (sign-in/sign-out).
    pub async fn cart(&self) -> AppResult<Option<Cart>> {
        let owner = self.current_owner().await;
        {
            let cache = self.cache.read().await;
            if cache.fresh && cache.owner == Some(owner) {
                return Ok(cache.cart.clone());
            }
        }
        let cart = match owner {
            CartOwner::Guest => self.load_guest_cart().await?,
            CartOwner::User(user_id) => self.load_user_cart(user_id).await?,
        };
        let mut cache = self.cache.write().await;
        cache.cart = cart.clone();
        cache.owner = Some(owner);
        cache.fresh = true;
        cache.loaded_once = true;
        Ok(cart)
    }

    async fn load_user_cart(&self, user_id: Uuid) -> AppResult<Option<Cart>> {
        let items = self.backend.cart_lines(user_id).await?;
        Ok(Some(Cart::new(CartOwner::User(user_id), items)))
    }

    /// Hydrates the guest cart: each stored line is resolved to a live
    /// product; lines that no longer resolve are purged from storage so the
    /// next load is clean.
    async fn load_guest_cart(&self) -> AppResult<Option<Cart>> {
        let stored = self.guest.load().await;
        if stored.is_empty() {
            return Ok(None);
        }
        let mut items = Vec::with_capacity(stored.len());
        for local in stored {
            match self.backend.get_product(local.product_id).await {
                Ok(Some(product)) => items.push(CartLine {
                    id: local.product_id,
                    owner: CartOwner::Guest,
                    product_id: local.product_id,
                    product: Some(product),
                    quantity: local.quantity,
                    created_at: local.created_at,
                    updated_at: local.updated_at,
                }),
                Ok(None) | Err(_) => {
                    if let Err(err) = self.guest.remove(local.product_id).await {
                        tracing::warn!(
                            product_id = %local.product_id,
                            error = %err,
                            "failed to purge stale guest line"
                        );
                    }
                }
            }
        }
        Ok(Some(Cart::new(CartOwner::Guest, items)))
    }

    async fn invalidate(&self) {
        self.cache.write().await.fresh = false;
    }

    /// Guest mutations rehydrate right away; failures here are logged, the
    /// mutation itself already succeeded.
    async fn reload_guest(&self) {
        self.invalidate().await;
        if let Err(err) = self.cart().await {
            tracing::warn!(error = %err, "guest cart reload failed");
        }
    }

    async fn merge_add(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> AppResult<()> {
        match self.backend.find_cart_line(user_id, product_id).await? {
            Some(line) => {
                self.backend
                    .set_line_quantity(line.id, line.quantity + quantity)
                    .await
            }
            None => {
                self.backend
                    .insert_cart_line(user_id, product_id, quantity)
                    .await
            }
        }
    }

    /// Adds `quantity` of a product, merging into an existing line for the
    /// same product by summing quantities.
    pub async fn add_to_cart(&self, product_id: Uuid, quantity: i32) -> AppResult<()> {
        AddToCartRequest {
            product_id,
            quantity,
        }
        .validate()?;
        let key = add_key(product_id);
        let Some(_lease) = self.guard.begin(&key) else {
            tracing::debug!(%key, "duplicate trigger ignored");
            return Ok(());
        };
        match self.current_owner().await {
            CartOwner::User(user_id) => {
                self.merge_add(user_id, product_id, quantity).await?;
                self.invalidate().await;
            }
            CartOwner::Guest => {
                self.guest.add(product_id, quantity).await?;
                self.reload_guest().await;
            }
        }
        Ok(())
    }

    /// Sets an absolute quantity on a line. A quantity below one is a
    /// removal and runs under the remove key, so a concurrent remove of the
    /// same line cannot delete twice.
    pub async fn update_quantity(&self, line_id: Uuid, quantity: i32) -> AppResult<()> {
        if quantity < 1 {
            return self.remove_from_cart(line_id).await;
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(AppError::Validation(format!(
                "quantity cannot exceed {MAX_LINE_QUANTITY}"
            )));
        }
        let key = update_key(line_id);
        let Some(_lease) = self.guard.begin(&key) else {
            tracing::debug!(%key, "duplicate trigger ignored");
            return Ok(());
        };
        match self.current_owner().await {
            CartOwner::User(_) => {
                self.backend.set_line_quantity(line_id, quantity).await?;
                self.invalidate().await;
            }
            CartOwner::Guest => {
                self.guest.set_quantity(line_id, quantity).await?;
                self.reload_guest().await;
            }
        }
        Ok(())
    }

    /// Removes a line. Removing a line that does not exist is a no-op
    /// success.
    pub async fn remove_from_cart(&self, line_id: Uuid) -> AppResult<()> {
        let key = remove_key(line_id);
        let Some(_lease) = self.guard.begin(&key) else {
            tracing::debug!(%key, "duplicate trigger ignored");
            return Ok(());
        };
        match self.current_owner().await {
            CartOwner::User(_) => {
                self.backend.delete_cart_line(line_id).await?;
                self.invalidate().await;
            }
            CartOwner::Guest => {
                self.guest.remove(line_id).await?;
                self.reload_guest().await;
            }
        }
        Ok(())
    }

    pub async fn clear_cart(&self) -> AppResult<()> {
        let already_empty = {
            let cache = self.cache.read().await;
            cache.fresh && cache.cart.as_ref().map_or(true, Cart::is_empty)
        };
        if already_empty {
            return Ok(());
        }
        let Some(_lease) = self.guard.begin(CLEAR_CART_KEY) else {
            tracing::debug!(key = CLEAR_CART_KEY, "duplicate trigger ignored");
            return Ok(());
        };
        match self.current_owner().await {
            CartOwner::User(user_id) => {
                self.backend.clear_cart_lines(user_id).await?;
                self.invalidate().await;
            }
            CartOwner::Guest => {
                self.guest.clear().await?;
                self.reload_guest().await;
            }
        }
        Ok(())
    }

    /// Replays the guest lines as authenticated adds after sign-in, then
    /// clears the guest file. Lines that fail to replay are skipped; the
    /// migration is best-effort, not transactional. Returns whether there
    /// was anything to migrate.
    pub async fn merge_guest_cart(&self) -> AppResult<bool> {
        let CartOwner::User(user_id) = self.current_owner().await else {
            return Err(AppError::Unauthorized);
        };
        let stored = self.guest.load().await;
        if stored.is_empty() {
            return Ok(false);
        }
        for local in &stored {
            if let Err(err) = self
                .merge_add(user_id, local.product_id, local.quantity)
                .await
            {
                tracing::warn!(
                    product_id = %local.product_id,
                    error = %err,
                    "guest line skipped during cart merge"
                );
            }
        }
        self.guest.clear().await?;
        self.invalidate().await;
        Ok(true)
    }

    pub fn is_action_active(&self, key: &str) -> bool {
        self.guard.is_active(key)
    }

    /// True while the initial load is outstanding or any guarded mutation
    /// is in flight. Coarser than the per-key guard; used to disable
    /// controls wholesale.
    pub async fn loading(&self) -> bool {
        self.guard.active_count() > 0 || !self.cache.read().await.loaded_once
    }

    /// Total of the last loaded view, without refetching.
    pub async fn total(&self) -> i64 {
        self.cache
            .read()
            .await
            .cart
            .as_ref()
            .map(|cart| cart.total)
            .unwrap_or(0)
    }
}
