use std::sync::Arc;

use crate::backend::{Backend, HttpBackend};
use crate::config::AppConfig;
use crate::services::{AuthService, CartStore, OrderService, ProductService};
use crate::session::SessionHandle;
use crate::storage::GuestCartStore;

/// Composition root. Every service is constructed once and shares the
/// backend and session by reference; nothing hangs off global state.
pub struct AppState {
    pub auth: AuthService,
    pub products: ProductService,
    pub cart: CartStore,
    pub orders: OrderService,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        let session = SessionHandle::new();
        let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(
            &config.backend_url,
            &config.anon_key,
            session.clone(),
        ));
        Self::with_backend(
            backend,
            session,
            GuestCartStore::new(config.guest_cart_path.clone()),
            &config.whatsapp_number,
        )
    }

    /// Seam for wiring a different backend implementation; tests inject an
    /// in-memory one here.
    pub fn with_backend(
        backend: Arc<dyn Backend>,
        session: SessionHandle,
        guest: GuestCartStore,
        whatsapp_number: &str,
    ) -> Self {
        Self {
            auth: AuthService::new(Arc::clone(&backend), session.clone()),
            products: ProductService::new(Arc::clone(&backend)),
            cart: CartStore::new(Arc::clone(&backend), session.clone(), guest),
            orders: OrderService::new(backend, session, whatsapp_number.to_string()),
        }
    }
}
