use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::backend::Backend;
use crate::dto::orders::{CheckoutHandoff, CreateOrderData, NewOrder, OrderFilters};
use crate::error::{AppError, AppResult};
use crate::models::{Order, OrderStats, User};
use crate::services::cart_service::CartStore;
use crate::session::SessionHandle;
use crate::whatsapp;

pub struct OrderService {
    backend: Arc<dyn Backend>,
    session: SessionHandle,
    whatsapp_number: String,
}

impl OrderService {
    pub fn new(backend: Arc<dyn Backend>, session: SessionHandle, whatsapp_number: String) -> Self {
        Self {
            backend,
            session,
            whatsapp_number,
        }
    }

    async fn require_user(&self) -> AppResult<User> {
        self.session.user().await.ok_or(AppError::Unauthorized)
    }

    pub async fn create_order(&self, data: CreateOrderData) -> AppResult<Order> {
        let user = self.require_user().await?;
        if data.items.is_empty() {
            return Err(AppError::Validation(
                "order must have at least one item".to_string(),
            ));
        }
        self.backend
            .insert_order(NewOrder {
                user_id: user.id,
                items: data.items,
                total: data.total,
                whatsapp_message: data.whatsapp_message,
            })
            .await
    }

    /// Formats the cart for WhatsApp, records the order, then clears the
    /// cart. The hand-off link and the order write are independent; there
    /// is no rollback if one succeeds without the other.
    pub async fn checkout(&self, cart_store: &CartStore) -> AppResult<CheckoutHandoff> {
        let user = self.require_user().await?;
        let cart = cart_store
            .cart()
            .await?
            .filter(|cart| !cart.is_empty())
            .ok_or_else(|| AppError::Validation("cart is empty".to_string()))?;
        let message = whatsapp::order_message(&cart.items, cart.total, &user.name);
        let whatsapp_url = whatsapp::order_link(&self.whatsapp_number, &message);
        let order = self
            .create_order(CreateOrderData {
                items: cart.items,
                total: cart.total,
                whatsapp_message: message,
            })
            .await?;
        if let Err(err) = cart_store.clear_cart().await {
            tracing::warn!(order_id = %order.id, error = %err, "cart not cleared after checkout");
        }
        tracing::info!(order_id = %order.id, total = order.total, "order created");
        Ok(CheckoutHandoff {
            order,
            whatsapp_url,
        })
    }

    pub async fn list_orders(&self, filters: OrderFilters) -> AppResult<Vec<Order>> {
        let user = self.require_user().await?;
        self.backend.orders(user.id, &filters).await
    }

    pub async fn get_order(&self, order_id: Uuid) -> AppResult<Option<Order>> {
        self.backend.order_by_id(order_id).await
    }

    pub async fn stats(&self) -> AppResult<OrderStats> {
        let user = self.require_user().await?;
        let totals = self.backend.order_totals(user.id).await?;
        Ok(OrderStats {
            total_orders: totals.len() as i64,
            total_spent: totals.iter().sum(),
        })
    }

    pub async fn has_orders(&self) -> AppResult<bool> {
        let orders = self
            .list_orders(OrderFilters {
                limit: Some(1),
                ..Default::default()
            })
            .await?;
        Ok(!orders.is_empty())
    }

    /// Most recent order, if any. The backend returns newest first.
    pub async fn last_order(&self) -> AppResult<Option<Order>> {
        let mut orders = self
            .list_orders(OrderFilters {
                limit: Some(1),
                ..Default::default()
            })
            .await?;
        Ok(orders.pop())
    }

    pub async fn recent_orders(&self, limit: i64) -> AppResult<Vec<Order>> {
        let start = Utc::now() - Duration::days(30);
        self.list_orders(OrderFilters {
            start_date: Some(start),
            limit: Some(limit),
            ..Default::default()
        })
        .await
    }

    /// Re-issues a past order as a new one. Only the owner may duplicate.
    pub async fn duplicate_order(&self, order_id: Uuid) -> AppResult<Order> {
        let user = self.require_user().await?;
        let order = self.get_order(order_id).await?.ok_or(AppError::NotFound)?;
        if order.user_id != user.id {
            return Err(AppError::Forbidden);
        }
        self.create_order(CreateOrderData {
            items: order.items,
            total: order.total,
            whatsapp_message: order.whatsapp_message,
        })
        .await
    }
}
