use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{CartLine, Order};

#[derive(Debug, Clone)]
pub struct CreateOrderData {
    pub items: Vec<CartLine>,
    pub total: i64,
    pub whatsapp_message: String,
}

/// Row shape sent to the orders table; items are stored denormalized.
#[derive(Debug, Clone, Serialize)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub items: Vec<CartLine>,
    pub total: i64,
    pub whatsapp_message: String,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilters {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Result of a checkout: the recorded order plus the deep link the caller
/// is expected to open.
#[derive(Debug, Clone)]
pub struct CheckoutHandoff {
    pub order: Order,
    pub whatsapp_url: String,
}
