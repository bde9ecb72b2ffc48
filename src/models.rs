use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const USER_CART_ID: &str = "user-cart";
pub const GUEST_CART_ID: &str = "guest-cart";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Price in cents.
    pub price: i64,
    pub image_url: String,
    pub category: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartOwner {
    Guest,
    User(Uuid),
}

/// One product inside a cart. For authenticated carts `id` is the server
/// row id; for guest carts it is the product id (one line per product).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub id: Uuid,
    pub owner: CartOwner,
    pub product_id: Uuid,
    pub product: Option<Product>,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartLine {
    pub fn subtotal(&self) -> i64 {
        self.product
            .as_ref()
            .map(|product| product.price * self.quantity as i64)
            .unwrap_or(0)
    }
}

/// Reconciled view over the active cart source. Never persisted; recomputed
/// from cart-line rows (or guest storage) on every load.
#[derive(Debug, Clone, Serialize)]
pub struct Cart {
    pub id: &'static str,
    pub owner: CartOwner,
    pub items: Vec<CartLine>,
    pub total: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(owner: CartOwner, items: Vec<CartLine>) -> Self {
        let total = items.iter().map(CartLine::subtotal).sum();
        let now = Utc::now();
        Self {
            id: match owner {
                CartOwner::Guest => GUEST_CART_ID,
                CartOwner::User(_) => USER_CART_ID,
            },
            owner,
            items,
            total,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// What the guest cart file stores per product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalCartLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<CartLine>,
    pub total: i64,
    pub whatsapp_message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OrderStats {
    pub total_orders: i64,
    pub total_spent: i64,
}
