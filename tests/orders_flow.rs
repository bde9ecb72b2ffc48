use chrono::{Duration, Utc};
use uuid::Uuid;

use storefront_client::dto::orders::{CreateOrderData, OrderFilters};
use storefront_client::models::{CartLine, CartOwner, Order};
use storefront_client::whatsapp;

mod common;

// Checkout flow: format message, record the order, clear the cart.
#[tokio::test]
async fn checkout_records_order_and_clears_cart() {
    let ctx = common::context();
    let beans = ctx.backend.add_product("Beans", 2500).await;
    let filters = ctx.backend.add_product("Filters", 700).await;
    common::sign_in(&ctx, "checkout@example.com").await;

    ctx.state.cart.add_to_cart(beans.id, 2).await.unwrap();
    ctx.state.cart.add_to_cart(filters.id, 1).await.unwrap();

    let handoff = ctx.state.orders.checkout(&ctx.state.cart).await.unwrap();

    assert_eq!(handoff.order.total, 2 * beans.price + filters.price);
    assert_eq!(handoff.order.items.len(), 2);
    assert!(handoff.order.whatsapp_message.contains("Beans"));
    assert!(handoff.order.whatsapp_message.contains("R$ 25.00"));
    assert!(
        handoff
            .whatsapp_url
            .starts_with("https://wa.me/5511999999999?text=")
    );
    // the message is percent-encoded into the link
    assert!(!handoff.whatsapp_url.contains(' '));
    assert!(handoff.whatsapp_url.contains("%2A"));

    let cart = ctx.state.cart.cart().await.unwrap().expect("cart view");
    assert!(cart.is_empty());

    let orders = ctx
        .state
        .orders
        .list_orders(OrderFilters::default())
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, handoff.order.id);
}

#[tokio::test]
async fn checkout_rejects_empty_cart() {
    let ctx = common::context();
    common::sign_in(&ctx, "empty@example.com").await;
    assert!(ctx.state.orders.checkout(&ctx.state.cart).await.is_err());
}

#[tokio::test]
async fn checkout_requires_sign_in() {
    let ctx = common::context();
    let product = ctx.backend.add_product("Beans", 2500).await;
    ctx.state.cart.add_to_cart(product.id, 1).await.unwrap();
    assert!(ctx.state.orders.checkout(&ctx.state.cart).await.is_err());
}

#[tokio::test]
async fn stats_fold_order_totals() {
    let ctx = common::context();
    let product = ctx.backend.add_product("Kit", 10000).await;
    common::sign_in(&ctx, "stats@example.com").await;

    for quantity in [1, 3] {
        ctx.state.cart.add_to_cart(product.id, quantity).await.unwrap();
        ctx.state.orders.checkout(&ctx.state.cart).await.unwrap();
    }

    let stats = ctx.state.orders.stats().await.unwrap();
    assert_eq!(stats.total_orders, 2);
    assert_eq!(stats.total_spent, 4 * product.price);
    assert!(ctx.state.orders.has_orders().await.unwrap());
}

#[tokio::test]
async fn last_order_returns_the_newest() {
    let ctx = common::context();
    let user = common::sign_in(&ctx, "latest@example.com").await;

    let mut old = order_fixture(user.id, 1000);
    old.created_at = Utc::now() - Duration::days(2);
    ctx.backend.push_order(old).await;
    let mut new = order_fixture(user.id, 2000);
    new.created_at = Utc::now();
    let new_id = new.id;
    ctx.backend.push_order(new).await;

    let last = ctx.state.orders.last_order().await.unwrap().expect("order");
    assert_eq!(last.id, new_id);
}

#[tokio::test]
async fn recent_orders_exclude_old_ones() {
    let ctx = common::context();
    let user = common::sign_in(&ctx, "recent@example.com").await;

    let mut stale = order_fixture(user.id, 1500);
    stale.created_at = Utc::now() - Duration::days(45);
    ctx.backend.push_order(stale).await;
    let fresh = order_fixture(user.id, 2500);
    let fresh_id = fresh.id;
    ctx.backend.push_order(fresh).await;

    let recent = ctx.state.orders.recent_orders(10).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].id, fresh_id);

    // an explicit window behaves the same way
    let all = ctx
        .state
        .orders
        .list_orders(OrderFilters::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn duplicate_order_enforces_ownership() {
    let ctx = common::context();
    let owner = common::sign_in(&ctx, "owner@example.com").await;
    let order = order_fixture(owner.id, 4200);
    let order_id = order.id;
    ctx.backend.push_order(order).await;

    let copy = ctx.state.orders.duplicate_order(order_id).await.unwrap();
    assert_ne!(copy.id, order_id);
    assert_eq!(copy.total, 4200);

    // unknown id
    assert!(
        ctx.state
            .orders
            .duplicate_order(Uuid::new_v4())
            .await
            .is_err()
    );

    // somebody else's order
    common::sign_in(&ctx, "intruder@example.com").await;
    assert!(ctx.state.orders.duplicate_order(order_id).await.is_err());
}

#[tokio::test]
async fn create_order_rejects_empty_items() {
    let ctx = common::context();
    common::sign_in(&ctx, "none@example.com").await;
    let result = ctx
        .state
        .orders
        .create_order(CreateOrderData {
            items: Vec::new(),
            total: 0,
            whatsapp_message: String::new(),
        })
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn whatsapp_message_lists_every_line() {
    let ctx = common::context();
    let beans = ctx.backend.add_product("Beans", 2490).await;
    ctx.state.cart.add_to_cart(beans.id, 3).await.unwrap();
    let cart = ctx.state.cart.cart().await.unwrap().expect("cart");

    let message = whatsapp::order_message(&cart.items, cart.total, "Maria");
    assert!(message.contains("Novo Pedido - Maria"));
    assert!(message.contains("1. *Beans*"));
    assert!(message.contains("Quantidade: 3"));
    assert!(message.contains("R$ 24.90"));
    assert!(message.contains("Total: R$ 74.70"));
    assert!(message.ends_with("Confirma o pedido?"));

    let link = whatsapp::order_link(common::WHATSAPP_NUMBER, &message);
    assert!(link.starts_with("https://wa.me/5511999999999?text=%F0%9F%9B%92"));
}

fn order_fixture(user_id: Uuid, total: i64) -> Order {
    let now = Utc::now();
    let line = CartLine {
        id: Uuid::new_v4(),
        owner: CartOwner::User(user_id),
        product_id: Uuid::new_v4(),
        product: None,
        quantity: 1,
        created_at: now,
        updated_at: now,
    };
    Order {
        id: Uuid::new_v4(),
        user_id,
        items: vec![line],
        total,
        whatsapp_message: String::new(),
        created_at: now,
        updated_at: now,
    }
}
