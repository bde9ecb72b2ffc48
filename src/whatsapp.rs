use chrono::Utc;

use crate::models::CartLine;

/// Renders integer cents as a pt-BR price.
pub fn format_price(cents: i64) -> String {
    format!("R$ {:.2}", cents as f64 / 100.0)
}

/// Human-readable order summary in the format the store sends over
/// WhatsApp. Lines without a resolved product are skipped.
pub fn order_message(items: &[CartLine], total: i64, customer_name: &str) -> String {
    let mut message = format!("🛒 *Novo Pedido - {customer_name}*\n\n");
    message.push_str("📋 *Itens do Pedido:*\n");
    for (index, item) in items.iter().enumerate() {
        let Some(product) = item.product.as_ref() else {
            continue;
        };
        message.push_str(&format!("{}. *{}*\n", index + 1, product.name));
        message.push_str(&format!("   Quantidade: {}\n", item.quantity));
        message.push_str(&format!(
            "   Preço unidade.: {}\n",
            format_price(product.price)
        ));
        message.push_str(&format!("   Subtotal: {}\n\n", format_price(item.subtotal())));
    }
    message.push_str(&format!("💰 *Total: {}*\n\n", format_price(total)));
    message.push_str(&format!(
        "📅 Data: {}\n\n",
        Utc::now().format("%d/%m/%Y %H:%M")
    ));
    message.push_str("✅ Confirma o pedido?");
    message
}

/// Deep link that opens a WhatsApp conversation pre-filled with `message`.
/// Navigation is fire-and-forget; nothing comes back from it.
pub fn order_link(number: &str, message: &str) -> String {
    format!("https://wa.me/{number}?text={}", urlencoding::encode(message))
}
