use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use storefront_client::{
    config::AppConfig,
    dto::{
        auth::{Credentials, SignUpRequest},
        orders::OrderFilters,
    },
    error::{AppError, AppResult},
    state::AppState,
    whatsapp::format_price,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,storefront_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let state = AppState::new(&config);

    println!("storefront shell — type `help` for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();
        match run_command(&state, command, &args).await {
            Ok(true) => break,
            Ok(false) => {}
            Err(err) => {
                tracing::debug!(error = ?err, command, "command failed");
                println!("{}", err.user_message());
            }
        }
    }
    Ok(())
}

async fn run_command(state: &AppState, command: &str, args: &[&str]) -> AppResult<bool> {
    match command {
        "help" => print_help(),
        "products" => {
            for product in state.products.list().await? {
                println!(
                    "{}  {}  {}  [{}]",
                    product.id,
                    product.name,
                    format_price(product.price),
                    product.category
                );
            }
        }
        "search" => {
            let query = args.join(" ");
            for product in state.products.search(&query).await? {
                println!("{}  {}  {}", product.id, product.name, format_price(product.price));
            }
        }
        "categories" => {
            for category in state.products.categories().await? {
                println!("{category}");
            }
        }
        "add" => {
            let product_id = parse_id(args.first(), "expected a product id")?;
            let quantity = match args.get(1) {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| AppError::Validation("invalid quantity".to_string()))?,
                None => 1,
            };
            state.cart.add_to_cart(product_id, quantity).await?;
            print_cart(state).await?;
        }
        "cart" => print_cart(state).await?,
        "update" => {
            let line_id = parse_id(args.first(), "expected a cart line id")?;
            let quantity = args
                .get(1)
                .and_then(|raw| raw.parse().ok())
                .ok_or_else(|| AppError::Validation("expected a quantity".to_string()))?;
            state.cart.update_quantity(line_id, quantity).await?;
            print_cart(state).await?;
        }
        "remove" => {
            let line_id = parse_id(args.first(), "expected a cart line id")?;
            state.cart.remove_from_cart(line_id).await?;
            print_cart(state).await?;
        }
        "clear" => {
            state.cart.clear_cart().await?;
            println!("cart cleared");
        }
        "signup" => {
            let [email, password, name @ ..] = args else {
                return Err(AppError::Validation(
                    "usage: signup <email> <password> <name>".to_string(),
                ));
            };
            state
                .auth
                .sign_up(SignUpRequest {
                    name: name.join(" "),
                    email: email.to_string(),
                    password: password.to_string(),
                })
                .await?;
            println!("account created, you can sign in now");
        }
        "login" => {
            let [email, password] = args else {
                return Err(AppError::Validation(
                    "usage: login <email> <password>".to_string(),
                ));
            };
            let user = state
                .auth
                .sign_in(Credentials {
                    email: email.to_string(),
                    password: password.to_string(),
                })
                .await?;
            println!("signed in as {}", user.email);
            if state.cart.merge_guest_cart().await? {
                println!("guest cart merged into your account");
            }
        }
        "logout" => {
            state.auth.sign_out().await?;
            println!("signed out");
        }
        "whoami" => match state.auth.current_user().await {
            Some(user) => println!("{} <{}>", user.name, user.email),
            None => println!("browsing as guest"),
        },
        "orders" => {
            for order in state.orders.list_orders(OrderFilters::default()).await? {
                println!(
                    "{}  {}  {} items  {}",
                    order.id,
                    order.created_at.format("%d/%m/%Y %H:%M"),
                    order.items.len(),
                    format_price(order.total)
                );
            }
        }
        "stats" => {
            let stats = state.orders.stats().await?;
            println!(
                "{} orders, {} spent",
                stats.total_orders,
                format_price(stats.total_spent)
            );
        }
        "checkout" => {
            let handoff = state.orders.checkout(&state.cart).await?;
            println!("order {} recorded", handoff.order.id);
            println!("open to confirm: {}", handoff.whatsapp_url);
        }
        "quit" | "exit" => return Ok(true),
        _ => println!("unknown command, try `help`"),
    }
    Ok(false)
}

async fn print_cart(state: &AppState) -> AppResult<()> {
    match state.cart.cart().await? {
        Some(cart) if !cart.is_empty() => {
            for line in &cart.items {
                let name = line
                    .product
                    .as_ref()
                    .map(|product| product.name.as_str())
                    .unwrap_or("(unavailable)");
                println!(
                    "{}  {} x{}  {}",
                    line.id,
                    name,
                    line.quantity,
                    format_price(line.subtotal())
                );
            }
            println!("total: {}", format_price(cart.total));
        }
        _ => println!("cart is empty"),
    }
    Ok(())
}

fn parse_id(arg: Option<&&str>, message: &str) -> AppResult<Uuid> {
    arg.and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| AppError::Validation(message.to_string()))
}

fn print_help() {
    println!("products                      list the catalog");
    println!("search <term>                 search products by name");
    println!("categories                    list categories");
    println!("add <product-id> [qty]        add a product to the cart");
    println!("cart                          show the cart");
    println!("update <line-id> <qty>        change a line's quantity");
    println!("remove <line-id>              remove a line");
    println!("clear                         empty the cart");
    println!("signup <email> <pass> <name>  create an account");
    println!("login <email> <pass>          sign in (merges the guest cart)");
    println!("logout                        sign out");
    println!("whoami                        show the signed-in user");
    println!("orders                        list your orders");
    println!("stats                         order count and total spent");
    println!("checkout                      record the order and print the WhatsApp link");
    println!("quit                          leave");
}
