use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend_url: String,
    pub anon_key: String,
    pub whatsapp_number: String,
    pub guest_cart_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let backend_url = env::var("SUPABASE_URL")?;
        let anon_key = env::var("SUPABASE_ANON_KEY")?;
        let whatsapp_number =
            env::var("WHATSAPP_NUMBER").unwrap_or_else(|_| "5511999999999".to_string());
        let guest_cart_path = env::var("GUEST_CART_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_guest_cart_path());
        Ok(Self {
            backend_url,
            anon_key,
            whatsapp_number,
            guest_cart_path,
        })
    }
}

fn default_guest_cart_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("storefront")
        .join("guest_cart.json")
}
