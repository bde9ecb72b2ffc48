use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::LocalCartLine;

/// Guest cart persisted as a JSON array on disk. An absent file or
/// malformed content reads as an empty cart; the next write replaces it
/// with valid data.
pub struct GuestCartStore {
    path: PathBuf,
}

impl GuestCartStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Vec<LocalCartLine> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_slice(&raw) {
            Ok(lines) => lines,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    path = %self.path.display(),
                    "guest cart file corrupt, resetting"
                );
                Vec::new()
            }
        }
    }

    async fn save(&self, lines: &[LocalCartLine]) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_vec(lines).map_err(anyhow::Error::from)?;
        fs::write(&self.path, raw).await?;
        Ok(())
    }

    /// Adds to an existing line for the product by summing quantities, or
    /// appends a new line.
    pub async fn add(&self, product_id: Uuid, quantity: i32) -> AppResult<()> {
        let mut lines = self.load().await;
        let now = Utc::now();
        match lines.iter_mut().find(|line| line.product_id == product_id) {
            Some(line) => {
                line.quantity += quantity;
                line.updated_at = now;
            }
            None => lines.push(LocalCartLine {
                product_id,
                quantity,
                created_at: now,
                updated_at: now,
            }),
        }
        self.save(&lines).await
    }

    /// Sets an absolute quantity; below one removes the line. Unknown
    /// products are a no-op.
    pub async fn set_quantity(&self, product_id: Uuid, quantity: i32) -> AppResult<()> {
        let mut lines = self.load().await;
        let Some(index) = lines.iter().position(|line| line.product_id == product_id) else {
            return Ok(());
        };
        if quantity < 1 {
            lines.remove(index);
        } else {
            lines[index].quantity = quantity;
            lines[index].updated_at = Utc::now();
        }
        self.save(&lines).await
    }

    pub async fn remove(&self, product_id: Uuid) -> AppResult<()> {
        let mut lines = self.load().await;
        let before = lines.len();
        lines.retain(|line| line.product_id != product_id);
        if lines.len() == before {
            return Ok(());
        }
        self.save(&lines).await
    }

    pub async fn clear(&self) -> AppResult<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
