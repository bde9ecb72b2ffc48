use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const MAX_LINE_QUANTITY: i32 = 99;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

impl AddToCartRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.quantity <= 0 {
            return Err(AppError::Validation(
                "quantity must be greater than 0".to_string(),
            ));
        }
        if self.quantity > MAX_LINE_QUANTITY {
            return Err(AppError::Validation(format!(
                "quantity cannot exceed {MAX_LINE_QUANTITY}"
            )));
        }
        Ok(())
    }
}
