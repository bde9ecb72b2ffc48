use serde::Deserialize;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn validate(&self) -> AppResult<()> {
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl SignUpRequest {
    pub fn validate(&self) -> AppResult<()> {
        let name = self.name.trim();
        if name.len() < 2 || name.len() > 100 {
            return Err(AppError::Validation(
                "name must be between 2 and 100 characters".to_string(),
            ));
        }
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

fn validate_email(email: &str) -> AppResult<()> {
    let well_formed = email.len() >= 3
        && email.contains('@')
        && !email.starts_with('@')
        && !email.ends_with('@');
    if !well_formed {
        return Err(AppError::Validation("invalid email".to_string()));
    }
    Ok(())
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.len() < 6 {
        return Err(AppError::Validation(
            "password must have at least 6 characters".to_string(),
        ));
    }
    if password.len() > 100 {
        return Err(AppError::Validation("password too long".to_string()));
    }
    Ok(())
}
