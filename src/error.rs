use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Backend request failed")]
    Http(#[from] reqwest::Error),

    #[error("Storage error")]
    Storage(#[from] std::io::Error),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Text shown to the user as a transient notification. Transport and
    /// internal details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            AppError::NotFound => "Resource not found".to_string(),
            AppError::Validation(message) => message.clone(),
            AppError::Unauthorized => "You need to sign in first".to_string(),
            AppError::Forbidden => "You do not have access to this resource".to_string(),
            AppError::Http(_) => "Could not reach the store backend".to_string(),
            AppError::Storage(_) => "Could not access the local cart".to_string(),
            AppError::Internal(_) => "Something went wrong".to_string(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
