use std::sync::Arc;

use crate::backend::Backend;
use crate::dto::auth::{Credentials, SignUpRequest};
use crate::error::AppResult;
use crate::models::{Session, User};
use crate::session::SessionHandle;

/// Sign-in state against the hosted auth service. The session handle it
/// writes is the same one the backend client reads bearer tokens from.
pub struct AuthService {
    backend: Arc<dyn Backend>,
    session: SessionHandle,
}

impl AuthService {
    pub fn new(backend: Arc<dyn Backend>, session: SessionHandle) -> Self {
        Self { backend, session }
    }

    pub async fn sign_up(&self, request: SignUpRequest) -> AppResult<()> {
        request.validate()?;
        self.backend
            .sign_up(&request.email, &request.password, &request.name)
            .await?;
        tracing::info!(email = %request.email, "user registered");
        Ok(())
    }

    pub async fn sign_in(&self, credentials: Credentials) -> AppResult<User> {
        credentials.validate()?;
        let session = self
            .backend
            .sign_in(&credentials.email, &credentials.password)
            .await?;
        let user = session.user.clone();
        self.session.set(session).await;
        tracing::info!(user_id = %user.id, "signed in");
        Ok(user)
    }

    /// The session is only cleared once the backend accepts the logout, so
    /// a failed call leaves the user signed in.
    pub async fn sign_out(&self) -> AppResult<()> {
        let Some(session) = self.session.current().await else {
            return Ok(());
        };
        self.backend.sign_out(&session.access_token).await?;
        self.session.clear().await;
        tracing::info!(user_id = %session.user.id, "signed out");
        Ok(())
    }

    /// Re-validates the stored token against the backend and refreshes the
    /// profile; an invalidated token clears the session.
    pub async fn restore_session(&self) -> AppResult<Option<User>> {
        let Some(session) = self.session.current().await else {
            return Ok(None);
        };
        match self.backend.get_user(&session.access_token).await? {
            Some(user) => {
                self.session
                    .set(Session {
                        access_token: session.access_token,
                        user: user.clone(),
                    })
                    .await;
                Ok(Some(user))
            }
            None => {
                self.session.clear().await;
                Ok(None)
            }
        }
    }

    pub async fn current_user(&self) -> Option<User> {
        self.session.user().await
    }
}
