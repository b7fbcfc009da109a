use tracing::info;

use super::{
    models::{LoginRequest, TokenResponse},
    ApiClient, ApiError,
};
use crate::domain::prelude::*;

impl ApiClient {
    /// POST /auth/login
    ///
    /// Exchanges credentials for an access token. The returned [`User`] is
    /// what the caller stores in its [`Session`](crate::core::session::Session);
    /// this client is not modified.
    ///
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let request = self
            .http()
            .post(self.url("/auth/login"))
            .json(&LoginRequest { email, password });

        let response = match self.send(request).await {
            Err(ApiError::Unauthenticated) => return Err(ApiError::InvalidCredentials),
            other => other?,
        };
        let token: TokenResponse = Self::decode(response).await?;
        info!(email, token_type = %token.token_type, "login succeeded");

        Ok(User {
            id: email.to_string(),
            username: email.to_string(),
            role: Role::Analyst,
            token: token.access_token,
        })
    }
}
