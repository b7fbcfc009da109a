use crate::{api::ApiError, domain::prelude::*};
use tracing::info;

/// Authentication state of the console.
///
/// The session is passed explicitly to whatever needs a token. Losing
/// authentication is reported as a [`SessionTransition`] for the caller to
/// act on (the console goes back to the login prompt).
///
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Session {
    #[default]
    Unauthenticated,
    Authenticated(User),
}

/// Side effect the caller must perform after a session change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTransition {
    /// Stay where we are.
    None,
    /// Navigate to the login screen.
    ToLogin,
}

impl Session {
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Unauthenticated => None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.user().map(|u| u.token.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn login(&mut self, user: User) {
        info!(username = %user.username, "signed in");
        *self = Self::Authenticated(user);
    }

    pub fn logout(&mut self) -> SessionTransition {
        if let Self::Authenticated(user) = std::mem::take(self) {
            info!(username = %user.username, "signed out");
        }
        SessionTransition::ToLogin
    }

    /// Applies the logout-on-401 policy to the outcome of an API call.
    ///
    /// Returns the transition to perform alongside the untouched result.
    ///
    pub fn observe<T>(
        &mut self,
        result: Result<T, ApiError>,
    ) -> (Result<T, ApiError>, SessionTransition) {
        match result {
            Err(ApiError::Unauthenticated) => {
                let transition = self.logout();
                (Err(ApiError::Unauthenticated), transition)
            }
            other => (other, SessionTransition::None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyst() -> User {
        User {
            id: "usr_001".to_string(),
            username: "analyst@anomalyse.bank".to_string(),
            role: Role::Analyst,
            token: "jwt".to_string(),
        }
    }

    #[test]
    fn login_then_logout() {
        let mut session = Session::default();
        assert!(session.token().is_none());

        session.login(analyst());
        assert!(session.is_authenticated());
        assert_eq!(session.token(), Some("jwt"));

        assert_eq!(session.logout(), SessionTransition::ToLogin);
        assert_eq!(session, Session::Unauthenticated);
    }

    #[test]
    fn unauthorized_result_logs_out() {
        let mut session = Session::Authenticated(analyst());
        let (result, transition) = session.observe::<()>(Err(ApiError::Unauthenticated));
        assert!(matches!(result, Err(ApiError::Unauthenticated)));
        assert_eq!(transition, SessionTransition::ToLogin);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn other_errors_keep_session() {
        let mut session = Session::Authenticated(analyst());
        let (result, transition) =
            session.observe::<()>(Err(ApiError::NotFound("Transaction not found".into())));
        assert!(result.is_err());
        assert_eq!(transition, SessionTransition::None);
        assert!(session.is_authenticated());

        let (result, transition) = session.observe(Ok(3));
        assert_eq!(result.ok(), Some(3));
        assert_eq!(transition, SessionTransition::None);
    }
}
