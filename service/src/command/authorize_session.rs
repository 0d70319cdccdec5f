//! [`Command`] for authorizing a [`Session`].

use derive_more::{Display, Error, From};
use jsonwebtoken::{Algorithm, Validation};
use tracerr::Traced;

use crate::{
    domain::profile::{session, Session},
    Service,
};

use super::Command;

/// [`Command`] for authorizing a [`Session`] issued by the identity provider.
///
/// Users are not required to have a [`Profile`] yet.
///
/// [`Profile`]: crate::domain::Profile
#[derive(Clone, Debug, From)]
pub struct AuthorizeSession {
    /// [`Session`] token to authorize.
    pub token: session::Token,
}

impl<Db, St, Gw> Command<AuthorizeSession> for Service<Db, St, Gw> {
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeSession { token } = cmd;

        // Audience is specific to the identity provider deployment.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;

        Ok(jsonwebtoken::decode::<Session>(
            token.as_ref(),
            &self.config().jwt_decoding_key,
            &validation,
        )
        .map_err(tracerr::from_and_wrap!(=> E))?
        .claims)
    }
}

/// Error of [`AuthorizeSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`jsonwebtoken`] decoding error.
    #[display("Failed to decode a JSON Web Token: {_0}")]
    JsonWebTokenDecodeError(jsonwebtoken::errors::Error),
}

#[cfg(test)]
mod spec {
    use common::DateTime;
    use jsonwebtoken::{EncodingKey, Header};
    use serde_json::json;

    use crate::{
        domain::profile::{self, session},
        test::{service, JWT_SECRET},
        Command as _,
    };

    use super::AuthorizeSession;

    fn token(sub: profile::Id, exp: i64, secret: &[u8]) -> session::Token {
        let jwt = jsonwebtoken::encode(
            &Header::default(),
            &json!({"sub": sub, "exp": exp, "role": "authenticated"}),
            &EncodingKey::from_secret(secret),
        )
        .unwrap();
        jwt.parse().unwrap()
    }

    #[tokio::test]
    async fn decodes_valid_token() {
        let svc = service(false);
        let user = profile::Id::new();
        let exp = DateTime::now().unix_timestamp() + 3600;

        let session = svc
            .execute(AuthorizeSession::from(token(user, exp, JWT_SECRET)))
            .await
            .unwrap();

        assert_eq!(session.user_id, user);
        assert_eq!(session.expires_at.unix_timestamp(), exp);
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let svc = service(false);
        let exp = DateTime::now().unix_timestamp() - 3600;

        let res = svc
            .execute(AuthorizeSession::from(token(
                profile::Id::new(),
                exp,
                JWT_SECRET,
            )))
            .await;

        assert!(res.is_err());
    }

    #[tokio::test]
    async fn rejects_foreign_signature() {
        let svc = service(false);
        let exp = DateTime::now().unix_timestamp() + 3600;

        let res = svc
            .execute(AuthorizeSession::from(token(
                profile::Id::new(),
                exp,
                b"another-secret",
            )))
            .await;

        assert!(res.is_err());
    }
}
