//! GraphQL [`Subscription`]s definitions.

use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt as _};
use juniper::graphql_subscription;
use service::{domain::profile, query, Query as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL subscription.
#[derive(Clone, Copy, Debug)]
pub struct Subscription;

impl Subscription {
    /// Interval of polling a [`api::Payment`] for its settlement.
    const POLL_INTERVAL: Duration = Duration::from_secs(2);
}

#[graphql_subscription(context = Context)]
impl Subscription {
    /// Subscription waiting for the `Payment` of the current user to be
    /// settled.
    ///
    /// Emits the settled `Payment` once and completes.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the current session is not authenticated;
    /// - `PAYMENT_NOT_EXISTS` - the `Payment` doesn't exist or belongs to
    ///   another user.
    pub async fn payment_settled(
        &self,
        id: api::payment::Id,
        ctx: &Context,
    ) -> Result<BoxStream<'static, Result<api::Payment, Error>>, Error> {
        let my_id: profile::Id = ctx.current_session().await?.user_id.into();
        let service = ctx.service().clone();
        let id = id.into();

        let payment = service
            .execute(query::payment::ById::by(id))
            .await
            .map_err(AsError::into_error)?
            .filter(|p| p.user_id == my_id)
            .ok_or_else(|| Error::from(PaymentError::NotExists))?;

        Ok(stream::unfold(Some(payment), move |payment| {
            let service = service.clone();
            async move {
                let mut payment = payment?;
                while !payment.status.is_settled() {
                    tokio::time::sleep(Self::POLL_INTERVAL).await;
                    payment = match service
                        .execute(query::payment::ById::by(id))
                        .await
                        .map_err(AsError::into_error)
                    {
                        Ok(Some(p)) => p,
                        Ok(None) => {
                            return Some((
                                Err(PaymentError::NotExists.into()),
                                None,
                            ));
                        }
                        Err(e) => return Some((Err(e), None)),
                    };
                }
                Some((Ok(payment.into()), None))
            }
        })
        .boxed())
    }
}

define_error! {
    enum PaymentError {
        #[code = "PAYMENT_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Payment` with the provided ID does not exist"]
        NotExists,
    }
}
