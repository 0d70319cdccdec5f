//! [`Command`] for initiating a [`Payment`] unlocking a landlord contact.

use common::{
    operations::{By, Insert, Select},
    Money,
};
use derive_more::{Display, Error, From};
use secrecy::ExposeSecret as _;
use serde_json::Value as Json;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{payment, profile, property, Payment, Property},
    infra::{database, gateway, Database, Gateway},
    Service,
};

use super::Command;

/// [`Command`] for prompting the payer's phone to pay for unlocking the
/// landlord contact of a [`Property`].
///
/// The resulting [`Payment`] awaits the gateway callback.
#[derive(Clone, Debug)]
pub struct InitiatePayment {
    /// ID of the paying user.
    pub user_id: profile::Id,

    /// ID of the [`Property`] to unlock the landlord contact of.
    pub property_id: property::Id,

    /// [`payment::Msisdn`] to prompt.
    pub phone: payment::Msisdn,

    /// Amount to pay.
    pub amount: Money,
}

/// Result of an [`InitiatePayment`] [`Command`] execution.
#[derive(Clone, Debug)]
pub struct Initiated {
    /// [`Payment`] awaiting the gateway callback.
    pub payment: Payment,

    /// Raw response of the gateway accepting the prompt.
    pub payload: Json,
}

impl<Db, St, Gw> Command<InitiatePayment> for Service<Db, St, Gw>
where
    Db: Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        > + Database<Insert<Payment>, Ok = (), Err = Traced<database::Error>>,
    Gw: Gateway<
        gateway::Prompt,
        Ok = gateway::Prompted,
        Err = Traced<gateway::Error>,
    >,
{
    type Ok = Initiated;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: InitiatePayment,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let InitiatePayment {
            user_id,
            property_id,
            phone,
            amount,
        } = cmd;

        let shillings = amount
            .whole_shillings()
            .filter(|a| *a > 0)
            .ok_or(E::InvalidAmount(amount))
            .map_err(tracerr::wrap!())?;
        if amount < self.config().contact_price {
            return Err(tracerr::new!(E::InsufficientAmount(amount)));
        }

        let property = self
            .database()
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PropertyNotExists(property_id))
            .map_err(tracerr::wrap!())?;
        if property.status != property::Status::Available {
            return Err(tracerr::new!(E::PropertyNotAvailable(property.status)));
        }

        let (Some(mut callback_url), Some(secret)) = (
            self.config().payment_callback_url.clone(),
            self.config().payment_callback_secret.as_ref(),
        ) else {
            let missing = if self.config().payment_callback_url.is_none() {
                "callback_url"
            } else {
                "callback_secret"
            };
            return Err(tracerr::new!(E::Gateway(
                gateway::Error::Misconfigured(missing)
            )));
        };

        let id = payment::Id::new();
        let signature =
            payment::Signature::sign(secret.expose_secret().as_bytes(), id);
        _ = callback_url
            .query_pairs_mut()
            .append_pair("payment", &id.to_string())
            .append_pair("signature", signature.as_ref());

        let gateway::Prompted { accepted, payload } = self
            .gateway()
            .execute(gateway::Prompt {
                phone: phone.clone(),
                amount: shillings,
                callback_url: callback_url.into(),
            })
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let payment = Payment::new(id, user_id, property_id, phone, amount, accepted);
        self.database()
            .execute(Insert(payment.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        log::info!(
            "`Payment(id: {id})` of `Profile(id: {user_id})` for \
             `Property(id: {property_id})` awaits its callback",
        );
        Ok(Initiated { payment, payload })
    }
}

/// Error of [`InitiatePayment`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Payment [`Gateway`] error.
    #[display("Payment gateway failed: {_0}")]
    Gateway(gateway::Error),

    /// Amount is below the contact price.
    #[display("Amount of {_0} KES is below the contact price")]
    #[from(ignore)]
    InsufficientAmount(#[error(not(source))] Money),

    /// Amount is not a positive whole number of shillings.
    #[display("Amount of {_0} KES is not a positive whole number")]
    #[from(ignore)]
    InvalidAmount(#[error(not(source))] Money),

    /// [`Property`] is not available to the public.
    #[display("`Property` is `{_0}` and its contact cannot be purchased")]
    #[from(ignore)]
    PropertyNotAvailable(#[error(not(source))] property::Status),

    /// [`Property`] with the provided ID does not exist.
    #[display("`Property(id: {_0})` does not exist")]
    #[from(ignore)]
    PropertyNotExists(#[error(not(source))] property::Id),
}

#[cfg(test)]
mod spec {
    use common::Money;

    use crate::{
        command::test::{profile, property},
        domain::{
            payment,
            profile::Role,
            property::{self as listing, Status},
        },
        infra::gateway,
        test::service,
        Command as _,
    };

    use super::{ExecutionError, InitiatePayment};

    fn initiate(
        user_id: crate::domain::profile::Id,
        property_id: listing::Id,
        amount: u64,
    ) -> InitiatePayment {
        InitiatePayment {
            user_id,
            property_id,
            phone: "0712 345 678".parse().unwrap(),
            amount: Money::from_shillings(amount),
        }
    }

    #[tokio::test]
    async fn stores_awaiting_payment_with_signed_callback() {
        let svc = service(false);
        let tenant = profile(&svc, Role::Tenant);
        let landlord = profile(&svc, Role::Landlord);
        let listed = property(&svc, landlord.id, Status::Available);

        let initiated = svc
            .execute(initiate(tenant.id, listed.id, 200))
            .await
            .unwrap();

        let stored =
            svc.database().state().payments[&initiated.payment.id].clone();
        assert_eq!(stored.status, payment::Status::AwaitingCallback);
        assert_eq!(stored.phone.to_string(), "254712345678");
        assert_eq!(
            stored.checkout_request_id.map(|id| id.to_string()).as_deref(),
            Some("ws_CO_1"),
        );

        let prompts = svc.gateway().prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].amount, 200);
        let signature = payment::Signature::sign(
            b"callback-secret",
            initiated.payment.id,
        );
        assert_eq!(
            prompts[0].callback_url,
            format!(
                "https://example.com/api/mpesa/callback?payment={}&\
                 signature={signature}",
                initiated.payment.id,
            ),
        );
    }

    #[tokio::test]
    async fn validates_amount() {
        let svc = service(false);
        let tenant = profile(&svc, Role::Tenant);
        let landlord = profile(&svc, Role::Landlord);
        let listed = property(&svc, landlord.id, Status::Available);

        let err = svc
            .execute(initiate(tenant.id, listed.id, 0))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::InvalidAmount(_)));

        let err = svc
            .execute(initiate(tenant.id, listed.id, 50))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::InsufficientAmount(_)));

        assert!(svc.gateway().prompts.lock().unwrap().is_empty());
        assert!(svc.database().state().payments.is_empty());
    }

    #[tokio::test]
    async fn requires_available_property() {
        let svc = service(false);
        let tenant = profile(&svc, Role::Tenant);
        let landlord = profile(&svc, Role::Landlord);
        let pending = property(&svc, landlord.id, Status::PendingApproval);

        let err = svc
            .execute(initiate(tenant.id, pending.id, 200))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::PropertyNotAvailable(Status::PendingApproval),
        ));

        let err = svc
            .execute(initiate(tenant.id, listing::Id::new(), 200))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::PropertyNotExists(_)));
    }

    #[tokio::test]
    async fn stores_nothing_when_gateway_fails() {
        let mut svc = service(false);
        svc.gateway = gateway::memory::Memory {
            misconfigured: true,
            ..gateway::memory::Memory::default()
        };
        let tenant = profile(&svc, Role::Tenant);
        let landlord = profile(&svc, Role::Landlord);
        let listed = property(&svc, landlord.id, Status::Available);

        let err = svc
            .execute(initiate(tenant.id, listed.id, 200))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Gateway(gateway::Error::Misconfigured(_)),
        ));
        assert!(svc.database().state().payments.is_empty());
    }

    #[tokio::test]
    async fn requires_callback_configuration() {
        for (url, secret, missing) in [
            (false, true, "callback_url"),
            (true, false, "callback_secret"),
        ] {
            let mut svc = service(false);
            if !url {
                svc.config.payment_callback_url = None;
            }
            if !secret {
                svc.config.payment_callback_secret = None;
            }
            let tenant = profile(&svc, Role::Tenant);
            let landlord = profile(&svc, Role::Landlord);
            let listed = property(&svc, landlord.id, Status::Available);

            let err = svc
                .execute(initiate(tenant.id, listed.id, 200))
                .await
                .unwrap_err();

            assert!(
                matches!(
                    err.as_ref(),
                    ExecutionError::Gateway(gateway::Error::Misconfigured(m))
                        if *m == missing,
                ),
                "missing: {missing}",
            );
            assert!(svc.gateway().prompts.lock().unwrap().is_empty());
            assert!(svc.database().state().payments.is_empty());
        }
    }
}
