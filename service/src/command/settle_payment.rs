//! [`Command`] for settling a [`Payment`] with a gateway [`Callback`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use secrecy::ExposeSecret as _;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        payment::{self, Callback, Settlement},
        purchase, ContactPurchase, Payment,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for settling a [`Payment`] with the [`Callback`] delivered by
/// the gateway to its signed callback URL.
///
/// A completed [`Payment`] unlocks the landlord contact for its payer.
#[derive(Clone, Debug)]
pub struct SettlePayment {
    /// ID of the [`Payment`] the [`Callback`] is addressed to.
    pub payment_id: payment::Id,

    /// Hex-encoded [`payment::Signature`] of the `payment_id`.
    pub signature: String,

    /// [`Callback`] to settle the [`Payment`] with.
    pub callback: Callback,
}

/// Result of a [`SettlePayment`] [`Command`] execution.
#[derive(Clone, Debug)]
pub struct Settled {
    /// [`Payment`] after settling.
    pub payment: Payment,

    /// Outcome of settling the [`Payment`].
    pub settlement: Settlement,
}

impl<Db, St, Gw> Command<SettlePayment> for Service<Db, St, Gw>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Payment, payment::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Payment>, payment::Id>>,
            Ok = Option<Payment>,
            Err = Traced<database::Error>,
        > + Database<Update<Payment>, Ok = (), Err = Traced<database::Error>>
        + Database<
            Insert<ContactPurchase>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Settled;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: SettlePayment) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SettlePayment {
            payment_id,
            signature,
            callback,
        } = cmd;

        let secret = self
            .config()
            .payment_callback_secret
            .as_ref()
            .ok_or(E::Unverifiable)
            .map_err(tracerr::wrap!())?
            .expose_secret();
        if !payment::Signature::verify(secret.as_bytes(), payment_id, &signature)
        {
            return Err(tracerr::new!(E::InvalidSignature(payment_id)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent settling of the same `Payment`.
        tx.execute(Lock(By::new(payment_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut payment = tx
            .execute(Select(By::<Option<Payment>, _>::new(payment_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PaymentNotExists(payment_id))
            .map_err(tracerr::wrap!())?;

        let settlement = payment
            .settle(&callback)
            .map_err(tracerr::from_and_wrap!(=> E))?;
        match settlement {
            Settlement::AlreadySettled(status) => {
                log::debug!(
                    "ignoring callback of `Payment(id: {payment_id})` \
                     already `{status}`",
                );
                return Ok(Settled {
                    payment,
                    settlement,
                });
            }
            Settlement::Completed => {
                let phone = callback
                    .phone
                    .as_deref()
                    .and_then(payment::Msisdn::normalize)
                    .unwrap_or_else(|| payment.phone.clone());
                tx.execute(Insert(ContactPurchase::completed(
                    purchase::Key {
                        user_id: payment.user_id,
                        property_id: payment.property_id,
                    },
                    payment.amount,
                    Some(phone),
                    Some(payment.id),
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            }
            Settlement::Failed => {
                log::warn!(
                    "`Payment(id: {payment_id})` failed with result code {}: {}",
                    callback.result_code,
                    callback.result_description.as_deref().unwrap_or("-"),
                );
            }
        }

        tx.execute(Update(payment.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(Settled {
            payment,
            settlement,
        })
    }
}

/// Error of [`SettlePayment`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Callback`] refers to another gateway checkout.
    #[display("{_0}")]
    Correlation(payment::CorrelationError),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`payment::Signature`] doesn't match the [`Payment`] ID.
    #[display("Invalid signature of `Payment(id: {_0})` callback")]
    #[from(ignore)]
    InvalidSignature(#[error(not(source))] payment::Id),

    /// [`Payment`] with the provided ID does not exist.
    #[display("`Payment(id: {_0})` does not exist")]
    #[from(ignore)]
    PaymentNotExists(#[error(not(source))] payment::Id),

    /// No secret is configured to verify [`payment::Signature`]s with.
    #[display("`payment_callback_secret` is not configured")]
    #[from(ignore)]
    Unverifiable,
}

#[cfg(test)]
mod spec {
    use common::Money;
    use serde_json::json;

    use crate::{
        command::test::profile,
        domain::{
            payment::{self, Callback, Settlement, Signature},
            profile::Role,
            property, purchase, Payment,
        },
        test::{service, TestService},
        Command as _,
    };

    use super::{ExecutionError, SettlePayment};

    fn awaiting(svc: &TestService) -> Payment {
        let tenant = profile(svc, Role::Tenant);
        let payment = Payment::new(
            payment::Id::new(),
            tenant.id,
            property::Id::new(),
            "0712345678".parse().unwrap(),
            Money::from_shillings(200),
            payment::Accepted {
                merchant_request_id: Some("29115-34620561-1".to_owned().into()),
                checkout_request_id: Some("ws_CO_1".to_owned().into()),
            },
        );
        _ = svc
            .database()
            .state()
            .payments
            .insert(payment.id, payment.clone());
        payment
    }

    fn callback(checkout: &str, code: i64) -> Callback {
        Callback::parse(&json!({
            "Body": {"stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": checkout,
                "ResultCode": code,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": {"Item": [
                    {"Name": "Amount", "Value": 200},
                    {"Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV"},
                    {"Name": "PhoneNumber", "Value": 254_722_000_000_u64},
                ]},
            }},
        }))
        .unwrap()
    }

    fn settle(payment: &Payment, callback: Callback) -> SettlePayment {
        SettlePayment {
            payment_id: payment.id,
            signature: Signature::sign(b"callback-secret", payment.id)
                .to_string(),
            callback,
        }
    }

    #[tokio::test]
    async fn success_inserts_completed_purchase() {
        let svc = service(false);
        let payment = awaiting(&svc);

        let settled = svc
            .execute(settle(&payment, callback("ws_CO_1", 0)))
            .await
            .unwrap();

        assert_eq!(settled.settlement, Settlement::Completed);
        let state = svc.database().state();
        assert_eq!(
            state.payments[&payment.id].status,
            payment::Status::Completed,
        );
        assert_eq!(
            state.payments[&payment.id]
                .receipt
                .as_ref()
                .map(ToString::to_string)
                .as_deref(),
            Some("NLJ7RT61SV"),
        );
        let purchase = &state.purchases[&purchase::Key {
            user_id: payment.user_id,
            property_id: payment.property_id,
        }];
        assert_eq!(purchase.payment_status, payment::Status::Completed);
        assert_eq!(purchase.payment_id, Some(payment.id));
        assert_eq!(
            purchase.phone.as_ref().map(ToString::to_string).as_deref(),
            Some("254722000000"),
        );
    }

    #[tokio::test]
    async fn failure_inserts_nothing() {
        let svc = service(false);
        let payment = awaiting(&svc);

        let settled = svc
            .execute(settle(&payment, callback("ws_CO_1", 1032)))
            .await
            .unwrap();

        assert_eq!(settled.settlement, Settlement::Failed);
        let state = svc.database().state();
        assert_eq!(state.payments[&payment.id].status, payment::Status::Failed);
        assert_eq!(state.payments[&payment.id].result_code, Some(1032));
        assert!(state.purchases.is_empty());
    }

    #[tokio::test]
    async fn ignores_repeated_callbacks() {
        let svc = service(false);
        let payment = awaiting(&svc);

        _ = svc
            .execute(settle(&payment, callback("ws_CO_1", 1032)))
            .await
            .unwrap();
        let settled = svc
            .execute(settle(&payment, callback("ws_CO_1", 0)))
            .await
            .unwrap();

        assert_eq!(
            settled.settlement,
            Settlement::AlreadySettled(payment::Status::Failed),
        );
        assert!(svc.database().state().purchases.is_empty());
    }

    #[tokio::test]
    async fn completes_expired_payment_on_late_success() {
        let svc = service(false);
        let mut payment = awaiting(&svc);
        assert!(payment.expire());
        _ = svc
            .database()
            .state()
            .payments
            .insert(payment.id, payment.clone());

        let settled = svc
            .execute(settle(&payment, callback("ws_CO_1", 0)))
            .await
            .unwrap();

        assert_eq!(settled.settlement, Settlement::Completed);
        let state = svc.database().state();
        assert_eq!(
            state.payments[&payment.id].status,
            payment::Status::Completed,
        );
        let purchase = &state.purchases[&purchase::Key {
            user_id: payment.user_id,
            property_id: payment.property_id,
        }];
        assert_eq!(purchase.payment_status, payment::Status::Completed);
        assert_eq!(purchase.payment_id, Some(payment.id));
    }

    #[tokio::test]
    async fn ignores_late_failure_of_expired_payment() {
        let svc = service(false);
        let mut payment = awaiting(&svc);
        assert!(payment.expire());
        _ = svc
            .database()
            .state()
            .payments
            .insert(payment.id, payment.clone());

        let settled = svc
            .execute(settle(&payment, callback("ws_CO_1", 1037)))
            .await
            .unwrap();

        assert_eq!(
            settled.settlement,
            Settlement::AlreadySettled(payment::Status::Expired),
        );
        let state = svc.database().state();
        assert_eq!(state.payments[&payment.id].status, payment::Status::Expired);
        assert!(state.purchases.is_empty());
    }

    #[tokio::test]
    async fn rejects_forged_signature() {
        let svc = service(false);
        let payment = awaiting(&svc);

        let mut cmd = settle(&payment, callback("ws_CO_1", 0));
        cmd.signature = Signature::sign(b"guessed-secret", payment.id).to_string();
        let err = svc.execute(cmd).await.unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::InvalidSignature(_)));
        let state = svc.database().state();
        assert_eq!(
            state.payments[&payment.id].status,
            payment::Status::AwaitingCallback,
        );
        assert!(state.purchases.is_empty());
    }

    #[tokio::test]
    async fn rejects_everything_without_secret() {
        let mut svc = service(false);
        svc.config.payment_callback_secret = None;
        let payment = awaiting(&svc);

        let err = svc
            .execute(settle(&payment, callback("ws_CO_1", 0)))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::Unverifiable));
        let state = svc.database().state();
        assert_eq!(
            state.payments[&payment.id].status,
            payment::Status::AwaitingCallback,
        );
        assert!(state.purchases.is_empty());
    }

    #[tokio::test]
    async fn rejects_unknown_payment() {
        let svc = service(false);
        let payment = awaiting(&svc);
        _ = svc.database().state().payments.remove(&payment.id);

        let err = svc
            .execute(settle(&payment, callback("ws_CO_1", 0)))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::PaymentNotExists(_)));
        let state = svc.database().state();
        assert!(state.payments.is_empty());
        assert!(state.purchases.is_empty());
    }

    #[tokio::test]
    async fn rejects_foreign_checkout() {
        let svc = service(false);
        let payment = awaiting(&svc);

        let err = svc
            .execute(settle(&payment, callback("ws_CO_other", 0)))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::Correlation(_)));
        assert!(svc.database().state().purchases.is_empty());
    }
}
