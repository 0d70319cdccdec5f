//! [`Command`] for recording a simulated [`ContactPurchase`].

use common::operations::{By, Insert, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{profile, property, purchase, ContactPurchase, Property},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for unlocking a landlord contact without a real payment, at the
/// configured contact price.
///
/// Only available when payments are simulated.
#[derive(Clone, Copy, Debug)]
pub struct PurchaseContact {
    /// ID of the user purchasing the contact.
    pub user_id: profile::Id,

    /// ID of the [`Property`] to unlock the landlord contact of.
    pub property_id: property::Id,
}

impl<Db, St, Gw> Command<PurchaseContact> for Service<Db, St, Gw>
where
    Db: Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<read::purchase::IsPurchased, purchase::Key>>,
            Ok = read::purchase::IsPurchased,
            Err = Traced<database::Error>,
        > + Database<
            Insert<ContactPurchase>,
            Ok = (),
            Err = Traced<database::Error>,
        >,
{
    type Ok = Property;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: PurchaseContact,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let PurchaseContact {
            user_id,
            property_id,
        } = cmd;

        if !self.config().simulate_payments {
            return Err(tracerr::new!(E::PaymentsNotSimulated));
        }

        let property = self
            .database()
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PropertyNotExists(property_id))
            .map_err(tracerr::wrap!())?;

        let key = purchase::Key {
            user_id,
            property_id,
        };
        let read::purchase::IsPurchased(purchased) = self
            .database()
            .execute(Select(By::new(key)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if purchased {
            return Ok(property);
        }

        self.database()
            .execute(Insert(ContactPurchase::completed(
                key,
                self.config().contact_price,
                None,
                None,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        log::info!(
            "`Profile(id: {user_id})` unlocked contact of \
             `Property(id: {property_id})` with a simulated payment",
        );
        Ok(property)
    }
}

/// Error of [`PurchaseContact`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Payments are not simulated, so a real one is required.
    #[display("Contacts can only be unlocked with a real payment")]
    #[from(ignore)]
    PaymentsNotSimulated,

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
        domain::{payment, profile::Role, property::Status, purchase},
        test::service,
        Command as _,
    };

    use super::{ExecutionError, PurchaseContact};

    #[tokio::test]
    async fn records_completed_purchase_once() {
        let svc = service(true);
        let tenant = profile(&svc, Role::Tenant);
        let landlord = profile(&svc, Role::Landlord);
        let listed = property(&svc, landlord.id, Status::Available);

        for _ in 0..2 {
            _ = svc
                .execute(PurchaseContact {
                    user_id: tenant.id,
                    property_id: listed.id,
                })
                .await
                .unwrap();
        }

        let state = svc.database().state();
        assert_eq!(state.purchases.len(), 1);
        let purchase = &state.purchases[&purchase::Key {
            user_id: tenant.id,
            property_id: listed.id,
        }];
        assert_eq!(purchase.payment_status, payment::Status::Completed);
        assert_eq!(purchase.amount, Money::from_shillings(200));
        assert!(purchase.payment_id.is_none());
    }

    #[tokio::test]
    async fn requires_simulated_payments() {
        let svc = service(false);
        let tenant = profile(&svc, Role::Tenant);
        let landlord = profile(&svc, Role::Landlord);
        let listed = property(&svc, landlord.id, Status::Available);

        let err = svc
            .execute(PurchaseContact {
                user_id: tenant.id,
                property_id: listed.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::PaymentsNotSimulated));
        assert!(svc.database().state().purchases.is_empty());
    }
}
