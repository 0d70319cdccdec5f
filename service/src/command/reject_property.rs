//! [`Command`] for rejecting a [`Property`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{profile, property, Profile, Property},
    infra::{database, Database},
    Service,
};

use super::{role_of, Command};

/// [`Command`] for an admin rejecting a [`Property`] with a reason shown to
/// its landlord.
#[derive(Clone, Debug)]
pub struct RejectProperty {
    /// ID of the admin rejecting the [`Property`].
    pub initiator_id: profile::Id,

    /// ID of the [`Property`] to reject.
    pub property_id: property::Id,

    /// Raw reason of the rejection, trimmed before use.
    pub reason: String,
}

impl<Db, St, Gw> Command<RejectProperty> for Service<Db, St, Gw>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Profile>, profile::Id>>,
            Ok = Option<Profile>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Property, property::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        > + Database<Update<Property>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Property;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: RejectProperty,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RejectProperty {
            initiator_id,
            property_id,
            reason,
        } = cmd;

        let capability = profile::Capability::ModerateListings;
        if !role_of(self.database(), initiator_id)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .can(capability)
        {
            return Err(tracerr::new!(E::Forbidden(capability)));
        }

        let reason = property::RejectionReason::new(reason)
            .ok_or(E::EmptyRejectionReason)
            .map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent moderation of the same `Property`.
        tx.execute(Lock(By::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut property = tx
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PropertyNotExists(property_id))
            .map_err(tracerr::wrap!())?;
        property.reject(reason);

        tx.execute(Update(property.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        log::info!(
            "`Property(id: {property_id})` was rejected by \
             `Profile(id: {initiator_id})`",
        );
        Ok(property)
    }
}

/// Error of [`RejectProperty`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Rejection reason is empty after trimming.
    #[display("Rejection reason must not be empty")]
    #[from(ignore)]
    EmptyRejectionReason,

    /// Initiator lacks the required [`profile::Capability`].
    #[display("`{_0}` capability is required")]
    #[from(ignore)]
    Forbidden(#[error(not(source))] profile::Capability),

    /// [`Property`] with the provided ID does not exist.
    #[display("`Property(id: {_0})` does not exist")]
    #[from(ignore)]
    PropertyNotExists(#[error(not(source))] property::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::test::{profile, property},
        domain::{profile::Role, property::Status},
        test::service,
        Command as _,
    };

    use super::{ExecutionError, RejectProperty};

    #[tokio::test]
    async fn stores_trimmed_reason() {
        let svc = service(false);
        let admin = profile(&svc, Role::Admin);
        let landlord = profile(&svc, Role::Landlord);
        let listed = property(&svc, landlord.id, Status::PendingApproval);

        let rejected = svc
            .execute(RejectProperty {
                initiator_id: admin.id,
                property_id: listed.id,
                reason: "  Photos do not match the listing \n".into(),
            })
            .await
            .unwrap();

        assert_eq!(rejected.status, Status::Rejected);
        let stored = svc.database().state().properties[&listed.id].clone();
        assert_eq!(stored.status, Status::Rejected);
        assert_eq!(
            stored.rejection_reason.unwrap().to_string(),
            "Photos do not match the listing",
        );
    }

    #[tokio::test]
    async fn empty_reason_mutates_nothing() {
        let svc = service(false);
        let admin = profile(&svc, Role::Admin);
        let landlord = profile(&svc, Role::Landlord);
        let listed = property(&svc, landlord.id, Status::PendingApproval);

        for reason in ["", "   ", "\n\t"] {
            let err = svc
                .execute(RejectProperty {
                    initiator_id: admin.id,
                    property_id: listed.id,
                    reason: reason.into(),
                })
                .await
                .unwrap_err();

            assert!(matches!(
                err.as_ref(),
                ExecutionError::EmptyRejectionReason,
            ));
            let stored = svc.database().state().properties[&listed.id].clone();
            assert_eq!(stored.status, Status::PendingApproval);
            assert!(stored.rejection_reason.is_none());
        }
    }
}
