//! [`Command`] for approving a [`Property`].

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

/// [`Command`] for an admin approving a [`Property`], making it publicly
/// available and verified at once.
#[derive(Clone, Copy, Debug)]
pub struct ApproveProperty {
    /// ID of the admin approving the [`Property`].
    pub initiator_id: profile::Id,

    /// ID of the [`Property`] to approve.
    pub property_id: property::Id,
}

impl<Db, St, Gw> Command<ApproveProperty> for Service<Db, St, Gw>
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
        cmd: ApproveProperty,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ApproveProperty {
            initiator_id,
            property_id,
        } = cmd;

        let capability = profile::Capability::ModerateListings;
        if !role_of(self.database(), initiator_id)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .can(capability)
        {
            return Err(tracerr::new!(E::Forbidden(capability)));
        }

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
        property.approve().map_err(tracerr::from_and_wrap!(=> E))?;

        tx.execute(Update(property.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        log::info!(
            "`Property(id: {property_id})` was approved by \
             `Profile(id: {initiator_id})`",
        );
        Ok(property)
    }
}

/// Error of [`ApproveProperty`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Initiator lacks the required [`profile::Capability`].
    #[display("`{_0}` capability is required")]
    #[from(ignore)]
    Forbidden(#[error(not(source))] profile::Capability),

    /// [`Property`] with the provided ID does not exist.
    #[display("`Property(id: {_0})` does not exist")]
    #[from(ignore)]
    PropertyNotExists(#[error(not(source))] property::Id),

    /// [`Property`] cannot be approved from its current status.
    #[display("{_0}")]
    Transition(property::TransitionError),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::test::{profile, property},
        domain::{
            profile::{Capability, Role},
            property::{RejectionReason, Status},
        },
        test::service,
        Command as _,
    };

    use super::{ApproveProperty, ExecutionError};

    #[tokio::test]
    async fn sets_available_and_verified_together() {
        let svc = service(false);
        let admin = profile(&svc, Role::Admin);
        let landlord = profile(&svc, Role::Landlord);
        let listed = property(&svc, landlord.id, Status::PendingApproval);

        let approved = svc
            .execute(ApproveProperty {
                initiator_id: admin.id,
                property_id: listed.id,
            })
            .await
            .unwrap();

        assert_eq!(approved.status, Status::Available);
        assert!(approved.verified);
        let stored = svc.database().state().properties[&listed.id].clone();
        assert_eq!(stored.status, Status::Available);
        assert!(stored.verified);
    }

    #[tokio::test]
    async fn approves_rejected_property() {
        let svc = service(false);
        let admin = profile(&svc, Role::Admin);
        let landlord = profile(&svc, Role::Landlord);
        let listed = property(&svc, landlord.id, Status::Rejected);
        svc.database()
            .state()
            .properties
            .get_mut(&listed.id)
            .unwrap()
            .rejection_reason = RejectionReason::new("Wrong price");

        let approved = svc
            .execute(ApproveProperty {
                initiator_id: admin.id,
                property_id: listed.id,
            })
            .await
            .unwrap();

        assert_eq!(approved.status, Status::Available);
        assert!(approved.rejection_reason.is_none());
    }

    #[tokio::test]
    async fn requires_moderation_capability() {
        let svc = service(false);
        let landlord = profile(&svc, Role::Landlord);
        let listed = property(&svc, landlord.id, Status::PendingApproval);

        let err = svc
            .execute(ApproveProperty {
                initiator_id: landlord.id,
                property_id: listed.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Forbidden(Capability::ModerateListings),
        ));
        assert_eq!(
            svc.database().state().properties[&listed.id].status,
            Status::PendingApproval,
        );
    }
}
