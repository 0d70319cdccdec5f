//! [`Command`] for assigning a [`profile::Role`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{profile, Profile},
    infra::{database, Database},
    Service,
};

use super::{role_of, Command};

/// [`Command`] for assigning a [`profile::Role`] to a user.
///
/// Creates an empty [`Profile`] if the user has none yet.
#[derive(Clone, Copy, Debug)]
pub struct AssignRole {
    /// ID of the admin assigning the [`profile::Role`].
    pub initiator_id: profile::Id,

    /// ID of the user to assign the [`profile::Role`] to.
    pub user_id: profile::Id,

    /// [`profile::Role`] to assign.
    pub role: profile::Role,
}

impl<Db, St, Gw> Command<AssignRole> for Service<Db, St, Gw>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Profile>, profile::Id>>,
            Ok = Option<Profile>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Profile, profile::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Profile>, profile::Id>>,
            Ok = Option<Profile>,
            Err = Traced<database::Error>,
        > + Database<Update<Profile>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Profile;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: AssignRole) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AssignRole {
            initiator_id,
            user_id,
            role,
        } = cmd;

        let capability = profile::Capability::AssignRoles;
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

        // Avoid concurrent creation of the same `Profile`.
        tx.execute(Lock(By::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut profile = tx
            .execute(Select(By::<Option<Profile>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .unwrap_or_else(|| Profile::new(user_id));
        if profile.role == role {
            return Ok(profile);
        }
        profile.role = role;

        tx.execute(Update(profile.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        log::info!(
            "`Profile(id: {user_id})` was assigned `{role}` role by \
             `Profile(id: {initiator_id})`",
        );
        Ok(profile)
    }
}

/// Error of [`AssignRole`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Initiator lacks the required [`profile::Capability`].
    #[display("`{_0}` capability is required")]
    #[from(ignore)]
    Forbidden(#[error(not(source))] profile::Capability),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::test::profile,
        domain::profile::{self, Role},
        test::service,
        Command as _,
    };

    use super::{AssignRole, ExecutionError};

    #[tokio::test]
    async fn admin_assigns_role() {
        let svc = service(false);
        let admin = profile(&svc, Role::Admin);
        let tenant = profile(&svc, Role::Tenant);

        let updated = svc
            .execute(AssignRole {
                initiator_id: admin.id,
                user_id: tenant.id,
                role: Role::Landlord,
            })
            .await
            .unwrap();

        assert_eq!(updated.role, Role::Landlord);
        assert_eq!(
            svc.database().state().profiles[&tenant.id].role,
            Role::Landlord,
        );
    }

    #[tokio::test]
    async fn creates_missing_profile() {
        let svc = service(false);
        let admin = profile(&svc, Role::Admin);
        let user_id = profile::Id::new();

        _ = svc
            .execute(AssignRole {
                initiator_id: admin.id,
                user_id,
                role: Role::Admin,
            })
            .await
            .unwrap();

        assert_eq!(svc.database().state().profiles[&user_id].role, Role::Admin);
    }

    #[tokio::test]
    async fn landlord_cannot_assign_roles() {
        let svc = service(false);
        let landlord = profile(&svc, Role::Landlord);

        let err = svc
            .execute(AssignRole {
                initiator_id: landlord.id,
                user_id: landlord.id,
                role: Role::Admin,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Forbidden(profile::Capability::AssignRoles),
        ));
        assert_eq!(
            svc.database().state().profiles[&landlord.id].role,
            Role::Landlord,
        );
    }
}
