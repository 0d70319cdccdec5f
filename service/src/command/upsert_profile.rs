//! [`Command`] for creating or updating a [`Profile`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{profile, Profile},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating or updating a self-service [`Profile`].
///
/// Never changes the [`profile::Role`].
#[derive(Clone, Debug)]
pub struct UpsertProfile {
    /// ID of the user the [`Profile`] belongs to.
    pub user_id: profile::Id,

    /// New full [`profile::Name`].
    pub full_name: Option<profile::Name>,

    /// New contact [`profile::Phone`].
    pub phone: Option<profile::Phone>,

    /// New contact [`profile::Email`].
    pub email: Option<profile::Email>,
}

impl<Db, St, Gw> Command<UpsertProfile> for Service<Db, St, Gw>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
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

    async fn execute(&self, cmd: UpsertProfile) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpsertProfile {
            user_id,
            full_name,
            phone,
            email,
        } = cmd;

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
        profile.full_name = full_name;
        profile.phone = phone;
        profile.email = email;

        tx.execute(Update(profile.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(profile)
    }
}

/// Error of [`UpsertProfile`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::test::profile,
        domain::profile::{self, Email, Name, Phone},
        test::service,
        Command as _,
    };

    use super::UpsertProfile;

    #[tokio::test]
    async fn creates_tenant_profile() {
        let svc = service(false);
        let user_id = profile::Id::new();

        let created = svc
            .execute(UpsertProfile {
                user_id,
                full_name: Some(Name::new("Wanjiru Kamau").unwrap()),
                phone: Some(Phone::new("+254 712 345 678").unwrap()),
                email: None,
            })
            .await
            .unwrap();

        assert_eq!(created.role, profile::Role::Tenant);
        let stored = svc.database().state().profiles[&user_id].clone();
        assert_eq!(stored.full_name.unwrap().to_string(), "Wanjiru Kamau");
        assert!(stored.email.is_none());
    }

    #[tokio::test]
    async fn keeps_role_on_update() {
        let svc = service(false);
        let admin = profile(&svc, profile::Role::Admin);

        let updated = svc
            .execute(UpsertProfile {
                user_id: admin.id,
                full_name: None,
                phone: None,
                email: Some(Email::new("admin@rently.co.ke").unwrap()),
            })
            .await
            .unwrap();

        assert_eq!(updated.role, profile::Role::Admin);
        assert_eq!(updated.created_at, admin.created_at);
        assert_eq!(
            svc.database().state().profiles[&admin.id].role,
            profile::Role::Admin,
        );
    }
}
