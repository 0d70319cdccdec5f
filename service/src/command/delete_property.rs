//! [`Command`] for deleting a [`Property`].

use common::operations::{
    By, Commit, Delete, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{profile, property, Property},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for deleting a [`Property`] listing by its landlord.
#[derive(Clone, Copy, Debug)]
pub struct DeleteProperty {
    /// ID of the landlord deleting the [`Property`].
    pub landlord_id: profile::Id,

    /// ID of the [`Property`] to delete.
    pub property_id: property::Id,
}

impl<Db, St, Gw> Command<DeleteProperty> for Service<Db, St, Gw>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Property, property::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<Property, property::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Property;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: DeleteProperty,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteProperty {
            landlord_id,
            property_id,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `Property`.
        tx.execute(Lock(By::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let property = tx
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PropertyNotExists(property_id))
            .map_err(tracerr::wrap!())?;
        if !property.is_owned_by(landlord_id) {
            return Err(tracerr::new!(E::NotOwner(property_id)));
        }

        tx.execute(Delete(By::<Property, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(property)
    }
}

/// Error of [`DeleteProperty`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Property`] is owned by another landlord.
    #[display("`Property(id: {_0})` is owned by another landlord")]
    #[from(ignore)]
    NotOwner(#[error(not(source))] property::Id),

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

    use super::{DeleteProperty, ExecutionError};

    #[tokio::test]
    async fn owner_deletes() {
        let svc = service(false);
        let landlord = profile(&svc, Role::Landlord);
        let listed = property(&svc, landlord.id, Status::Sold);

        let deleted = svc
            .execute(DeleteProperty {
                landlord_id: landlord.id,
                property_id: listed.id,
            })
            .await
            .unwrap();

        assert_eq!(deleted.id, listed.id);
        assert!(svc.database().state().properties.is_empty());
    }

    #[tokio::test]
    async fn others_cannot_delete() {
        let svc = service(false);
        let owner = profile(&svc, Role::Landlord);
        let admin = profile(&svc, Role::Admin);
        let listed = property(&svc, owner.id, Status::Available);

        let err = svc
            .execute(DeleteProperty {
                landlord_id: admin.id,
                property_id: listed.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NotOwner(_)));
        assert!(svc.database().state().properties.contains_key(&listed.id));
    }
}
