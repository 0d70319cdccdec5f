//! [`Command`] for changing a listed [`property::Status`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{profile, property, Property},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for a landlord marking their [`Property`] as available, rented
/// or sold.
#[derive(Clone, Copy, Debug)]
pub struct ChangePropertyStatus {
    /// ID of the landlord changing the [`property::Status`].
    pub landlord_id: profile::Id,

    /// ID of the [`Property`] to change the [`property::Status`] of.
    pub property_id: property::Id,

    /// New [`property::Status`] of the [`Property`].
    pub status: property::Status,
}

impl<Db, St, Gw> Command<ChangePropertyStatus> for Service<Db, St, Gw>
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
        > + Database<Update<Property>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Property;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ChangePropertyStatus,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ChangePropertyStatus {
            landlord_id,
            property_id,
            status,
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

        let mut property = tx
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PropertyNotExists(property_id))
            .map_err(tracerr::wrap!())?;
        if !property.is_owned_by(landlord_id) {
            return Err(tracerr::new!(E::NotOwner(property_id)));
        }
        if property.status == status {
            return Ok(property);
        }
        property
            .change_status(status)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        tx.execute(Update(property.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(property)
    }
}

/// Error of [`ChangePropertyStatus`] [`Command`] execution.
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

    /// [`property::Status`] transition is not allowed.
    #[display("{_0}")]
    Transition(property::TransitionError),
}
