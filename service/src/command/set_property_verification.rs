//! [`Command`] for setting the verification mark of a [`Property`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{profile, property, Profile, Property},
    infra::{database, Database},
    Service,
};

use super::{role_of, Command};

/// [`Command`] for an admin toggling the verification mark of a [`Property`].
///
/// Leaves the [`property::Status`] untouched.
#[derive(Clone, Copy, Debug)]
pub struct SetPropertyVerification {
    /// ID of the admin setting the verification mark.
    pub initiator_id: profile::Id,

    /// ID of the [`Property`] to set the verification mark of.
    pub property_id: property::Id,

    /// Whether the [`Property`] is verified.
    pub verified: bool,
}

impl<Db, St, Gw> Command<SetPropertyVerification> for Service<Db, St, Gw>
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
        cmd: SetPropertyVerification,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SetPropertyVerification {
            initiator_id,
            property_id,
            verified,
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
        if property.verified == verified {
            return Ok(property);
        }
        property.verified = verified;

        tx.execute(Update(property.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(property)
    }
}

/// Error of [`SetPropertyVerification`] [`Command`] execution.
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
}
