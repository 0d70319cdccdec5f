//! [`Command`] for creating a new [`Property`].

use common::operations::{By, Commit, Insert, Select, Transact, Transacted};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{profile, property, Profile, Property},
    infra::{database, storage, Database, Storage},
    Service,
};

use super::{role_of, upload_images, Command, ImageUpload};

/// [`Command`] for creating a new [`Property`] listing, submitted for
/// moderation.
#[derive(Clone, Debug)]
pub struct CreateProperty {
    /// ID of the landlord creating the [`Property`].
    pub landlord_id: profile::Id,

    /// [`property::Details`] of the new [`Property`].
    pub details: property::Details,

    /// Images of the new [`Property`], in display order.
    pub images: Vec<ImageUpload>,
}

/// Result of a [`CreateProperty`] [`Command`] execution.
#[derive(Clone, Debug)]
pub struct Created {
    /// Created [`Property`].
    pub property: Property,

    /// Number of images which failed to upload and were skipped.
    pub failed_uploads: usize,
}

impl<Db, St, Gw> Command<CreateProperty> for Service<Db, St, Gw>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Profile>, profile::Id>>,
            Ok = Option<Profile>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<Insert<Property>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
    St: Storage<storage::Upload, Ok = String, Err = Traced<storage::Error>>,
{
    type Ok = Created;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateProperty,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateProperty {
            landlord_id,
            details,
            images,
        } = cmd;

        let capability = profile::Capability::ManageOwnListings;
        if !role_of(self.database(), landlord_id)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .can(capability)
        {
            return Err(tracerr::new!(E::Forbidden(capability)));
        }

        let id = property::Id::new();
        let (urls, failed_uploads) =
            upload_images(self.storage(), landlord_id, id, images).await;
        let property = Property::new(id, landlord_id, details, urls);

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Insert(property.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        if failed_uploads > 0 {
            log::warn!(
                "`Property(id: {id})` was created without {failed_uploads} \
                 image(s)",
            );
        }
        Ok(Created {
            property,
            failed_uploads,
        })
    }
}

/// Error of [`CreateProperty`] [`Command`] execution.
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
