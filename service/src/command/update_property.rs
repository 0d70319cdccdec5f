//! [`Command`] for updating a [`Property`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{profile, property, Property},
    infra::{database, storage, Database, Storage},
    Service,
};

use super::{upload_images, Command, ImageUpload};

/// [`Command`] for updating a [`Property`] listing by its landlord.
///
/// A [`property::Status::Rejected`] [`Property`] is resubmitted for
/// moderation.
#[derive(Clone, Debug)]
pub struct UpdateProperty {
    /// ID of the landlord updating the [`Property`].
    pub landlord_id: profile::Id,

    /// ID of the [`Property`] to update.
    pub property_id: property::Id,

    /// New [`property::Details`] of the [`Property`].
    pub details: property::Details,

    /// Current [`property::ImageUrl`]s of the [`Property`] to keep.
    pub keep_images: Vec<property::ImageUrl>,

    /// New images to append after the kept ones.
    pub images: Vec<ImageUpload>,
}

/// Result of an [`UpdateProperty`] [`Command`] execution.
#[derive(Clone, Debug)]
pub struct Updated {
    /// Updated [`Property`].
    pub property: Property,

    /// Number of new images which failed to upload and were skipped.
    pub failed_uploads: usize,
}

impl<Db, St, Gw> Command<UpdateProperty> for Service<Db, St, Gw>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
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
    St: Storage<storage::Upload, Ok = String, Err = Traced<storage::Error>>,
{
    type Ok = Updated;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateProperty,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateProperty {
            landlord_id,
            property_id,
            details,
            keep_images,
            images,
        } = cmd;

        // Check ownership before uploading anything.
        let property = self
            .database()
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PropertyNotExists(property_id))
            .map_err(tracerr::wrap!())?;
        if !property.is_owned_by(landlord_id) {
            return Err(tracerr::new!(E::NotOwner(property_id)));
        }

        let (uploaded, failed_uploads) =
            upload_images(self.storage(), landlord_id, property_id, images)
                .await;

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

        let mut images = property.retained_images(&keep_images);
        images.extend(uploaded);
        if property.edit(details, images) {
            log::debug!(
                "`Property(id: {property_id})` was resubmitted for moderation",
            );
        }

        tx.execute(Update(property.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(Updated {
            property,
            failed_uploads,
        })
    }
}

/// Error of [`UpdateProperty`] [`Command`] execution.
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
        command::{
            test::{details, profile, property},
            ImageUpload,
        },
        domain::{
            profile::Role,
            property::{ImageUrl, RejectionReason, Status},
        },
        test::service,
        Command as _,
    };

    use super::{ExecutionError, UpdateProperty};

    fn url(s: &str) -> ImageUrl {
        ImageUrl::new(s).unwrap()
    }

    #[tokio::test]
    async fn resubmits_rejected_property() {
        let svc = service(false);
        let landlord = profile(&svc, Role::Landlord);
        let listed = property(&svc, landlord.id, Status::Rejected);
        svc.database()
            .state()
            .properties
            .get_mut(&listed.id)
            .unwrap()
            .rejection_reason = RejectionReason::new("Blurry photos");

        let updated = svc
            .execute(UpdateProperty {
                landlord_id: landlord.id,
                property_id: listed.id,
                details: details("Two bedroom apartment"),
                keep_images: vec![],
                images: vec![],
            })
            .await
            .unwrap();

        assert_eq!(updated.property.status, Status::PendingApproval);
        let stored = svc.database().state().properties[&listed.id].clone();
        assert_eq!(stored.status, Status::PendingApproval);
        assert!(stored.rejection_reason.is_none());
    }

    #[tokio::test]
    async fn keeps_selected_images_and_appends_new() {
        let svc = service(false);
        let landlord = profile(&svc, Role::Landlord);
        let listed = property(&svc, landlord.id, Status::Available);
        svc.database()
            .state()
            .properties
            .get_mut(&listed.id)
            .unwrap()
            .images = vec![url("/a.jpg"), url("/b.jpg"), url("/c.jpg")];

        let updated = svc
            .execute(UpdateProperty {
                landlord_id: landlord.id,
                property_id: listed.id,
                details: details("Renovated apartment"),
                keep_images: vec![
                    url("/c.jpg"),
                    url("https://elsewhere.com/x.jpg"),
                    url("/a.jpg"),
                ],
                images: vec![ImageUpload {
                    file_name: "new.png".into(),
                    bytes: vec![1],
                }],
            })
            .await
            .unwrap();

        let images = updated
            .property
            .images
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        assert_eq!(images.len(), 3);
        assert_eq!(images[0], "/a.jpg");
        assert_eq!(images[1], "/c.jpg");
        assert!(images[2].ends_with(".png"));
        assert_eq!(updated.property.status, Status::Available);
        assert_eq!(updated.property.title.to_string(), "Renovated apartment");
    }

    #[tokio::test]
    async fn rejects_foreign_landlord() {
        let svc = service(false);
        let owner = profile(&svc, Role::Landlord);
        let other = profile(&svc, Role::Landlord);
        let listed = property(&svc, owner.id, Status::Available);

        let err = svc
            .execute(UpdateProperty {
                landlord_id: other.id,
                property_id: listed.id,
                details: details("Hijacked"),
                keep_images: vec![],
                images: vec![ImageUpload {
                    file_name: "new.png".into(),
                    bytes: vec![1],
                }],
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NotOwner(_)));
        assert!(svc.storage().urls().is_empty());
        assert_eq!(
            svc.database().state().properties[&listed.id]
                .title
                .to_string(),
            "Two bedroom apartment",
        );
    }
}
