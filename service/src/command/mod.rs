//! [`Command`] definition.

pub mod approve_property;
pub mod assign_role;
pub mod authorize_session;
pub mod change_property_status;
pub mod create_property;
pub mod delete_property;
pub mod initiate_payment;
pub mod purchase_contact;
pub mod reject_property;
pub mod set_property_verification;
pub mod settle_payment;
pub mod update_property;
pub mod upsert_profile;

use common::operations::{By, Select};
use derive_more::Debug;
use tracerr::Traced;
use tracing as log;
use uuid::Uuid;

use crate::{
    domain::{profile, property, Profile},
    infra::{database, storage, Database, Storage},
};

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    approve_property::ApproveProperty, assign_role::AssignRole,
    authorize_session::AuthorizeSession,
    change_property_status::ChangePropertyStatus,
    create_property::CreateProperty, delete_property::DeleteProperty,
    initiate_payment::InitiatePayment, purchase_contact::PurchaseContact,
    reject_property::RejectProperty,
    set_property_verification::SetPropertyVerification,
    settle_payment::SettlePayment, update_property::UpdateProperty,
    upsert_profile::UpsertProfile,
};

/// Image uploaded along with a [`Property`].
///
/// [`Property`]: crate::domain::Property
#[derive(Clone, Debug)]
pub struct ImageUpload {
    /// Original file name of the image.
    pub file_name: String,

    /// Contents of the image.
    #[debug("{} bytes", bytes.len())]
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Bucket the [`property::ImageUrl`]s are uploaded into.
    pub const BUCKET: &'static str = "property-images";

    /// File extensions accepted for images.
    pub const EXTENSIONS: &'static [&'static str] =
        &["jpg", "jpeg", "png", "webp", "gif"];

    /// Maximum size of an image in bytes.
    pub const MAX_SIZE: usize = 10 * 1024 * 1024;

    /// Returns the lowercased extension of this [`ImageUpload`], if it's an
    /// accepted one.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.file_name.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        Self::EXTENSIONS.contains(&ext.as_str()).then_some(ext)
    }
}

/// Uploads the provided `images` of the [`Property`] with the provided ID,
/// skipping the ones that fail.
///
/// Returns the [`property::ImageUrl`]s of the uploaded images in their
/// original order, along with the number of failed ones.
///
/// [`Property`]: crate::domain::Property
async fn upload_images<St>(
    storage: &St,
    landlord_id: profile::Id,
    property_id: property::Id,
    images: Vec<ImageUpload>,
) -> (Vec<property::ImageUrl>, usize)
where
    St: Storage<storage::Upload, Ok = String, Err = Traced<storage::Error>>,
{
    let mut urls = Vec::with_capacity(images.len());
    let mut failed = 0;
    for image in images {
        let Some(ext) = image.extension() else {
            log::warn!(
                "skipping image `{}` of `Property(id: {property_id})`: \
                 unsupported extension",
                image.file_name,
            );
            failed += 1;
            continue;
        };
        if image.bytes.is_empty() || image.bytes.len() > ImageUpload::MAX_SIZE
        {
            log::warn!(
                "skipping image `{}` of `Property(id: {property_id})`: \
                 size of {} bytes is out of bounds",
                image.file_name,
                image.bytes.len(),
            );
            failed += 1;
            continue;
        }

        let upload = storage::Upload {
            bucket: ImageUpload::BUCKET,
            path: format!("{landlord_id}/{property_id}/{}.{ext}", Uuid::new_v4()),
            bytes: image.bytes,
        };
        match storage.execute(upload).await {
            Ok(url) => match property::ImageUrl::new(url) {
                Some(url) => urls.push(url),
                None => {
                    log::warn!(
                        "skipping image `{}` of `Property(id: {property_id})`: \
                         storage returned an invalid URL",
                        image.file_name,
                    );
                    failed += 1;
                }
            },
            Err(e) => {
                log::warn!(
                    "failed to upload image `{}` of \
                     `Property(id: {property_id})`: {e}",
                    image.file_name,
                );
                failed += 1;
            }
        }
    }
    (urls, failed)
}

/// Returns the [`profile::Role`] of the user with the provided ID.
///
/// Users without a [`Profile`] are [`profile::Role::Tenant`]s.
pub(crate) async fn role_of<Db>(
    database: &Db,
    user_id: profile::Id,
) -> Result<profile::Role, Traced<database::Error>>
where
    Db: Database<
        Select<By<Option<Profile>, profile::Id>>,
        Ok = Option<Profile>,
        Err = Traced<database::Error>,
    >,
{
    Ok(database
        .execute(Select(By::new(user_id)))
        .await
        .map_err(tracerr::wrap!())?
        .map(|p| p.role)
        .unwrap_or_default())
}

#[cfg(test)]
pub(crate) mod test {
    //! Helpers for testing [`Command`]s.

    use common::Money;

    use crate::{
        domain::{
            profile,
            property::{self, Description, Details, Location, Title},
            Profile, Property,
        },
        test::TestService,
    };

    /// Creates a new [`Profile`] with the provided [`profile::Role`] in the
    /// provided [`TestService`].
    pub(crate) fn profile(svc: &TestService, role: profile::Role) -> Profile {
        let mut profile = Profile::new(profile::Id::new());
        profile.role = role;
        _ = svc
            .database()
            .state()
            .profiles
            .insert(profile.id, profile.clone());
        profile
    }

    /// Returns landlord-editable [`Details`] with the provided `title`.
    pub(crate) fn details(title: &str) -> Details {
        Details {
            title: Title::new(title).unwrap(),
            description: Description::new("Spacious, close to the market")
                .unwrap(),
            kind: property::Kind::Rent,
            price: Money::from_shillings(25_000),
            location: Location::new("Kilimani, Nairobi").unwrap(),
            bedrooms: Some(2),
            bathrooms: Some(1),
            area_sqft: Some(900),
            amenities: vec![],
        }
    }

    /// Stores a new [`Property`] of the provided landlord in the provided
    /// [`property::Status`].
    pub(crate) fn property(
        svc: &TestService,
        landlord_id: profile::Id,
        status: property::Status,
    ) -> Property {
        let mut property = Property::new(
            property::Id::new(),
            landlord_id,
            details("Two bedroom apartment"),
            vec![],
        );
        property.status = status;
        _ = svc
            .database()
            .state()
            .properties
            .insert(property.id, property.clone());
        property
    }
}
