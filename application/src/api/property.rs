//! [`Property`]-related definitions.

use common::{DateTime, Money};
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLInputObject, GraphQLScalar};
use service::{command, domain, query, read, Query as _};
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    define_error, AsError, Context, Error,
};

/// A property listed on the marketplace.
#[derive(Clone, Debug, From, Into)]
pub struct Property(domain::Property);

impl Property {
    /// Returns ID of the current user, if authenticated.
    async fn viewer_id(
        ctx: &Context,
    ) -> Result<Option<domain::profile::Id>, Error> {
        Ok(ctx.try_current_session().await?.map(|s| s.user_id.into()))
    }
}

/// A property listed on the marketplace.
#[graphql_object(context = Context)]
impl Property {
    /// Unique identifier of this `Property`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// ID of the landlord owning this `Property`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.landlordId",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn landlord_id(&self) -> api::profile::Id {
        self.0.landlord_id.into()
    }

    /// `Profile` of the landlord owning this `Property`, if it's filled.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.landlord",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn landlord(
        &self,
        ctx: &Context,
    ) -> Result<Option<api::Profile>, Error> {
        ctx.service()
            .execute(query::profile::ById::by(self.0.landlord_id))
            .await
            .map(|p| p.map(Into::into))
            .map_err(AsError::into_error)
            .map_err(ctx.error())
    }

    /// Title of this `Property`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.title",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn title(&self) -> Title {
        self.0.title.clone().into()
    }

    /// Description of this `Property`.
    pub fn description(&self) -> Description {
        self.0.description.clone().into()
    }

    /// Kind of the deal this `Property` is offered for.
    pub fn kind(&self) -> Kind {
        self.0.kind.into()
    }

    /// Asking price of this `Property`.
    pub fn price(&self) -> Money {
        self.0.price
    }

    /// Location of this `Property`.
    pub fn location(&self) -> Location {
        self.0.location.clone().into()
    }

    /// Number of bedrooms in this `Property`.
    pub fn bedrooms(&self) -> Option<i32> {
        self.0.bedrooms.map(Into::into)
    }

    /// Number of bathrooms in this `Property`.
    pub fn bathrooms(&self) -> Option<i32> {
        self.0.bathrooms.map(Into::into)
    }

    /// Area of this `Property` in square feet.
    pub fn area_sqft(&self) -> Option<i32> {
        self.0.area_sqft
    }

    /// Ordered image URLs of this `Property`.
    pub fn images(&self) -> Vec<ImageUrl> {
        self.0.images.iter().cloned().map(Into::into).collect()
    }

    /// Amenities of this `Property`.
    pub fn amenities(&self) -> Vec<Amenity> {
        self.0.amenities.iter().cloned().map(Into::into).collect()
    }

    /// Lifecycle status of this `Property`.
    pub fn status(&self) -> Status {
        self.0.status.into()
    }

    /// Indicator whether this `Property` has been verified by an admin.
    pub fn verified(&self) -> bool {
        self.0.verified
    }

    /// Reason this `Property` was rejected with, if it's `REJECTED`.
    pub fn rejection_reason(&self) -> Option<String> {
        self.0.rejection_reason.as_ref().map(ToString::to_string)
    }

    /// `DateTime` when this `Property` was created.
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }

    /// Contact details of the landlord owning this `Property`.
    ///
    /// `null` unless the current user has purchased them for this exact
    /// `Property`, owns it, or is a moderator.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.landlordContact",
            otel.name = api::Query::SPAN_NAME,
            property.id = %self.0.id,
        ),
    )]
    pub async fn landlord_contact(
        &self,
        ctx: &Context,
    ) -> Result<Option<Contact>, Error> {
        let viewer_id = Self::viewer_id(ctx).await?;
        ctx.service()
            .execute(query::property::Contact {
                viewer_id,
                property_id: self.0.id,
                landlord_id: self.0.landlord_id,
            })
            .await
            .map(|c| c.map(Into::into))
            .map_err(AsError::into_error)
            .map_err(ctx.error())
    }

    /// Indicator whether the current user has purchased the landlord contact
    /// of this `Property`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.hasPurchasedContact",
            otel.name = api::Query::SPAN_NAME,
            property.id = %self.0.id,
        ),
    )]
    pub async fn has_purchased_contact(
        &self,
        ctx: &Context,
    ) -> Result<bool, Error> {
        let Some(user_id) = Self::viewer_id(ctx).await? else {
            return Ok(false);
        };
        ctx.service()
            .execute(query::purchase::IsPurchased::by(
                domain::purchase::Key {
                    user_id,
                    property_id: self.0.id,
                },
            ))
            .await
            .map(|read::purchase::IsPurchased(yes)| yes)
            .map_err(AsError::into_error)
            .map_err(ctx.error())
    }
}

/// Contact details of a `Property` landlord.
#[derive(Clone, Debug, From)]
pub struct Contact(read::property::Contact);

/// Contact details of a `Property` landlord.
#[graphql_object(name = "PropertyContact", context = Context)]
impl Contact {
    /// Phone of the landlord.
    pub fn phone(&self) -> Option<api::profile::Phone> {
        self.0.phone.clone().map(Into::into)
    }

    /// Email of the landlord.
    pub fn email(&self) -> Option<api::profile::Email> {
        self.0.email.clone().map(Into::into)
    }
}

/// Result of saving a `Property` along with its images.
#[derive(Clone, Debug)]
pub struct SaveResult {
    /// Saved [`Property`].
    property: Property,

    /// Number of images skipped due to failed uploads.
    failed_uploads: usize,
}

impl From<command::create_property::Created> for SaveResult {
    fn from(created: command::create_property::Created) -> Self {
        Self {
            property: created.property.into(),
            failed_uploads: created.failed_uploads,
        }
    }
}

impl From<command::update_property::Updated> for SaveResult {
    fn from(updated: command::update_property::Updated) -> Self {
        Self {
            property: updated.property.into(),
            failed_uploads: updated.failed_uploads,
        }
    }
}

/// Result of saving a `Property` along with its images.
#[graphql_object(name = "PropertySaveResult", context = Context)]
impl SaveResult {
    /// Saved `Property`.
    pub fn property(&self) -> &Property {
        &self.property
    }

    /// Number of images skipped due to failed uploads.
    pub fn failed_uploads(&self) -> i32 {
        i32::try_from(self.failed_uploads).unwrap_or(i32::MAX)
    }
}

/// Landlord-editable details of a `Property`.
#[derive(Clone, Debug, GraphQLInputObject)]
#[graphql(name = "PropertyInput")]
pub struct Input {
    /// Title of the `Property`.
    pub title: Title,

    /// Description of the `Property`.
    pub description: Description,

    /// Kind of the deal the `Property` is offered for.
    pub kind: Kind,

    /// Asking price of the `Property`.
    pub price: Money,

    /// Location of the `Property`.
    pub location: Location,

    /// Number of bedrooms in the `Property`.
    pub bedrooms: Option<i32>,

    /// Number of bathrooms in the `Property`.
    pub bathrooms: Option<i32>,

    /// Area of the `Property` in square feet.
    pub area_sqft: Option<i32>,

    /// Amenities of the `Property`.
    pub amenities: Option<Vec<Amenity>>,
}

impl Input {
    /// Maximum number of amenities of a `Property`.
    pub const MAX_AMENITIES: usize = 64;

    /// Validates and converts this [`Input`] into [`domain::property::Details`].
    ///
    /// # Errors
    ///
    /// If any of the numbers is negative or out of range, or there are too
    /// many amenities.
    pub fn into_details(self) -> Result<domain::property::Details, Error> {
        let Self {
            title,
            description,
            kind,
            price,
            location,
            bedrooms,
            bathrooms,
            area_sqft,
            amenities,
        } = self;

        let rooms = |n: Option<i32>| {
            n.map(|n| {
                domain::property::Rooms::try_from(n)
                    .ok()
                    .filter(|n| *n >= 0)
                    .ok_or(InputError::InvalidRooms)
            })
            .transpose()
        };
        let amenities = amenities.unwrap_or_default();
        if amenities.len() > Self::MAX_AMENITIES {
            return Err(InputError::TooManyAmenities.into());
        }

        Ok(domain::property::Details {
            title: title.into(),
            description: description.into(),
            kind: kind.into(),
            price,
            location: location.into(),
            bedrooms: rooms(bedrooms)?,
            bathrooms: rooms(bathrooms)?,
            area_sqft: area_sqft
                .map(|a| (a >= 0).then_some(a).ok_or(InputError::InvalidArea))
                .transpose()?,
            amenities: amenities.into_iter().map(Into::into).collect(),
        })
    }
}

/// Image uploaded along with a `Property`.
#[derive(Clone, Debug, GraphQLInputObject)]
#[graphql(name = "PropertyImageInput")]
pub struct ImageInput {
    /// Original file name of the image, determining its format.
    pub file_name: String,

    /// Contents of the image.
    pub data: scalar::Base64,
}

impl From<ImageInput> for command::ImageUpload {
    fn from(image: ImageInput) -> Self {
        Self {
            file_name: image.file_name,
            bytes: image.data.into(),
        }
    }
}

/// Unique identifier of a `Property`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::property::Id)]
#[into(domain::property::Id)]
#[graphql(name = "PropertyId", transparent)]
pub struct Id(Uuid);

/// Title of a `Property`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "PropertyTitle",
    with = scalar::Via::<domain::property::Title>,
)]
pub struct Title(domain::property::Title);

/// Description of a `Property`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "PropertyDescription",
    with = scalar::Via::<domain::property::Description>,
)]
pub struct Description(domain::property::Description);

/// Location of a `Property`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "PropertyLocation",
    with = scalar::Via::<domain::property::Location>,
)]
pub struct Location(domain::property::Location);

/// Amenity of a `Property`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "PropertyAmenity",
    with = scalar::Via::<domain::property::Amenity>,
)]
pub struct Amenity(domain::property::Amenity);

/// Image URL of a `Property`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "PropertyImageUrl",
    with = scalar::Via::<domain::property::ImageUrl>,
)]
pub struct ImageUrl(domain::property::ImageUrl);

/// Kind of the deal a `Property` is offered for.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "PropertyKind")]
pub enum Kind {
    /// Offered for rent.
    Rent,

    /// Offered for sale.
    Sale,
}

impl From<domain::property::Kind> for Kind {
    fn from(kind: domain::property::Kind) -> Self {
        use domain::property::Kind as K;
        match kind {
            K::Rent => Self::Rent,
            K::Sale => Self::Sale,
        }
    }
}

impl From<Kind> for domain::property::Kind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Rent => Self::Rent,
            Kind::Sale => Self::Sale,
        }
    }
}

/// Lifecycle status of a `Property`.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "PropertyStatus")]
pub enum Status {
    /// Awaits moderation.
    PendingApproval,

    /// Publicly listed.
    Available,

    /// Rejected by a moderator.
    Rejected,

    /// Rented out.
    Rented,

    /// Sold.
    Sold,
}

impl From<domain::property::Status> for Status {
    fn from(status: domain::property::Status) -> Self {
        use domain::property::Status as S;
        match status {
            S::PendingApproval => Self::PendingApproval,
            S::Available => Self::Available,
            S::Rejected => Self::Rejected,
            S::Rented => Self::Rented,
            S::Sold => Self::Sold,
        }
    }
}

impl From<Status> for domain::property::Status {
    fn from(status: Status) -> Self {
        match status {
            Status::PendingApproval => Self::PendingApproval,
            Status::Available => Self::Available,
            Status::Rejected => Self::Rejected,
            Status::Rented => Self::Rented,
            Status::Sold => Self::Sold,
        }
    }
}

define_error! {
    enum InputError {
        #[code = "INVALID_ROOMS"]
        #[status = BAD_REQUEST]
        #[message = "Number of rooms must be a non-negative integer"]
        InvalidRooms,

        #[code = "INVALID_AREA"]
        #[status = BAD_REQUEST]
        #[message = "Area must be a non-negative integer"]
        InvalidArea,

        #[code = "TOO_MANY_AMENITIES"]
        #[status = BAD_REQUEST]
        #[message = "`Property` cannot have more than 64 amenities"]
        TooManyAmenities,
    }
}
