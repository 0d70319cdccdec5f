//! [`Property`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::profile;

/// Property listed for rent or sale by a landlord.
#[derive(Clone, Debug)]
pub struct Property {
    /// ID of this [`Property`].
    pub id: Id,

    /// ID of the landlord [`Profile`] owning this [`Property`].
    ///
    /// [`Profile`]: profile::Profile
    pub landlord_id: profile::Id,

    /// [`Title`] of this [`Property`].
    pub title: Title,

    /// [`Description`] of this [`Property`].
    pub description: Description,

    /// [`Kind`] of this [`Property`].
    pub kind: Kind,

    /// Asking price of this [`Property`].
    pub price: Money,

    /// [`Location`] of this [`Property`].
    pub location: Location,

    /// Number of bedrooms in this [`Property`], if specified.
    pub bedrooms: Option<Rooms>,

    /// Number of bathrooms in this [`Property`], if specified.
    pub bathrooms: Option<Rooms>,

    /// Area of this [`Property`] in square feet, if specified.
    pub area_sqft: Option<Area>,

    /// Ordered [`ImageUrl`]s of this [`Property`].
    pub images: Vec<ImageUrl>,

    /// [`Amenity`]s of this [`Property`].
    pub amenities: Vec<Amenity>,

    /// Lifecycle [`Status`] of this [`Property`].
    pub status: Status,

    /// Indicator whether this [`Property`] has been verified by an admin.
    pub verified: bool,

    /// [`RejectionReason`] of this [`Property`], if it's [`Status::Rejected`].
    pub rejection_reason: Option<RejectionReason>,

    /// [`DateTime`] when this [`Property`] was created.
    pub created_at: CreationDateTime,
}

impl Property {
    /// Creates a new [`Property`] submitted for moderation.
    #[must_use]
    pub fn new(
        id: Id,
        landlord_id: profile::Id,
        details: Details,
        images: Vec<ImageUrl>,
    ) -> Self {
        let Details {
            title,
            description,
            kind,
            price,
            location,
            bedrooms,
            bathrooms,
            area_sqft,
            amenities,
        } = details;
        Self {
            id,
            landlord_id,
            title,
            description,
            kind,
            price,
            location,
            bedrooms,
            bathrooms,
            area_sqft,
            images,
            amenities,
            status: Status::PendingApproval,
            verified: false,
            rejection_reason: None,
            created_at: CreationDateTime::now(),
        }
    }

    /// Indicates whether this [`Property`] is owned by the landlord with the
    /// provided ID.
    #[must_use]
    pub fn is_owned_by(&self, landlord_id: profile::Id) -> bool {
        self.landlord_id == landlord_id
    }

    /// Replaces the landlord-editable [`Details`] and [`ImageUrl`]s of this
    /// [`Property`].
    ///
    /// A [`Status::Rejected`] [`Property`] is resubmitted for moderation.
    /// Returns whether it was.
    pub fn edit(&mut self, details: Details, images: Vec<ImageUrl>) -> bool {
        let Details {
            title,
            description,
            kind,
            price,
            location,
            bedrooms,
            bathrooms,
            area_sqft,
            amenities,
        } = details;
        self.title = title;
        self.description = description;
        self.kind = kind;
        self.price = price;
        self.location = location;
        self.bedrooms = bedrooms;
        self.bathrooms = bathrooms;
        self.area_sqft = area_sqft;
        self.amenities = amenities;
        self.images = images;

        let resubmitted = self.status == Status::Rejected;
        if resubmitted {
            self.status = Status::PendingApproval;
            self.rejection_reason = None;
        }
        resubmitted
    }

    /// Returns the current [`ImageUrl`]s of this [`Property`] which are
    /// present in the provided `keep` list, preserving their current order.
    ///
    /// URLs not belonging to this [`Property`] are ignored.
    #[must_use]
    pub fn retained_images(&self, keep: &[ImageUrl]) -> Vec<ImageUrl> {
        self.images
            .iter()
            .filter(|img| keep.contains(img))
            .cloned()
            .collect()
    }

    /// Approves this [`Property`] making it publicly available and verified.
    ///
    /// # Errors
    ///
    /// If this [`Property`] is neither [`Status::PendingApproval`] nor
    /// [`Status::Rejected`].
    pub fn approve(&mut self) -> Result<(), TransitionError> {
        if !matches!(self.status, Status::PendingApproval | Status::Rejected) {
            return Err(TransitionError {
                from: self.status,
                to: Status::Available,
            });
        }
        self.status = Status::Available;
        self.verified = true;
        self.rejection_reason = None;
        Ok(())
    }

    /// Rejects this [`Property`] with the provided [`RejectionReason`].
    pub fn reject(&mut self, reason: RejectionReason) {
        self.status = Status::Rejected;
        self.rejection_reason = Some(reason);
    }

    /// Changes the listed [`Status`] of this [`Property`].
    ///
    /// # Errors
    ///
    /// If this [`Property`] hasn't been approved yet, or the provided `status`
    /// is not a listed one.
    pub fn change_status(&mut self, status: Status) -> Result<(), TransitionError> {
        if !self.status.is_listed() || !status.is_listed() {
            return Err(TransitionError {
                from: self.status,
                to: status,
            });
        }
        self.status = status;
        Ok(())
    }
}

/// Landlord-editable details of a [`Property`].
#[derive(Clone, Debug)]
pub struct Details {
    /// [`Title`] of the [`Property`].
    pub title: Title,

    /// [`Description`] of the [`Property`].
    pub description: Description,

    /// [`Kind`] of the [`Property`].
    pub kind: Kind,

    /// Asking price of the [`Property`].
    pub price: Money,

    /// [`Location`] of the [`Property`].
    pub location: Location,

    /// Number of bedrooms in the [`Property`].
    pub bedrooms: Option<Rooms>,

    /// Number of bathrooms in the [`Property`].
    pub bathrooms: Option<Rooms>,

    /// Area of the [`Property`] in square feet.
    pub area_sqft: Option<Area>,

    /// [`Amenity`]s of the [`Property`].
    pub amenities: Vec<Amenity>,
}

/// Error of an invalid [`Status`] transition of a [`Property`].
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("`Property` cannot go from `{from}` to `{to}`")]
pub struct TransitionError {
    /// [`Status`] the [`Property`] was in.
    pub from: Status,

    /// [`Status`] the [`Property`] was requested to go to.
    pub to: Status,
}

/// ID of a [`Property`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_kind! {
    #[doc = "Kind of a [`Property`] deal."]
    enum Kind {
        #[doc = "[`Property`] is offered for rent."]
        Rent = "rent",

        #[doc = "[`Property`] is offered for sale."]
        Sale = "sale",
    }
}

define_kind! {
    #[doc = "Lifecycle status of a [`Property`]."]
    enum Status {
        #[doc = "[`Property`] awaits moderation."]
        PendingApproval = "pending_approval",

        #[doc = "[`Property`] is publicly listed."]
        Available = "available",

        #[doc = "[`Property`] was rejected by a moderator."]
        Rejected = "rejected",

        #[doc = "[`Property`] is rented out."]
        Rented = "rented",

        #[doc = "[`Property`] is sold."]
        Sold = "sold",
    }
}

impl Status {
    /// Indicates whether this [`Status`] is one a landlord may switch between
    /// once the [`Property`] has been approved.
    #[must_use]
    pub const fn is_listed(self) -> bool {
        matches!(self, Self::Available | Self::Rented | Self::Sold)
    }
}

/// Title of a [`Property`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct Title(String);

impl Title {
    /// Creates a new [`Title`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `title` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(title: impl Into<String>) -> Self {
        Self(title.into())
    }

    /// Creates a new [`Title`] if the given `title` is valid.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Option<Self> {
        let title = title.into();
        Self::check(&title).then_some(Self(title))
    }

    /// Checks whether the given `title` is a valid [`Title`].
    fn check(title: impl AsRef<str>) -> bool {
        let title = title.as_ref();
        title.trim() == title && !title.is_empty() && title.len() <= 512
    }
}

impl FromStr for Title {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Title`")
    }
}

/// Description of a [`Property`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct Description(String);

impl Description {
    /// Creates a new [`Description`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        Self::check(&text).then_some(Self(text))
    }

    /// Checks whether the given `text` is a valid [`Description`].
    fn check(text: impl AsRef<str>) -> bool {
        let text = text.as_ref();
        text.trim() == text && !text.is_empty() && text.len() <= 10_000
    }
}

impl FromStr for Description {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Description`")
    }
}

/// Free-text location of a [`Property`] (e.g. `Kilimani, Nairobi`).
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct Location(String);

impl Location {
    /// Creates a new [`Location`] if the given `location` is valid.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Option<Self> {
        let location = location.into();
        Self::check(&location).then_some(Self(location))
    }

    /// Checks whether the given `location` is a valid [`Location`].
    fn check(location: impl AsRef<str>) -> bool {
        let location = location.as_ref();
        location.trim() == location
            && !location.is_empty()
            && location.len() <= 512
    }
}

impl FromStr for Location {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Location`")
    }
}

/// Amenity of a [`Property`] (e.g. `Parking`).
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct Amenity(String);

impl Amenity {
    /// Creates a new [`Amenity`] if the given `amenity` is valid.
    #[must_use]
    pub fn new(amenity: impl Into<String>) -> Option<Self> {
        let amenity = amenity.into();
        Self::check(&amenity).then_some(Self(amenity))
    }

    /// Checks whether the given `amenity` is a valid [`Amenity`].
    fn check(amenity: impl AsRef<str>) -> bool {
        let amenity = amenity.as_ref();
        amenity.trim() == amenity && !amenity.is_empty() && amenity.len() <= 128
    }
}

impl FromStr for Amenity {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Amenity`")
    }
}

/// Publicly reachable URL of a [`Property`] image.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct ImageUrl(String);

impl ImageUrl {
    /// Creates a new [`ImageUrl`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `url` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Creates a new [`ImageUrl`] if the given `url` is valid.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Option<Self> {
        let url = url.into();
        Self::check(&url).then_some(Self(url))
    }

    /// Checks whether the given `url` is a valid [`ImageUrl`].
    ///
    /// Either an absolute HTTP(S) URL, or an absolute path on this server.
    fn check(url: impl AsRef<str>) -> bool {
        let url = url.as_ref();
        (url.starts_with("https://")
            || url.starts_with("http://")
            || url.starts_with('/'))
            && !url.contains(char::is_whitespace)
            && url.len() <= 2048
    }
}

impl FromStr for ImageUrl {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `ImageUrl`")
    }
}

/// Moderator's reason of rejecting a [`Property`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct RejectionReason(String);

impl RejectionReason {
    /// Creates a new [`RejectionReason`] out of the given `reason`, trimming
    /// it.
    ///
    /// [`None`] is returned if nothing remains after trimming.
    #[must_use]
    pub fn new(reason: impl AsRef<str>) -> Option<Self> {
        let reason = reason.as_ref().trim();
        (!reason.is_empty() && reason.len() <= 2000)
            .then(|| Self(reason.to_owned()))
    }
}

impl FromStr for RejectionReason {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("empty `RejectionReason`")
    }
}

/// Number of rooms of some kind in a [`Property`].
pub type Rooms = i16;

/// Area of a [`Property`] in square feet.
pub type Area = i32;

/// [`DateTime`] when a [`Property`] was created.
pub type CreationDateTime = DateTimeOf<(Property, unit::Creation)>;

#[cfg(test)]
mod spec {
    use common::Money;

    use crate::domain::profile;

    use super::{
        Details, Description, ImageUrl, Kind, Location, Property,
        RejectionReason, Status, Title,
    };

    fn details(title: &str) -> Details {
        Details {
            title: Title::new(title).unwrap(),
            description: Description::new("Spacious and bright").unwrap(),
            kind: Kind::Rent,
            price: Money::from_shillings(45_000),
            location: Location::new("Kilimani, Nairobi").unwrap(),
            bedrooms: Some(2),
            bathrooms: Some(1),
            area_sqft: None,
            amenities: vec![],
        }
    }

    fn image(n: u8) -> ImageUrl {
        ImageUrl::new(format!("/storage/property-images/{n}.jpg")).unwrap()
    }

    fn property() -> Property {
        Property::new(
            super::Id::new(),
            profile::Id::new(),
            details("2BR apartment"),
            vec![image(1), image(2), image(3)],
        )
    }

    #[test]
    fn is_submitted_for_moderation() {
        let p = property();

        assert_eq!(p.status, Status::PendingApproval);
        assert!(!p.verified);
        assert!(p.rejection_reason.is_none());
    }

    #[test]
    fn approves_pending_and_rejected() {
        let mut p = property();
        p.approve().unwrap();
        assert_eq!(p.status, Status::Available);
        assert!(p.verified);

        let mut p = property();
        p.reject(RejectionReason::new("blurry photos").unwrap());
        p.approve().unwrap();
        assert_eq!(p.status, Status::Available);
        assert!(p.rejection_reason.is_none());

        let mut p = property();
        p.approve().unwrap();
        p.change_status(Status::Sold).unwrap();
        let err = p.approve().unwrap_err();
        assert_eq!(err.from, Status::Sold);
    }

    #[test]
    fn resubmits_rejected_on_edit() {
        let mut p = property();
        p.reject(RejectionReason::new("missing price details").unwrap());

        let resubmitted = p.edit(details("Renovated 2BR"), vec![image(1)]);

        assert!(resubmitted);
        assert_eq!(p.status, Status::PendingApproval);
        assert!(p.rejection_reason.is_none());
        assert_eq!(p.title.to_string(), "Renovated 2BR");
        assert_eq!(p.images, [image(1)]);
    }

    #[test]
    fn keeps_status_on_edit_of_approved() {
        let mut p = property();
        p.approve().unwrap();

        assert!(!p.edit(details("2BR apartment"), vec![]));
        assert_eq!(p.status, Status::Available);
        assert!(p.verified);
    }

    #[test]
    fn retains_only_own_images_in_order() {
        let p = property();
        let foreign =
            ImageUrl::new("https://elsewhere.example/x.jpg").unwrap();

        let kept = p.retained_images(&[image(3), foreign, image(1)]);

        assert_eq!(kept, [image(1), image(3)]);
    }

    #[test]
    fn changes_only_listed_statuses() {
        let mut p = property();
        assert!(p.change_status(Status::Rented).is_err());

        p.approve().unwrap();
        p.change_status(Status::Rented).unwrap();
        p.change_status(Status::Available).unwrap();
        assert!(p.change_status(Status::PendingApproval).is_err());
        assert!(p.change_status(Status::Rejected).is_err());
        assert_eq!(p.status, Status::Available);
    }

    #[test]
    fn trims_rejection_reason() {
        assert!(RejectionReason::new("").is_none());
        assert!(RejectionReason::new("   \n\t").is_none());
        assert_eq!(
            RejectionReason::new("  duplicate listing ").unwrap().to_string(),
            "duplicate listing",
        );
    }

    #[test]
    fn parses_kind_and_status() {
        assert_eq!("rent".parse::<Kind>().unwrap(), Kind::Rent);
        assert_eq!(
            "pending_approval".parse::<Status>().unwrap(),
            Status::PendingApproval,
        );
        assert_eq!(Status::PendingApproval.to_string(), "pending_approval");
        assert!("Rent".parse::<Kind>().is_err());
    }

    #[test]
    fn validates_image_url() {
        assert!(ImageUrl::new("https://cdn.example/a.png").is_some());
        assert!(ImageUrl::new("/storage/a.png").is_some());
        assert!(ImageUrl::new("ftp://cdn.example/a.png").is_none());
        assert!(ImageUrl::new("/storage/a b.png").is_none());
    }
}
