//! [`Profile`] definitions.

pub mod session;

use std::sync::LazyLock;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use self::session::Session;

/// Marketplace participant, keyed by the identity provider's user ID.
#[derive(Clone, Debug)]
pub struct Profile {
    /// ID of this [`Profile`].
    pub id: Id,

    /// Full [`Name`] of this [`Profile`], if provided.
    pub full_name: Option<Name>,

    /// Contact [`Phone`] of this [`Profile`], if provided.
    pub phone: Option<Phone>,

    /// Contact [`Email`] of this [`Profile`], if provided.
    pub email: Option<Email>,

    /// [`Role`] of this [`Profile`].
    pub role: Role,

    /// [`DateTime`] when this [`Profile`] was created.
    pub created_at: CreationDateTime,
}

impl Profile {
    /// Creates a new [`Role::Tenant`] [`Profile`] without any contact details.
    #[must_use]
    pub fn new(id: Id) -> Self {
        Self {
            id,
            full_name: None,
            phone: None,
            email: None,
            role: Role::default(),
            created_at: CreationDateTime::now(),
        }
    }
}

/// ID of a [`Profile`].
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
    #[doc = "Role of a [`Profile`] on the marketplace."]
    enum Role {
        #[doc = "Browses listings and unlocks landlord contacts."]
        Tenant = "tenant",

        #[doc = "Manages own listings."]
        Landlord = "landlord",

        #[doc = "Moderates listings and administers the marketplace."]
        Admin = "admin",
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Tenant
    }
}

impl Role {
    /// Returns [`Capability`]s granted to this [`Role`].
    #[must_use]
    pub const fn capabilities(self) -> &'static [Capability] {
        use Capability as C;

        match self {
            Self::Tenant => &[C::UnlockContacts],
            Self::Landlord => &[C::UnlockContacts, C::ManageOwnListings],
            Self::Admin => &[
                C::UnlockContacts,
                C::ModerateListings,
                C::ViewDashboard,
                C::AssignRoles,
            ],
        }
    }

    /// Indicates whether this [`Role`] grants the provided [`Capability`].
    #[must_use]
    pub fn can(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

define_kind! {
    #[doc = "Action a [`Role`] may be allowed to perform."]
    enum Capability {
        #[doc = "Paying for and viewing landlord contacts."]
        UnlockContacts = "unlock_contacts",

        #[doc = "Creating and managing own listings."]
        ManageOwnListings = "manage_own_listings",

        #[doc = "Approving, rejecting and verifying any listing."]
        ModerateListings = "moderate_listings",

        #[doc = "Viewing marketplace-wide statistics and records."]
        ViewDashboard = "view_dashboard",

        #[doc = "Changing [`Role`]s of other [`Profile`]s."]
        AssignRoles = "assign_roles",
    }
}

/// Full name of a [`Profile`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `name` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && !name.is_empty() && name.len() <= 512
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Email address of a [`Profile`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Email(String);

impl Email {
    /// Creates a new [`Email`] if the given `address` is valid.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Option<Self> {
        let address = address.into();
        Self::check(&address).then_some(Self(address))
    }

    /// Checks whether the given `address` is a valid [`Email`].
    fn check(address: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Email`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex")
        });

        let address = address.as_ref();
        address.len() <= 320 && REGEX.is_match(address)
    }
}

impl FromStr for Email {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Email`")
    }
}

/// Contact phone number of a [`Profile`].
///
/// Kept as entered by its owner, so only loosely validated.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Phone(String);

impl Phone {
    /// Creates a new [`Phone`] if the given `number` is valid.
    #[must_use]
    pub fn new(number: impl Into<String>) -> Option<Self> {
        let number = number.into();
        Self::check(&number).then_some(Self(number))
    }

    /// Checks whether the given `number` is a valid [`Phone`].
    fn check(number: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Phone`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^\+?\d[\d\s-]{6,18}\d$").expect("valid regex")
        });

        REGEX.is_match(number.as_ref())
    }
}

impl FromStr for Phone {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Phone`")
    }
}

/// [`DateTime`] when a [`Profile`] was created.
pub type CreationDateTime = DateTimeOf<(Profile, unit::Creation)>;

#[cfg(test)]
mod spec {
    use super::{Capability, Email, Phone, Role};

    #[test]
    fn grants_capabilities_by_role() {
        assert!(Role::Tenant.can(Capability::UnlockContacts));
        assert!(!Role::Tenant.can(Capability::ManageOwnListings));

        assert!(Role::Landlord.can(Capability::ManageOwnListings));
        assert!(!Role::Landlord.can(Capability::ModerateListings));

        assert!(Role::Admin.can(Capability::ModerateListings));
        assert!(Role::Admin.can(Capability::ViewDashboard));
        assert!(Role::Admin.can(Capability::AssignRoles));
        assert!(!Role::Admin.can(Capability::ManageOwnListings));
    }

    #[test]
    fn defaults_to_tenant() {
        assert_eq!(Role::default(), Role::Tenant);
    }

    #[test]
    fn validates_phone() {
        assert!(Phone::new("+254 712 345 678").is_some());
        assert!(Phone::new("0712345678").is_some());
        assert!(Phone::new("0712-345-678").is_some());
        assert!(Phone::new("call me").is_none());
        assert!(Phone::new("123").is_none());
    }

    #[test]
    fn validates_email() {
        assert!(Email::new("wanjiku@example.co.ke").is_some());
        assert!(Email::new("wanjiku@localhost").is_none());
        assert!(Email::new("not an email").is_none());
    }
}
