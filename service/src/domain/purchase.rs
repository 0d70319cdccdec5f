//! [`ContactPurchase`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf, Money};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{payment, profile, property};

/// Record of a user having paid to unlock the landlord contact of a
/// [`Property`].
///
/// At most one [`ContactPurchase`] exists per [`Key`].
///
/// [`Property`]: property::Property
#[derive(Clone, Debug)]
pub struct ContactPurchase {
    /// ID of this [`ContactPurchase`].
    pub id: Id,

    /// ID of the buying [`Profile`].
    ///
    /// [`Profile`]: profile::Profile
    pub user_id: profile::Id,

    /// ID of the [`Property`] whose contact was unlocked.
    ///
    /// [`Property`]: property::Property
    pub property_id: property::Id,

    /// Paid amount.
    pub amount: Money,

    /// [`payment::Status`] of this [`ContactPurchase`].
    pub payment_status: payment::Status,

    /// Phone number the payment was made from, if known.
    pub phone: Option<payment::Msisdn>,

    /// ID of the [`Payment`] settling this [`ContactPurchase`], unless it was
    /// simulated.
    ///
    /// [`Payment`]: payment::Payment
    pub payment_id: Option<payment::Id>,

    /// [`DateTime`] when this [`ContactPurchase`] was made.
    pub created_at: CreationDateTime,
}

impl ContactPurchase {
    /// Creates a new completed [`ContactPurchase`].
    #[must_use]
    pub fn completed(
        key: Key,
        amount: Money,
        phone: Option<payment::Msisdn>,
        payment_id: Option<payment::Id>,
    ) -> Self {
        Self {
            id: Id::new(),
            user_id: key.user_id,
            property_id: key.property_id,
            amount,
            payment_status: payment::Status::Completed,
            phone,
            payment_id,
            created_at: CreationDateTime::now(),
        }
    }

    /// Returns the [`Key`] of this [`ContactPurchase`].
    #[must_use]
    pub fn key(&self) -> Key {
        Key {
            user_id: self.user_id,
            property_id: self.property_id,
        }
    }
}

/// Unique key of a [`ContactPurchase`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Key {
    /// ID of the buying [`Profile`].
    ///
    /// [`Profile`]: profile::Profile
    pub user_id: profile::Id,

    /// ID of the [`Property`] whose contact is unlocked.
    ///
    /// [`Property`]: property::Property
    pub property_id: property::Id,
}

/// ID of a [`ContactPurchase`].
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

/// [`DateTime`] when a [`ContactPurchase`] was made.
pub type CreationDateTime = DateTimeOf<(ContactPurchase, unit::Creation)>;
