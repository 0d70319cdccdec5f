//! [`ContactPurchase`] read model definitions.

use crate::domain::{profile, property, ContactPurchase};

/// Indicator whether a [`ContactPurchase`] exists for a [`purchase::Key`].
///
/// [`purchase::Key`]: crate::domain::purchase::Key
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IsPurchased(pub bool);

/// [`ContactPurchase`] as listed on the admin dashboard.
#[derive(Clone, Debug)]
pub struct Listed {
    /// Listed [`ContactPurchase`] itself.
    pub purchase: ContactPurchase,

    /// [`property::Title`] of the purchased property, unless it's been deleted
    /// since.
    pub property_title: Option<property::Title>,

    /// [`profile::Name`] of the buyer, if known.
    pub buyer_name: Option<profile::Name>,
}
