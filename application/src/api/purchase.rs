//! [`ContactPurchase`]-related definitions.

use common::{DateTime, Money};
use derive_more::{Display, From, Into};
use juniper::{graphql_object, GraphQLScalar};
use service::{domain, read};
use uuid::Uuid;

use crate::{api, Context};

/// A record of a user having paid to unlock a landlord contact, as listed on
/// the admin dashboard.
#[derive(Clone, Debug, From, Into)]
pub struct ContactPurchase(read::purchase::Listed);

/// A record of a user having paid to unlock a landlord contact.
#[graphql_object(context = Context)]
impl ContactPurchase {
    /// Unique identifier of this `ContactPurchase`.
    pub fn id(&self) -> Id {
        self.0.purchase.id.into()
    }

    /// ID of the buying user.
    pub fn user_id(&self) -> api::profile::Id {
        self.0.purchase.user_id.into()
    }

    /// ID of the `Property` whose contact was unlocked.
    pub fn property_id(&self) -> api::property::Id {
        self.0.purchase.property_id.into()
    }

    /// Title of the `Property` whose contact was unlocked, unless it's been
    /// deleted since.
    pub fn property_title(&self) -> Option<api::property::Title> {
        self.0.property_title.clone().map(Into::into)
    }

    /// Full name of the buyer, if known.
    pub fn buyer_name(&self) -> Option<api::profile::Name> {
        self.0.buyer_name.clone().map(Into::into)
    }

    /// Paid amount.
    pub fn amount(&self) -> Money {
        self.0.purchase.amount
    }

    /// Status of the payment behind this `ContactPurchase`.
    pub fn payment_status(&self) -> api::payment::Status {
        self.0.purchase.payment_status.into()
    }

    /// Phone number the payment was made from, if known.
    pub fn phone(&self) -> Option<String> {
        self.0.purchase.phone.as_ref().map(ToString::to_string)
    }

    /// ID of the `Payment` behind this `ContactPurchase`, unless it was
    /// simulated.
    pub fn payment_id(&self) -> Option<api::payment::Id> {
        self.0.purchase.payment_id.map(Into::into)
    }

    /// `DateTime` when this `ContactPurchase` was made.
    pub fn created_at(&self) -> DateTime {
        self.0.purchase.created_at.coerce()
    }
}

/// Unique identifier of a `ContactPurchase`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::purchase::Id)]
#[into(domain::purchase::Id)]
#[graphql(name = "ContactPurchaseId", transparent)]
pub struct Id(Uuid);
