//! Domain definitions.

pub mod payment;
pub mod profile;
pub mod property;
pub mod purchase;

pub use self::{
    payment::Payment, profile::Profile, property::Property,
    purchase::ContactPurchase,
};
