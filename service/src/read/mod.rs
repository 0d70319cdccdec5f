//! Read entities definitions.

pub mod dashboard;
pub mod payment;
pub mod profile;
pub mod property;
pub mod purchase;
