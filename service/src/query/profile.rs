//! [`Query`] collection related to a single [`Profile`].

use common::operations::By;

use crate::domain::{profile, Profile};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`Profile`] by its [`profile::Id`].
pub type ById = DatabaseQuery<By<Option<Profile>, profile::Id>>;
