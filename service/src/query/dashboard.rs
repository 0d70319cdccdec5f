//! [`Query`] collection related to the admin dashboard.

use common::operations::By;

use crate::read;
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries marketplace-wide [`read::dashboard::Stats`].
pub type Stats = DatabaseQuery<By<read::dashboard::Stats, ()>>;
