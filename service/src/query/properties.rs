//! [`Query`] collection related to the multiple [`Property`]s.

use common::operations::By;

use crate::{domain::Property, read};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a list of [`Property`]s, newest first.
pub type List = DatabaseQuery<By<Vec<Property>, read::property::list::Selector>>;

/// Number of [`Property`]s featured on the home page.
pub const FEATURED_LIMIT: usize = 6;
