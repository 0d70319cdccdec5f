//! [`Query`] collection related to the multiple [`ContactPurchase`]s.

use common::operations::By;

use crate::read;
#[cfg(doc)]
use crate::{domain::ContactPurchase, Query};

use super::DatabaseQuery;

/// Queries all the [`ContactPurchase`]s along with their property titles and
/// buyer names, newest first.
pub type List = DatabaseQuery<By<Vec<read::purchase::Listed>, ()>>;
