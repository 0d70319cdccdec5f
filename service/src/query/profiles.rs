//! [`Query`] collection related to the multiple [`Profile`]s.

use common::operations::By;

use crate::{domain::Profile, read};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries all the [`Profile`]s, newest first.
pub type List = DatabaseQuery<By<Vec<Profile>, read::profile::list::All>>;
