//! [`Query`] collection related to a single [`ContactPurchase`].

use common::operations::By;

#[cfg(doc)]
use crate::{domain::ContactPurchase, Query};
use crate::{domain::purchase, read};

use super::DatabaseQuery;

/// Queries whether a [`ContactPurchase`] exists for a [`purchase::Key`].
pub type IsPurchased =
    DatabaseQuery<By<read::purchase::IsPurchased, purchase::Key>>;
