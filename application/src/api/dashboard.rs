//! Admin dashboard definitions.

use common::Money;
use derive_more::From;
use juniper::graphql_object;
use service::read;

use crate::Context;

/// Marketplace-wide statistics.
#[derive(Clone, Copy, Debug, From)]
pub struct Stats(read::dashboard::Stats);

/// Saturates the provided `count` into a GraphQL `Int`.
fn int(count: i64) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

/// Marketplace-wide statistics.
#[graphql_object(name = "DashboardStats", context = Context)]
impl Stats {
    /// Total number of `Property`s, regardless of their status.
    pub fn total_properties(&self) -> i32 {
        int(self.0.total_properties)
    }

    /// Total number of `Profile`s.
    pub fn total_profiles(&self) -> i32 {
        int(self.0.total_profiles)
    }

    /// Sum of all the `ContactPurchase` amounts.
    pub fn total_revenue(&self) -> Money {
        self.0.total_revenue
    }

    /// Number of `Property`s awaiting moderation.
    pub fn pending_approval(&self) -> i32 {
        int(self.0.pending_approval)
    }
}
