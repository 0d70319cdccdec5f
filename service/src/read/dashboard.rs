//! Dashboard read model definitions.

use common::Money;

/// Marketplace-wide statistics shown on the admin dashboard.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Stats {
    /// Total number of properties, regardless of their status.
    pub total_properties: i64,

    /// Total number of profiles.
    pub total_profiles: i64,

    /// Sum of all contact purchase amounts.
    pub total_revenue: Money,

    /// Number of properties awaiting moderation.
    pub pending_approval: i64,
}
