//! GraphQL API definitions.

pub mod dashboard;
mod mutation;
pub mod payment;
pub mod profile;
pub mod property;
pub mod purchase;
mod query;
pub mod scalar;
mod subscription;

use service::domain;

use crate::{define_error, Error};

pub use self::{
    mutation::Mutation, payment::Payment, profile::Profile, property::Property,
    query::Query, subscription::Subscription,
};

/// GraphQL schema.
pub type Schema = juniper::RootNode<'static, Query, Mutation, Subscription>;

/// Returns an [`Error`] of the current user lacking the provided
/// [`domain::profile::Capability`].
#[must_use]
pub fn forbidden(capability: domain::profile::Capability) -> Error {
    use domain::profile::Capability as C;

    match capability {
        C::UnlockContacts => PrivilegeError::UnlockContacts,
        C::ManageOwnListings => PrivilegeError::ManageOwnListings,
        C::ModerateListings => PrivilegeError::ModerateListings,
        C::ViewDashboard => PrivilegeError::ViewDashboard,
        C::AssignRoles => PrivilegeError::AssignRoles,
    }
    .into()
}

define_error! {
    enum PrivilegeError {
        #[code = "UNLOCK_CONTACTS_REQUIRED"]
        #[status = FORBIDDEN]
        #[message = "Authenticated user must be allowed to unlock contacts"]
        UnlockContacts,

        #[code = "MANAGE_OWN_LISTINGS_REQUIRED"]
        #[status = FORBIDDEN]
        #[message = "Authenticated user must be a landlord"]
        ManageOwnListings,

        #[code = "MODERATE_LISTINGS_REQUIRED"]
        #[status = FORBIDDEN]
        #[message = "Authenticated user must be allowed to moderate listings"]
        ModerateListings,

        #[code = "VIEW_DASHBOARD_REQUIRED"]
        #[status = FORBIDDEN]
        #[message = "Authenticated user must be allowed to view the dashboard"]
        ViewDashboard,

        #[code = "ASSIGN_ROLES_REQUIRED"]
        #[status = FORBIDDEN]
        #[message = "Authenticated user must be allowed to assign roles"]
        AssignRoles,
    }
}
