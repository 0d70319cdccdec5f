//! [`Profile`]-related definitions.

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::domain;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    Context, Error,
};

/// A [`Profile`] of a marketplace participant.
#[derive(Clone, Debug, From, Into)]
pub struct Profile(domain::Profile);

impl Profile {
    /// Indicates whether the current user may see the contact details of this
    /// [`Profile`].
    ///
    /// Only the owner of this [`Profile`] and moderators may.
    async fn reveals_contact(&self, ctx: &Context) -> Result<bool, Error> {
        let Some(session) = ctx.try_current_session().await? else {
            return Ok(false);
        };
        let my_id: domain::profile::Id = session.user_id.into();
        if my_id == self.0.id {
            return Ok(true);
        }
        Ok(ctx
            .role_of(my_id)
            .await?
            .can(domain::profile::Capability::ModerateListings))
    }
}

/// A `Profile` of a marketplace participant.
#[graphql_object(context = Context)]
impl Profile {
    /// Unique identifier of this `Profile`, issued by the identity provider.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Profile.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// Full name of this `Profile`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Profile.fullName",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn full_name(&self) -> Option<Name> {
        self.0.full_name.clone().map(Into::into)
    }

    /// Contact phone of this `Profile`.
    ///
    /// Visible only to the owner of this `Profile` and moderators.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Profile.phone",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn phone(&self, ctx: &Context) -> Result<Option<Phone>, Error> {
        Ok(self
            .reveals_contact(ctx)
            .await?
            .then(|| self.0.phone.clone().map(Into::into))
            .flatten())
    }

    /// Contact email of this `Profile`.
    ///
    /// Visible only to the owner of this `Profile` and moderators.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Profile.email",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn email(&self, ctx: &Context) -> Result<Option<Email>, Error> {
        Ok(self
            .reveals_contact(ctx)
            .await?
            .then(|| self.0.email.clone().map(Into::into))
            .flatten())
    }

    /// `Role` of this `Profile`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Profile.role",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn role(&self) -> Role {
        self.0.role.into()
    }

    /// `DateTime` when this `Profile` was created.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Profile.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }
}

/// Unique identifier of a `Profile`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::profile::Id)]
#[into(domain::profile::Id)]
#[graphql(name = "ProfileId", transparent)]
pub struct Id(Uuid);

/// Full name of a `Profile`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ProfileName",
    with = scalar::Via::<domain::profile::Name>,
)]
pub struct Name(domain::profile::Name);

/// Contact phone of a `Profile`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ProfilePhone",
    with = scalar::Via::<domain::profile::Phone>,
)]
pub struct Phone(domain::profile::Phone);

/// Contact email of a `Profile`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ProfileEmail",
    with = scalar::Via::<domain::profile::Email>,
)]
pub struct Email(domain::profile::Email);

/// Role of a `Profile` on the marketplace.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "ProfileRole")]
pub enum Role {
    /// Browses listings and unlocks landlord contacts.
    Tenant,

    /// Manages own listings.
    Landlord,

    /// Moderates listings and administers the marketplace.
    Admin,
}

impl From<domain::profile::Role> for Role {
    fn from(role: domain::profile::Role) -> Self {
        use domain::profile::Role as R;
        match role {
            R::Tenant => Self::Tenant,
            R::Landlord => Self::Landlord,
            R::Admin => Self::Admin,
        }
    }
}

impl From<Role> for domain::profile::Role {
    fn from(role: Role) -> Self {
        match role {
            Role::Tenant => Self::Tenant,
            Role::Landlord => Self::Landlord,
            Role::Admin => Self::Admin,
        }
    }
}
