//! GraphQL [`Query`]s definitions.

use juniper::graphql_object;
use service::{
    domain::profile::{self, Capability},
    query, read, Query as _,
};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the `Profile` of the currently authenticated user, if it's
    /// filled.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "myProfile",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn my_profile(
        ctx: &Context,
    ) -> Result<Option<api::Profile>, Error> {
        let my_id = ctx.current_session().await?.user_id;
        Self::profile(my_id, ctx).await
    }

    /// Returns the `Profile` with the specified ID.
    ///
    /// Contact details are only visible to the owner and moderators.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "profile",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn profile(
        id: api::profile::Id,
        ctx: &Context,
    ) -> Result<Option<api::Profile>, Error> {
        ctx.service()
            .execute(query::profile::ById::by(id.into()))
            .await
            .map(|p| p.map(Into::into))
            .map_err(AsError::into_error)
            .map_err(ctx.error())
    }

    /// Lists all the `Profile`s, newest first.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `MODERATE_LISTINGS_REQUIRED` - the current user is not an admin.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "profiles",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn profiles(ctx: &Context) -> Result<Vec<api::Profile>, Error> {
        _ = ctx.require(Capability::ModerateListings).await?;

        ctx.service()
            .execute(query::profiles::List::by(read::profile::list::All))
            .await
            .map(|list| list.into_iter().map(Into::into).collect())
            .map_err(AsError::into_error)
            .map_err(ctx.error())
    }

    /// Lists the publicly available `Property`s, newest first.
    ///
    /// Filters compose: a `Property` must match all of the provided ones.
    /// `priceRange` is a bracket token like `50000-100000`, or an open-ended
    /// `500000`, or `all`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_PRICE_RANGE` - the provided `priceRange` is malformed.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "properties",
            kind = ?kind,
            otel.name = Self::SPAN_NAME,
            price_range = ?price_range,
            search = ?search,
        ),
    )]
    pub async fn properties(
        search: Option<String>,
        kind: Option<api::property::Kind>,
        price_range: Option<String>,
        ctx: &Context,
    ) -> Result<Vec<api::Property>, Error> {
        use read::property::catalog;

        let price = price_range
            .as_deref()
            .unwrap_or_default()
            .parse::<catalog::PriceRange>()
            .map_err(|_| CatalogError::InvalidPriceRange.into())
            .map_err(ctx.error())?;

        Self::catalog(
            read::property::list::Selector::Catalog {
                filter: catalog::Filter {
                    search: search.and_then(catalog::Search::new),
                    kind: kind.map(Into::into),
                    price,
                },
                limit: None,
            },
            ctx,
        )
        .await
    }

    /// Lists the newest publicly available `Property`s for the home page.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "featuredProperties",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn featured_properties(
        ctx: &Context,
    ) -> Result<Vec<api::Property>, Error> {
        Self::catalog(
            read::property::list::Selector::Catalog {
                filter: read::property::catalog::Filter::default(),
                limit: Some(query::properties::FEATURED_LIMIT),
            },
            ctx,
        )
        .await
    }

    /// Returns the `Property` with the specified ID.
    ///
    /// Non-`AVAILABLE` `Property`s are only visible to their landlords and
    /// moderators, and are `null` to anyone else.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "property",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn property(
        id: api::property::Id,
        ctx: &Context,
    ) -> Result<Option<api::Property>, Error> {
        let viewer_id =
            ctx.try_current_session().await?.map(|s| s.user_id.into());

        ctx.service()
            .execute(query::property::Visible {
                viewer_id,
                property_id: id.into(),
            })
            .await
            .map(|p| p.map(Into::into))
            .map_err(AsError::into_error)
            .map_err(ctx.error())
    }

    /// Lists the `Property`s of the current landlord in any status, newest
    /// first.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `MANAGE_OWN_LISTINGS_REQUIRED` - the current user is not a landlord.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "myProperties",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn my_properties(
        ctx: &Context,
    ) -> Result<Vec<api::Property>, Error> {
        let my_id = ctx.require(Capability::ManageOwnListings).await?;

        Self::catalog(read::property::list::Selector::OwnedBy(my_id), ctx)
            .await
    }

    /// Lists all the `Property`s in any status, newest first.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `MODERATE_LISTINGS_REQUIRED` - the current user is not an admin.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "allProperties",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn all_properties(
        ctx: &Context,
    ) -> Result<Vec<api::Property>, Error> {
        _ = ctx.require(Capability::ModerateListings).await?;

        Self::catalog(read::property::list::Selector::All, ctx).await
    }

    /// Lists all the `ContactPurchase`s, newest first.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `VIEW_DASHBOARD_REQUIRED` - the current user is not an admin.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "contactPurchases",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn contact_purchases(
        ctx: &Context,
    ) -> Result<Vec<api::purchase::ContactPurchase>, Error> {
        _ = ctx.require(Capability::ViewDashboard).await?;

        ctx.service()
            .execute(query::purchases::List::by(()))
            .await
            .map(|list| list.into_iter().map(Into::into).collect())
            .map_err(AsError::into_error)
            .map_err(ctx.error())
    }

    /// Returns the marketplace-wide statistics.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `VIEW_DASHBOARD_REQUIRED` - the current user is not an admin.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "dashboardStats",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn dashboard_stats(
        ctx: &Context,
    ) -> Result<api::dashboard::Stats, Error> {
        _ = ctx.require(Capability::ViewDashboard).await?;

        ctx.service()
            .execute(query::dashboard::Stats::by(()))
            .await
            .map(Into::into)
            .map_err(AsError::into_error)
            .map_err(ctx.error())
    }

    /// Returns the `Payment` attempt of the current user with the specified
    /// ID.
    ///
    /// `null` if it doesn't exist or belongs to another user.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "payment",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn payment(
        id: api::payment::Id,
        ctx: &Context,
    ) -> Result<Option<api::Payment>, Error> {
        let my_id: profile::Id = ctx.current_session().await?.user_id.into();

        ctx.service()
            .execute(query::payment::ById::by(id.into()))
            .await
            .map(|p| p.filter(|p| p.user_id == my_id).map(Into::into))
            .map_err(AsError::into_error)
            .map_err(ctx.error())
    }
}

impl Query {
    /// Lists the `Property`s selected by the provided
    /// [`read::property::list::Selector`].
    async fn catalog(
        selector: read::property::list::Selector,
        ctx: &Context,
    ) -> Result<Vec<api::Property>, Error> {
        ctx.service()
            .execute(query::properties::List::by(selector))
            .await
            .map(|list| list.into_iter().map(Into::into).collect())
            .map_err(AsError::into_error)
            .map_err(ctx.error())
    }
}

define_error! {
    enum CatalogError {
        #[code = "INVALID_PRICE_RANGE"]
        #[status = BAD_REQUEST]
        #[message = "Invalid price range"]
        InvalidPriceRange,
    }
}
