//! GraphQL [`Mutation`]s definitions.

use juniper::graphql_object;
use service::{command, Command as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Creates or updates the `Profile` of the current user.
    ///
    /// Never changes the `ProfileRole`.
    #[tracing::instrument(
        skip_all,
        fields(
            email = ?email,
            full_name = ?full_name,
            gql.name = "upsertMyProfile",
            otel.name = Self::SPAN_NAME,
            phone = ?phone,
        ),
    )]
    pub async fn upsert_my_profile(
        full_name: Option<api::profile::Name>,
        phone: Option<api::profile::Phone>,
        email: Option<api::profile::Email>,
        ctx: &Context,
    ) -> Result<api::Profile, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::UpsertProfile {
                user_id: my_id.into(),
                full_name: full_name.map(Into::into),
                phone: phone.map(Into::into),
                email: email.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Assigns the provided `ProfileRole` to the user with the provided ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `ASSIGN_ROLES_REQUIRED` - the current user is not an admin.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "assignRole",
            otel.name = Self::SPAN_NAME,
            role = ?role,
            user_id = %user_id,
        ),
    )]
    pub async fn assign_role(
        user_id: api::profile::Id,
        role: api::profile::Role,
        ctx: &Context,
    ) -> Result<api::Profile, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::AssignRole {
                initiator_id: my_id.into(),
                user_id: user_id.into(),
                role: role.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Creates a new `Property` of the current landlord, submitting it for
    /// moderation.
    ///
    /// Images failing to upload are skipped and counted in the result.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `MANAGE_OWN_LISTINGS_REQUIRED` - the current user is not a landlord;
    /// - `INVALID_ROOMS`, `INVALID_AREA`, `TOO_MANY_AMENITIES` - the provided
    ///   `input` is invalid.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createProperty",
            images = images.as_ref().map_or(0, Vec::len),
            otel.name = Self::SPAN_NAME,
            title = %input.title,
        ),
    )]
    pub async fn create_property(
        input: api::property::Input,
        images: Option<Vec<api::property::ImageInput>>,
        ctx: &Context,
    ) -> Result<api::property::SaveResult, Error> {
        let my_id = ctx.current_session().await?.user_id;
        let details = input.into_details().map_err(ctx.error())?;

        ctx.service()
            .execute(command::CreateProperty {
                landlord_id: my_id.into(),
                details,
                images: images
                    .unwrap_or_default()
                    .into_iter()
                    .map(Into::into)
                    .collect(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Updates the `Property` of the current landlord.
    ///
    /// Final images are the `keepImages` still present on the `Property`, in
    /// their current order, followed by the newly uploaded `images`. Editing
    /// a `REJECTED` `Property` resubmits it for moderation.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `PROPERTY_NOT_EXISTS` - the `Property` doesn't exist;
    /// - `NOT_PROPERTY_OWNER` - the `Property` belongs to another landlord;
    /// - `INVALID_ROOMS`, `INVALID_AREA`, `TOO_MANY_AMENITIES` - the provided
    ///   `input` is invalid.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "updateProperty",
            id = %id,
            images = images.as_ref().map_or(0, Vec::len),
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn update_property(
        id: api::property::Id,
        input: api::property::Input,
        keep_images: Option<Vec<api::property::ImageUrl>>,
        images: Option<Vec<api::property::ImageInput>>,
        ctx: &Context,
    ) -> Result<api::property::SaveResult, Error> {
        let my_id = ctx.current_session().await?.user_id;
        let details = input.into_details().map_err(ctx.error())?;

        ctx.service()
            .execute(command::UpdateProperty {
                landlord_id: my_id.into(),
                property_id: id.into(),
                details,
                keep_images: keep_images
                    .unwrap_or_default()
                    .into_iter()
                    .map(Into::into)
                    .collect(),
                images: images
                    .unwrap_or_default()
                    .into_iter()
                    .map(Into::into)
                    .collect(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Deletes the `Property` of the current landlord, returning it.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `PROPERTY_NOT_EXISTS` - the `Property` doesn't exist;
    /// - `NOT_PROPERTY_OWNER` - the `Property` belongs to another landlord.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "deleteProperty",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn delete_property(
        id: api::property::Id,
        ctx: &Context,
    ) -> Result<api::Property, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::DeleteProperty {
                landlord_id: my_id.into(),
                property_id: id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Switches the `Property` of the current landlord between `AVAILABLE`,
    /// `RENTED` and `SOLD`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `PROPERTY_NOT_EXISTS` - the `Property` doesn't exist;
    /// - `NOT_PROPERTY_OWNER` - the `Property` belongs to another landlord;
    /// - `INVALID_STATUS_TRANSITION` - the `Property` hasn't been approved
    ///   yet, or the requested status is a moderation one.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "changePropertyStatus",
            id = %id,
            otel.name = Self::SPAN_NAME,
            status = ?status,
        ),
    )]
    pub async fn change_property_status(
        id: api::property::Id,
        status: api::property::Status,
        ctx: &Context,
    ) -> Result<api::Property, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::ChangePropertyStatus {
                landlord_id: my_id.into(),
                property_id: id.into(),
                status: status.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Approves the `Property`, making it `AVAILABLE` and verified at once.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `MODERATE_LISTINGS_REQUIRED` - the current user is not an admin;
    /// - `PROPERTY_NOT_EXISTS` - the `Property` doesn't exist;
    /// - `INVALID_STATUS_TRANSITION` - the `Property` is neither
    ///   `PENDING_APPROVAL` nor `REJECTED`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "approveProperty",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn approve_property(
        id: api::property::Id,
        ctx: &Context,
    ) -> Result<api::Property, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::ApproveProperty {
                initiator_id: my_id.into(),
                property_id: id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Rejects the `Property` with the provided `reason`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `MODERATE_LISTINGS_REQUIRED` - the current user is not an admin;
    /// - `PROPERTY_NOT_EXISTS` - the `Property` doesn't exist;
    /// - `EMPTY_REJECTION_REASON` - the `reason` is blank.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "rejectProperty",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn reject_property(
        id: api::property::Id,
        reason: String,
        ctx: &Context,
    ) -> Result<api::Property, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::RejectProperty {
                initiator_id: my_id.into(),
                property_id: id.into(),
                reason,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Sets the verification mark of the `Property`, regardless of its
    /// status.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `MODERATE_LISTINGS_REQUIRED` - the current user is not an admin;
    /// - `PROPERTY_NOT_EXISTS` - the `Property` doesn't exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "setPropertyVerified",
            id = %id,
            otel.name = Self::SPAN_NAME,
            verified = verified,
        ),
    )]
    pub async fn set_property_verified(
        id: api::property::Id,
        verified: bool,
        ctx: &Context,
    ) -> Result<api::Property, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::SetPropertyVerification {
                initiator_id: my_id.into(),
                property_id: id.into(),
                verified,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Unlocks the landlord contact of the `Property` without a real payment.
    ///
    /// Only available when payments are simulated.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `PAYMENTS_NOT_SIMULATED` - a real payment is required;
    /// - `PROPERTY_NOT_EXISTS` - the `Property` doesn't exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "purchaseContact",
            otel.name = Self::SPAN_NAME,
            property_id = %property_id,
        ),
    )]
    pub async fn purchase_contact(
        property_id: api::property::Id,
        ctx: &Context,
    ) -> Result<api::Property, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::PurchaseContact {
                user_id: my_id.into(),
                property_id: property_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

define_error! {
    enum PropertyError {
        #[code = "PROPERTY_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Property` with the provided ID does not exist"]
        NotExists,

        #[code = "NOT_PROPERTY_OWNER"]
        #[status = FORBIDDEN]
        #[message = "`Property` is owned by another landlord"]
        NotOwner,

        #[code = "INVALID_STATUS_TRANSITION"]
        #[status = CONFLICT]
        #[message = "`Property` cannot be moved into the requested status"]
        InvalidTransition,
    }
}

impl AsError for command::upsert_profile::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::assign_role::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Forbidden(c) => Some(api::forbidden(*c)),
        }
    }
}

impl AsError for command::create_property::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Forbidden(c) => Some(api::forbidden(*c)),
        }
    }
}

impl AsError for command::update_property::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NotOwner(_) => Some(PropertyError::NotOwner.into()),
            Self::PropertyNotExists(_) => Some(PropertyError::NotExists.into()),
        }
    }
}

impl AsError for command::delete_property::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NotOwner(_) => Some(PropertyError::NotOwner.into()),
            Self::PropertyNotExists(_) => Some(PropertyError::NotExists.into()),
        }
    }
}

impl AsError for command::change_property_status::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NotOwner(_) => Some(PropertyError::NotOwner.into()),
            Self::PropertyNotExists(_) => Some(PropertyError::NotExists.into()),
            Self::Transition(_) => {
                Some(PropertyError::InvalidTransition.into())
            }
        }
    }
}

impl AsError for command::approve_property::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Forbidden(c) => Some(api::forbidden(*c)),
            Self::PropertyNotExists(_) => Some(PropertyError::NotExists.into()),
            Self::Transition(_) => {
                Some(PropertyError::InvalidTransition.into())
            }
        }
    }
}

impl AsError for command::reject_property::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "EMPTY_REJECTION_REASON"]
                #[status = BAD_REQUEST]
                #[message = "Rejection reason must not be empty"]
                EmptyRejectionReason,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::EmptyRejectionReason => {
                Some(Error::EmptyRejectionReason.into())
            }
            Self::Forbidden(c) => Some(api::forbidden(*c)),
            Self::PropertyNotExists(_) => Some(PropertyError::NotExists.into()),
        }
    }
}

impl AsError for command::set_property_verification::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Forbidden(c) => Some(api::forbidden(*c)),
            Self::PropertyNotExists(_) => Some(PropertyError::NotExists.into()),
        }
    }
}

impl AsError for command::purchase_contact::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "PAYMENTS_NOT_SIMULATED"]
                #[status = FORBIDDEN]
                #[message = "Contacts can only be unlocked with a real payment"]
                PaymentsNotSimulated,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::PaymentsNotSimulated => {
                Some(Error::PaymentsNotSimulated.into())
            }
            Self::PropertyNotExists(_) => Some(PropertyError::NotExists.into()),
        }
    }
}
