//! [`Payment`]-related definitions.

use common::{DateTime, Money};
use derive_more::{Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::domain;
use uuid::Uuid;

use crate::{api, Context};

/// A mobile-money payment attempt of unlocking a landlord contact.
#[derive(Clone, Debug, From, Into)]
pub struct Payment(domain::Payment);

/// A mobile-money payment attempt of unlocking a landlord contact.
#[graphql_object(context = Context)]
impl Payment {
    /// Unique identifier of this `Payment`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Payment.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// ID of the `Property` whose contact is being paid for.
    pub fn property_id(&self) -> api::property::Id {
        self.0.property_id.into()
    }

    /// Phone number the payment prompt was pushed to.
    pub fn phone(&self) -> String {
        self.0.phone.to_string()
    }

    /// Requested amount.
    pub fn amount(&self) -> Money {
        self.0.amount
    }

    /// Status of this `Payment`.
    pub fn status(&self) -> Status {
        self.0.status.into()
    }

    /// Result code reported by the gateway, once settled by it.
    pub fn result_code(&self) -> Option<i32> {
        self.0.result_code
    }

    /// Human-readable result reported by the gateway, once settled by it.
    pub fn result_description(&self) -> Option<&str> {
        self.0.result_description.as_deref()
    }

    /// Receipt number of the completed payment.
    pub fn receipt(&self) -> Option<String> {
        self.0.receipt.as_ref().map(ToString::to_string)
    }

    /// `DateTime` when this `Payment` was initiated.
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }

    /// `DateTime` when this `Payment` was settled.
    pub fn settled_at(&self) -> Option<DateTime> {
        self.0.settled_at.map(|at| at.coerce())
    }
}

/// Unique identifier of a `Payment`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::payment::Id)]
#[into(domain::payment::Id)]
#[graphql(name = "PaymentId", transparent)]
pub struct Id(Uuid);

/// Status of a `Payment`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "PaymentStatus")]
pub enum Status {
    /// Prompt is pushed and the gateway result is awaited.
    AwaitingCallback,

    /// Payment went through.
    Completed,

    /// Payment was declined, cancelled or timed out at the gateway.
    Failed,

    /// Gateway result never arrived in time.
    Expired,
}

impl From<domain::payment::Status> for Status {
    fn from(status: domain::payment::Status) -> Self {
        use domain::payment::Status as S;
        match status {
            S::AwaitingCallback => Self::AwaitingCallback,
            S::Completed => Self::Completed,
            S::Failed => Self::Failed,
            S::Expired => Self::Expired,
        }
    }
}
