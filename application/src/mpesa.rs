//! REST endpoints of the [M-Pesa] payment flow.
//!
//! [M-Pesa]: https://developer.safaricom.co.ke

use std::fmt;

use axum::{
    extract::{rejection::JsonRejection, Query},
    Extension, Json,
};
use common::Money;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use service::{
    command::{self, Command},
    domain::{payment, profile, property},
};
use tracing as log;

use crate::{define_error, AsError, Context, Error};

/// Body of a [`stk_push()`] request.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StkPushRequest {
    /// Phone number to prompt for the payment.
    pub phone: Option<String>,

    /// Amount to pay, in Kenyan shillings.
    pub amount: Option<Amount>,

    /// ID of the `Property` whose landlord contact is being unlocked.
    pub property_id: Option<String>,
}

/// Amount of a [`StkPushRequest`], accepted both as a JSON number and a
/// string.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    /// JSON number.
    Number(serde_json::Number),

    /// JSON string.
    Text(String),
}

impl Amount {
    /// Parses this [`Amount`] into [`Money`].
    fn to_money(&self) -> Option<Money> {
        match self {
            Self::Number(n) => n.to_string().parse().ok(),
            Self::Text(s) => s.parse().ok(),
        }
    }
}

impl StkPushRequest {
    /// Validates this [`StkPushRequest`] into the
    /// [`command::InitiatePayment`] of the provided user.
    fn into_command(
        self,
        user_id: profile::Id,
    ) -> Result<command::InitiatePayment, Error> {
        let (Some(phone), Some(amount), Some(property_id)) =
            (self.phone, self.amount, self.property_id)
        else {
            return Err(StkPushError::MissingFields.into());
        };

        Ok(command::InitiatePayment {
            user_id,
            phone: payment::Msisdn::normalize(&phone)
                .ok_or(StkPushError::InvalidPhone)?,
            amount: amount.to_money().ok_or(StkPushError::InvalidAmount)?,
            property_id: property_id
                .trim()
                .parse::<property::Id>()
                .map_err(|_| StkPushError::InvalidPropertyId)?,
        })
    }
}

/// Prompts the current user to pay for unlocking a landlord contact.
///
/// Responds with the payload accepted by the gateway, extended with the
/// `paymentId` to follow the payment by.
///
/// # Errors
///
/// Possible error codes:
/// - `AUTHORIZATION_REQUIRED` - the request carries no valid bearer token;
/// - `INVALID_BODY` - the body is not a JSON object;
/// - `MISSING_FIELDS` - `phone`, `amount` or `propertyId` is missing;
/// - `INVALID_PHONE` - `phone` is not a Kenyan mobile number;
/// - `INVALID_AMOUNT` - `amount` is not a positive whole number;
/// - `INSUFFICIENT_AMOUNT` - `amount` is below the contact price;
/// - `INVALID_PROPERTY_ID` - `propertyId` is not a valid ID;
/// - `PROPERTY_NOT_EXISTS` - the `Property` doesn't exist;
/// - `PROPERTY_NOT_AVAILABLE` - the `Property` is not publicly listed;
/// - `INTERNAL_SERVER_ERROR` - the gateway failed, with its raw response in
///   `details`.
#[tracing::instrument(skip_all, fields(otel.name = "POST /api/mpesa/stkpush"))]
pub async fn stk_push(
    ctx: Context,
    body: Result<Json<StkPushRequest>, JsonRejection>,
) -> Result<Json<JsonValue>, Error> {
    let my_id = ctx.current_session().await?.user_id.into();
    let Json(req) = body.map_err(|e| {
        log::debug!("malformed STK push request: {e}");
        Error::from(StkPushError::InvalidBody)
    })?;
    let cmd = req.into_command(my_id)?;

    let command::initiate_payment::Initiated { payment, payload } = ctx
        .service()
        .execute(cmd)
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(with_payment_id(payload, payment.id)))
}

/// Query parameters the gateway callback URL is signed with.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CallbackParams {
    /// ID of the `Payment` the callback is addressed to.
    pub payment: Option<String>,

    /// Signature of the `payment` ID.
    pub signature: Option<String>,
}

/// Accepts the result of a payment from the gateway.
///
/// Always responds with `{"success": true}`, as the gateway cannot act on
/// failures. Rejected callbacks are logged.
#[tracing::instrument(skip_all, fields(otel.name = "POST /api/mpesa/callback"))]
pub async fn callback<S>(
    Extension(service): Extension<S>,
    Query(params): Query<CallbackParams>,
    body: Result<Json<JsonValue>, JsonRejection>,
) -> Json<JsonValue>
where
    S: Command<command::SettlePayment>,
    S::Err: fmt::Display,
{
    if let Err(e) = settle(&service, params, body).await {
        log::warn!("payment callback rejected: {e}");
    }
    Json(json!({"success": true}))
}

/// Settles the `Payment` addressed by the provided callback.
async fn settle<S>(
    service: &S,
    CallbackParams { payment, signature }: CallbackParams,
    body: Result<Json<JsonValue>, JsonRejection>,
) -> Result<(), String>
where
    S: Command<command::SettlePayment>,
    S::Err: fmt::Display,
{
    let Json(body) = body.map_err(|e| format!("malformed body: {e}"))?;
    let callback = payment::Callback::parse(&body)
        .map_err(|e| format!("malformed callback: {e}"))?;
    let payment_id = payment
        .as_deref()
        .and_then(|id| id.parse::<payment::Id>().ok())
        .ok_or_else(|| "missing or invalid `payment` parameter".to_owned())?;

    _ = service
        .execute(command::SettlePayment {
            payment_id,
            signature: signature.unwrap_or_default(),
            callback,
        })
        .await
        .map_err(|e| e.to_string())?;
    Ok(())
}

/// Merges the provided `payment_id` into the gateway `payload`.
///
/// Non-object payloads are wrapped into a `response` field.
fn with_payment_id(payload: JsonValue, payment_id: payment::Id) -> JsonValue {
    let mut payload = match payload {
        JsonValue::Object(_) => payload,
        other => json!({"response": other}),
    };
    payload["paymentId"] = json!(payment_id.to_string());
    payload
}

define_error! {
    enum StkPushError {
        #[code = "INVALID_BODY"]
        #[status = BAD_REQUEST]
        #[message = "Request body must be a JSON object"]
        InvalidBody,

        #[code = "MISSING_FIELDS"]
        #[status = BAD_REQUEST]
        #[message = "Missing required fields: phone, amount, propertyId"]
        MissingFields,

        #[code = "INVALID_PHONE"]
        #[status = BAD_REQUEST]
        #[message = "Invalid phone number format. Use 07XXXXXXXX or 2547XXXXXXXX"]
        InvalidPhone,

        #[code = "INVALID_AMOUNT"]
        #[status = BAD_REQUEST]
        #[message = "Amount must be a positive whole number"]
        InvalidAmount,

        #[code = "INVALID_PROPERTY_ID"]
        #[status = BAD_REQUEST]
        #[message = "Invalid `propertyId`"]
        InvalidPropertyId,
    }
}

impl AsError for command::initiate_payment::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "INSUFFICIENT_AMOUNT"]
                #[status = BAD_REQUEST]
                #[message = "Amount is below the contact price"]
                InsufficientAmount,

                #[code = "PROPERTY_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Property` with the provided ID does not exist"]
                PropertyNotExists,

                #[code = "PROPERTY_NOT_AVAILABLE"]
                #[status = CONFLICT]
                #[message = "`Property` is not available"]
                PropertyNotAvailable,
            }
        }

        match self {
            Self::InvalidAmount(_) => Some(StkPushError::InvalidAmount.into()),
            Self::InsufficientAmount(_) => {
                Some(Error::InsufficientAmount.into())
            }
            Self::PropertyNotExists(_) => Some(Error::PropertyNotExists.into()),
            Self::PropertyNotAvailable(_) => {
                Some(Error::PropertyNotAvailable.into())
            }
            Self::Gateway(e) => Some(
                crate::Error::internal(&e).with_details(e.payload().cloned()),
            ),
            Self::Db(e) => e.try_as_error(),
        }
    }
}
