//! [`Payment`] definitions.

use std::sync::LazyLock;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
use hmac::{Hmac, Mac as _};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use sha2::Sha256;
use uuid::Uuid;

use crate::domain::{profile, property};

/// Mobile-money payment attempt of a user unlocking a landlord contact.
#[derive(Clone, Debug)]
pub struct Payment {
    /// ID of this [`Payment`].
    pub id: Id,

    /// ID of the paying [`Profile`].
    ///
    /// [`Profile`]: profile::Profile
    pub user_id: profile::Id,

    /// ID of the [`Property`] whose contact is being paid for.
    ///
    /// [`Property`]: property::Property
    pub property_id: property::Id,

    /// [`Msisdn`] the payment prompt was pushed to.
    pub phone: Msisdn,

    /// Requested amount of this [`Payment`].
    pub amount: Money,

    /// [`Status`] of this [`Payment`].
    pub status: Status,

    /// Gateway's [`MerchantRequestId`] of this [`Payment`].
    pub merchant_request_id: Option<MerchantRequestId>,

    /// Gateway's [`CheckoutRequestId`] of this [`Payment`].
    pub checkout_request_id: Option<CheckoutRequestId>,

    /// Gateway's result code, once settled by a callback.
    pub result_code: Option<ResultCode>,

    /// Gateway's human-readable result, once settled by a callback.
    pub result_description: Option<String>,

    /// Gateway's [`Receipt`], once completed.
    pub receipt: Option<Receipt>,

    /// [`DateTime`] when this [`Payment`] was initiated.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Payment`] reached a settled [`Status`].
    pub settled_at: Option<SettlementDateTime>,
}

impl Payment {
    /// Creates a new [`Payment`] accepted by the gateway and awaiting its
    /// callback.
    #[must_use]
    pub fn new(
        id: Id,
        user_id: profile::Id,
        property_id: property::Id,
        phone: Msisdn,
        amount: Money,
        accepted: Accepted,
    ) -> Self {
        Self {
            id,
            user_id,
            property_id,
            phone,
            amount,
            status: Status::AwaitingCallback,
            merchant_request_id: accepted.merchant_request_id,
            checkout_request_id: accepted.checkout_request_id,
            result_code: None,
            result_description: None,
            receipt: None,
            created_at: CreationDateTime::now(),
            settled_at: None,
        }
    }

    /// Settles this [`Payment`] with the provided [`Callback`].
    ///
    /// Already settled [`Payment`]s are left untouched, except the
    /// [`Status::Expired`] ones, which a successful [`Callback`] still
    /// completes.
    ///
    /// # Errors
    ///
    /// If the [`Callback`] refers to another gateway checkout.
    pub fn settle(
        &mut self,
        callback: &Callback,
    ) -> Result<Settlement, CorrelationError> {
        let late_success =
            self.status == Status::Expired && callback.is_success();
        if self.status.is_settled() && !late_success {
            return Ok(Settlement::AlreadySettled(self.status));
        }
        if let (Some(ours), Some(theirs)) =
            (&self.checkout_request_id, &callback.checkout_request_id)
        {
            if ours != theirs {
                return Err(CorrelationError {
                    expected: ours.clone(),
                    actual: theirs.clone(),
                });
            }
        }

        self.result_code = Some(callback.result_code);
        self.result_description.clone_from(&callback.result_description);
        self.settled_at = Some(SettlementDateTime::now());
        if callback.is_success() {
            self.status = Status::Completed;
            self.receipt.clone_from(&callback.receipt);
            Ok(Settlement::Completed)
        } else {
            self.status = Status::Failed;
            Ok(Settlement::Failed)
        }
    }

    /// Expires this [`Payment`] if it's still awaiting its callback.
    ///
    /// Returns whether it was expired.
    pub fn expire(&mut self) -> bool {
        if self.status != Status::AwaitingCallback {
            return false;
        }
        self.status = Status::Expired;
        self.settled_at = Some(SettlementDateTime::now());
        true
    }
}

/// Outcome of settling a [`Payment`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Settlement {
    /// [`Payment`] has been completed.
    Completed,

    /// [`Payment`] has failed.
    Failed,

    /// [`Payment`] had been settled before with the provided [`Status`].
    AlreadySettled(Status),
}

/// Error of a [`Callback`] not matching the [`Payment`] it's addressed to.
#[derive(Clone, Debug, Display, Error)]
#[display(
    "`Callback` refers to checkout `{actual}` instead of `{expected}`"
)]
pub struct CorrelationError {
    /// [`CheckoutRequestId`] of the [`Payment`].
    pub expected: CheckoutRequestId,

    /// [`CheckoutRequestId`] reported by the [`Callback`].
    pub actual: CheckoutRequestId,
}

/// ID of a [`Payment`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_kind! {
    #[doc = "Status of a [`Payment`]."]
    enum Status {
        #[doc = "Prompt is pushed and the gateway callback is awaited."]
        AwaitingCallback = "awaiting_callback",

        #[doc = "Payment went through."]
        Completed = "completed",

        #[doc = "Payment was declined, cancelled or timed out at the gateway."]
        Failed = "failed",

        #[doc = "Callback never arrived in time."]
        Expired = "expired",
    }
}

impl Status {
    /// Indicates whether this [`Status`] is a terminal one.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        !matches!(self, Self::AwaitingCallback)
    }
}

/// Kenyan mobile subscriber number in the `2547XXXXXXXX`/`2541XXXXXXXX` form
/// expected by the gateway.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Msisdn(String);

impl Msisdn {
    /// Normalizes the provided phone `number` into a [`Msisdn`].
    ///
    /// Accepts local (`07XXXXXXXX`, `01XXXXXXXX`) and international
    /// (`+2547XXXXXXXX`, `2547XXXXXXXX`) forms, with optional spaces or
    /// dashes in between.
    #[must_use]
    pub fn normalize(number: impl AsRef<str>) -> Option<Self> {
        /// Regular expression capturing the subscriber part of a number.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^(?:\+?254|0)([17]\d{8})$").expect("valid regex")
        });

        let digits: String = number
            .as_ref()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-'))
            .collect();
        let subscriber = REGEX.captures(&digits)?.get(1)?.as_str();
        Some(Self(format!("254{subscriber}")))
    }
}

impl FromStr for Msisdn {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s).ok_or("invalid `Msisdn`")
    }
}

/// Gateway's ID of a merchant request.
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, From, PartialEq, Serialize,
)]
#[as_ref(forward)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct MerchantRequestId(String);

/// Gateway's ID of a checkout request.
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, From, PartialEq, Serialize,
)]
#[as_ref(forward)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct CheckoutRequestId(String);

/// Gateway's receipt number of a completed [`Payment`].
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, From, PartialEq, Serialize,
)]
#[as_ref(forward)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Receipt(String);

/// Gateway's result code. Zero means success.
pub type ResultCode = i32;

/// Identifiers the gateway returned when accepting a payment prompt.
#[derive(Clone, Debug, Default)]
pub struct Accepted {
    /// [`MerchantRequestId`] of the accepted prompt.
    pub merchant_request_id: Option<MerchantRequestId>,

    /// [`CheckoutRequestId`] of the accepted prompt.
    pub checkout_request_id: Option<CheckoutRequestId>,
}

/// Parsed asynchronous result notification from the gateway.
#[derive(Clone, Debug)]
pub struct Callback {
    /// [`MerchantRequestId`] the result relates to.
    pub merchant_request_id: Option<MerchantRequestId>,

    /// [`CheckoutRequestId`] the result relates to.
    pub checkout_request_id: Option<CheckoutRequestId>,

    /// [`ResultCode`] of the payment.
    pub result_code: ResultCode,

    /// Human-readable result of the payment.
    pub result_description: Option<String>,

    /// Phone number the payment was made from, as reported by the gateway.
    pub phone: Option<String>,

    /// [`Receipt`] of the payment, if completed.
    pub receipt: Option<Receipt>,

    /// Paid amount, if reported.
    pub amount: Option<Money>,
}

impl Callback {
    /// Metadata item names the payer's phone number may be reported under.
    pub const PHONE_ITEMS: &'static [&'static str] =
        &["PhoneNumber", "phoneNumber", "MSISDN", "Phone"];

    /// Parses a [`Callback`] out of the gateway's JSON `body`.
    ///
    /// # Errors
    ///
    /// If the `body` has no `Body.stkCallback` object, or no numeric
    /// `ResultCode` in it.
    pub fn parse(body: &Json) -> Result<Self, MalformedCallback> {
        let cb = body
            .pointer("/Body/stkCallback")
            .filter(|v| v.is_object())
            .ok_or(MalformedCallback::NoCallback)?;
        let result_code = match cb.get("ResultCode") {
            Some(Json::Number(n)) => n.as_i64(),
            Some(Json::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
        .and_then(|c| ResultCode::try_from(c).ok())
        .ok_or(MalformedCallback::NoResultCode)?;

        let text = |v: &Json| match v {
            Json::String(s) => Some(s.clone()),
            Json::Number(n) => Some(n.to_string()),
            _ => None,
        };
        let items = cb
            .pointer("/CallbackMetadata/Item")
            .and_then(Json::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let item = |names: &[&str]| {
            names.iter().find_map(|name| {
                items
                    .iter()
                    .find(|i| i.get("Name").and_then(Json::as_str) == Some(*name))
                    .and_then(|i| i.get("Value"))
                    .and_then(text)
            })
        };

        Ok(Self {
            merchant_request_id: cb
                .get("MerchantRequestID")
                .and_then(text)
                .map(MerchantRequestId),
            checkout_request_id: cb
                .get("CheckoutRequestID")
                .and_then(text)
                .map(CheckoutRequestId),
            result_code,
            result_description: cb.get("ResultDesc").and_then(text),
            phone: item(Self::PHONE_ITEMS),
            receipt: item(&["MpesaReceiptNumber"]).map(Receipt),
            amount: item(&["Amount"]).and_then(|a| a.parse().ok()),
        })
    }

    /// Indicates whether this [`Callback`] reports a successful payment.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result_code == 0
    }
}

/// Error of parsing a [`Callback`].
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum MalformedCallback {
    /// `Body.stkCallback` object is missing.
    #[display("`Body.stkCallback` is missing")]
    NoCallback,

    /// `ResultCode` is missing or is not an integer.
    #[display("`Body.stkCallback.ResultCode` is missing or invalid")]
    NoResultCode,
}

/// HMAC-SHA256 signature binding a gateway callback to a [`Payment`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(forward)]
pub struct Signature(String);

impl Signature {
    /// Signs the provided [`Payment`] `id` with the provided `secret`.
    #[must_use]
    pub fn sign(secret: &[u8], id: Id) -> Self {
        Self(hex::encode(Self::mac(secret, id).finalize().into_bytes()))
    }

    /// Verifies the provided hex-encoded `signature` of the provided
    /// [`Payment`] `id` in constant time.
    #[must_use]
    pub fn verify(secret: &[u8], id: Id, signature: &str) -> bool {
        hex::decode(signature).is_ok_and(|raw| {
            Self::mac(secret, id).verify_slice(&raw).is_ok()
        })
    }

    /// Creates a new HMAC of the provided [`Payment`] `id`.
    fn mac(secret: &[u8], id: Id) -> Hmac<Sha256> {
        let mut mac = <Hmac<Sha256>>::new_from_slice(secret)
            .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any size"));
        mac.update(Uuid::from(id).as_bytes());
        mac
    }
}

/// [`DateTime`] when a [`Payment`] was initiated.
pub type CreationDateTime = DateTimeOf<(Payment, unit::Creation)>;

/// [`DateTime`] when a [`Payment`] was settled.
pub type SettlementDateTime = DateTimeOf<(Payment, unit::Settlement)>;

#[cfg(test)]
mod spec {
    use common::Money;
    use serde_json::json;

    use crate::domain::{profile, property};

    use super::{
        Accepted, Callback, CheckoutRequestId, Id, MalformedCallback, Msisdn,
        Payment, Settlement, Signature, Status,
    };

    fn payment() -> Payment {
        Payment::new(
            Id::new(),
            profile::Id::new(),
            property::Id::new(),
            Msisdn::normalize("0712345678").unwrap(),
            Money::from_shillings(200),
            Accepted {
                merchant_request_id: Some("29115-34620561-1".to_owned().into()),
                checkout_request_id: Some(
                    "ws_CO_191220191020363925".to_owned().into(),
                ),
            },
        )
    }

    fn callback(code: i64, checkout: &str) -> Callback {
        Callback::parse(&json!({
            "Body": {"stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": checkout,
                "ResultCode": code,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": {"Item": [
                    {"Name": "Amount", "Value": 200.00},
                    {"Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV"},
                    {"Name": "TransactionDate", "Value": 20191219102115_u64},
                    {"Name": "PhoneNumber", "Value": 254708374149_u64},
                ]},
            }},
        }))
        .unwrap()
    }

    #[test]
    fn normalizes_msisdn() {
        for input in [
            "0712345678",
            "+254712345678",
            "254712345678",
            "0712 345 678",
            "+254-712-345-678",
        ] {
            assert_eq!(
                Msisdn::normalize(input).unwrap().to_string(),
                "254712345678",
                "input: {input}",
            );
        }
        assert_eq!(
            Msisdn::normalize("0110123456").unwrap().to_string(),
            "254110123456",
        );

        for input in ["", "0812345678", "071234567", "25471234567890", "abc"] {
            assert!(Msisdn::normalize(input).is_none(), "input: {input}");
        }
    }

    #[test]
    fn parses_successful_callback() {
        let cb = callback(0, "ws_CO_191220191020363925");

        assert!(cb.is_success());
        assert_eq!(cb.phone.as_deref(), Some("254708374149"));
        assert_eq!(cb.receipt.unwrap().to_string(), "NLJ7RT61SV");
        assert_eq!(cb.amount, Some(Money::from_shillings(200)));
    }

    #[test]
    fn parses_phone_under_alternative_names() {
        for name in ["phoneNumber", "MSISDN", "Phone"] {
            let cb = Callback::parse(&json!({
                "Body": {"stkCallback": {
                    "ResultCode": "0",
                    "CallbackMetadata": {"Item": [
                        {"Name": name, "Value": "254712345678"},
                    ]},
                }},
            }))
            .unwrap();

            assert_eq!(cb.phone.as_deref(), Some("254712345678"), "{name}");
        }
    }

    #[test]
    fn parses_failed_callback_without_metadata() {
        let cb = Callback::parse(&json!({
            "Body": {"stkCallback": {
                "MerchantRequestID": "8555-67195-1",
                "CheckoutRequestID": "ws_CO_27072017154747416",
                "ResultCode": 1032,
                "ResultDesc": "[STK_CB - ]Request cancelled by user",
            }},
        }))
        .unwrap();

        assert!(!cb.is_success());
        assert_eq!(cb.result_code, 1032);
        assert!(cb.phone.is_none());
        assert!(cb.receipt.is_none());
    }

    #[test]
    fn rejects_malformed_callback() {
        assert!(matches!(
            Callback::parse(&json!({"Body": {}})),
            Err(MalformedCallback::NoCallback),
        ));
        assert!(matches!(
            Callback::parse(&json!("garbage")),
            Err(MalformedCallback::NoCallback),
        ));
        assert!(matches!(
            Callback::parse(&json!({"Body": {"stkCallback": {}}})),
            Err(MalformedCallback::NoResultCode),
        ));
    }

    #[test]
    fn settles_once() {
        let mut p = payment();
        assert_eq!(p.status, Status::AwaitingCallback);

        let out = p.settle(&callback(0, "ws_CO_191220191020363925")).unwrap();
        assert_eq!(out, Settlement::Completed);
        assert_eq!(p.status, Status::Completed);
        assert_eq!(p.receipt.as_ref().unwrap().to_string(), "NLJ7RT61SV");
        assert!(p.settled_at.is_some());

        let out = p.settle(&callback(1, "ws_CO_191220191020363925")).unwrap();
        assert_eq!(out, Settlement::AlreadySettled(Status::Completed));
        assert_eq!(p.status, Status::Completed);
    }

    #[test]
    fn fails_on_non_zero_result() {
        let mut p = payment();

        let out = p.settle(&callback(1037, "ws_CO_191220191020363925")).unwrap();

        assert_eq!(out, Settlement::Failed);
        assert_eq!(p.status, Status::Failed);
        assert_eq!(p.result_code, Some(1037));
        assert!(p.receipt.is_none());
    }

    #[test]
    fn refuses_foreign_checkout() {
        let mut p = payment();

        let err = p.settle(&callback(0, "ws_CO_other")).unwrap_err();

        assert_eq!(
            err.actual,
            CheckoutRequestId::from("ws_CO_other".to_owned()),
        );
        assert_eq!(p.status, Status::AwaitingCallback);
    }

    #[test]
    fn expires_only_awaiting() {
        let mut p = payment();
        assert!(p.expire());
        assert_eq!(p.status, Status::Expired);
        assert!(!p.expire());

        let mut p = payment();
        _ = p.settle(&callback(0, "ws_CO_191220191020363925")).unwrap();
        assert!(!p.expire());
        assert_eq!(p.status, Status::Completed);
    }

    #[test]
    fn completes_expired_on_late_success_only() {
        let mut p = payment();
        assert!(p.expire());

        let out = p.settle(&callback(1032, "ws_CO_191220191020363925")).unwrap();
        assert_eq!(out, Settlement::AlreadySettled(Status::Expired));
        assert_eq!(p.status, Status::Expired);
        assert!(p.result_code.is_none());

        let out = p.settle(&callback(0, "ws_CO_191220191020363925")).unwrap();
        assert_eq!(out, Settlement::Completed);
        assert_eq!(p.status, Status::Completed);
        assert_eq!(p.result_code, Some(0));
    }

    #[test]
    fn verifies_signature() {
        let id = Id::new();
        let sig = Signature::sign(b"s3cr3t", id);

        assert_eq!(sig.to_string().len(), 64);
        assert!(Signature::verify(b"s3cr3t", id, sig.as_ref()));
        assert!(!Signature::verify(b"other", id, sig.as_ref()));
        assert!(!Signature::verify(b"s3cr3t", Id::new(), sig.as_ref()));
        assert!(!Signature::verify(b"s3cr3t", id, "not-hex"));
    }
}
