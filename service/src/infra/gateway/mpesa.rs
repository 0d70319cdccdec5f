//! [M-Pesa] [`Gateway`] implementation.
//!
//! [M-Pesa]: https://developer.safaricom.co.ke

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use common::DateTime;
use derive_more::Debug;
use reqwest::{header::AUTHORIZATION, Response};
use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;
use serde_json::{json, Value as Json};
use tracerr::Traced;
use tracing as log;

use crate::domain::payment;

use super::{Error, Gateway, Prompt, Prompted};

/// Account reference shown to the payer.
pub const ACCOUNT_REFERENCE: &str = "Rently Property Payment";

/// Transaction description shown to the payer.
pub const TRANSACTION_DESC: &str = "Access landlord contact";

/// [`Mpesa`] configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Base URL of the [M-Pesa] API.
    ///
    /// [M-Pesa]: https://developer.safaricom.co.ke
    pub base_url: String,

    /// Consumer key of the application.
    pub consumer_key: Option<SecretString>,

    /// Consumer secret of the application.
    pub consumer_secret: Option<SecretString>,

    /// Business short code receiving the payments.
    pub shortcode: Option<String>,

    /// Passkey of the `shortcode`.
    pub passkey: Option<SecretString>,
}

/// [M-Pesa] Daraja API client performing STK push requests.
///
/// [M-Pesa]: https://developer.safaricom.co.ke
#[derive(Clone, Debug)]
pub struct Mpesa {
    /// [`Config`] of this client.
    config: Config,

    /// HTTP client.
    #[debug(skip)]
    http: reqwest::Client,
}

impl Mpesa {
    /// Creates a new [`Mpesa`] client with the provided [`Config`].
    #[must_use]
    pub fn new(mut config: Config) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').to_owned();
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Requests a new OAuth access token.
    async fn access_token(&self) -> Result<String, Traced<Error>> {
        let key = required(self.config.consumer_key.as_ref(), "consumer_key")?;
        let secret =
            required(self.config.consumer_secret.as_ref(), "consumer_secret")?;
        let credentials = BASE64.encode(format!(
            "{}:{}",
            key.expose_secret(),
            secret.expose_secret(),
        ));

        let resp = self
            .http
            .get(format!("{}/oauth/v1/generate", self.config.base_url))
            .query(&[("grant_type", "client_credentials")])
            .header(AUTHORIZATION, format!("Basic {credentials}"))
            .send()
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))?;
        let (_, payload) = read(resp).await?;

        payload
            .get("access_token")
            .and_then(Json::as_str)
            .filter(|t| !t.is_empty())
            .map(ToOwned::to_owned)
            .ok_or_else(|| tracerr::new!(Error::MissingToken { payload }))
    }
}

impl Gateway<Prompt> for Mpesa {
    type Ok = Prompted;
    type Err = Traced<Error>;

    async fn execute(&self, prompt: Prompt) -> Result<Self::Ok, Self::Err> {
        let Prompt {
            phone,
            amount,
            callback_url,
        } = prompt;

        let shortcode = required(self.config.shortcode.as_ref(), "shortcode")?;
        let passkey = required(self.config.passkey.as_ref(), "passkey")?;
        let token = self.access_token().await.map_err(tracerr::wrap!())?;

        let timestamp = DateTime::now().to_compact();
        let body = json!({
            "BusinessShortCode": shortcode,
            "Password": password(shortcode, passkey.expose_secret(), &timestamp),
            "Timestamp": timestamp,
            "TransactionType": "CustomerPayBillOnline",
            "Amount": amount,
            "PartyA": phone.to_string(),
            "PartyB": shortcode,
            "PhoneNumber": phone.to_string(),
            "CallBackURL": callback_url,
            "AccountReference": ACCOUNT_REFERENCE,
            "TransactionDesc": TRANSACTION_DESC,
        });

        let resp = self
            .http
            .post(format!(
                "{}/mpesa/stkpush/v1/processrequest",
                self.config.base_url,
            ))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))?;
        let (status, payload) = read(resp).await?;
        if !status.is_success() {
            return Err(tracerr::new!(Error::Rejected {
                status: status.as_u16(),
                payload,
            }));
        }

        log::debug!("STK push accepted: {payload}");
        Ok(Prompted {
            accepted: accepted(&payload),
            payload,
        })
    }
}

/// Returns the configured `value`, or an [`Error::Misconfigured`] naming it.
fn required<'v, T>(
    value: Option<&'v T>,
    name: &'static str,
) -> Result<&'v T, Traced<Error>> {
    value.ok_or_else(|| tracerr::new!(Error::Misconfigured(name)))
}

/// Reads the status and the JSON body of the provided [`Response`].
///
/// Non-JSON bodies are returned as a JSON string.
async fn read(
    resp: Response,
) -> Result<(reqwest::StatusCode, Json), Traced<Error>> {
    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(tracerr::from_and_wrap!(=> Error))?;
    let payload = serde_json::from_str(&text).unwrap_or(Json::String(text));
    Ok((status, payload))
}

/// Computes the STK push password out of the provided parts.
fn password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    BASE64.encode(format!("{shortcode}{passkey}{timestamp}"))
}

/// Extracts the [`payment::Accepted`] identifiers from the provided STK push
/// response `payload`.
fn accepted(payload: &Json) -> payment::Accepted {
    let id = |name: &str| {
        payload
            .get(name)
            .and_then(Json::as_str)
            .map(ToOwned::to_owned)
    };
    payment::Accepted {
        merchant_request_id: id("MerchantRequestID").map(Into::into),
        checkout_request_id: id("CheckoutRequestID").map(Into::into),
    }
}

#[cfg(test)]
mod spec {
    use serde_json::json;

    use super::{accepted, password, Config, Error, Gateway as _, Mpesa, Prompt};

    #[test]
    fn computes_password() {
        assert_eq!(
            password("174379", "passkey", "20240101120000"),
            "MTc0Mzc5cGFzc2tleTIwMjQwMTAxMTIwMDAw",
        );
    }

    #[test]
    fn extracts_accepted_ids() {
        let ids = accepted(&json!({
            "MerchantRequestID": "29115-34620561-1",
            "CheckoutRequestID": "ws_CO_191220191020363925",
            "ResponseCode": "0",
        }));
        assert_eq!(
            ids.merchant_request_id.map(|id| id.to_string()).as_deref(),
            Some("29115-34620561-1"),
        );
        assert_eq!(
            ids.checkout_request_id.map(|id| id.to_string()).as_deref(),
            Some("ws_CO_191220191020363925"),
        );

        let none = accepted(&json!({"errorMessage": "Bad Request"}));
        assert!(none.merchant_request_id.is_none());
        assert!(none.checkout_request_id.is_none());
    }

    #[tokio::test]
    async fn fails_without_credentials() {
        let mpesa = Mpesa::new(Config {
            base_url: "http://127.0.0.1:9/".into(),
            consumer_key: None,
            consumer_secret: None,
            shortcode: Some("174379".into()),
            passkey: Some("passkey".into()),
        });

        let err = mpesa
            .execute(Prompt {
                phone: "0712345678".parse().unwrap(),
                amount: 200,
                callback_url: "https://example.com/api/mpesa/callback".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), Error::Misconfigured("consumer_key")));
    }
}
