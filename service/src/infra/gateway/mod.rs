//! Payment [`Gateway`] definitions.

pub mod mpesa;

use derive_more::{Display, Error as StdError, From};
use serde_json::Value as Json;

use crate::domain::payment;

/// Payment gateway operation.
pub use common::Handler as Gateway;

pub use self::mpesa::Mpesa;

/// Operation to prompt a payer's phone to confirm a payment.
#[derive(Clone, Debug)]
pub struct Prompt {
    /// [`payment::Msisdn`] of the payer.
    pub phone: payment::Msisdn,

    /// Whole amount of shillings to pay.
    pub amount: u64,

    /// URL the gateway should deliver its result to.
    pub callback_url: String,
}

/// [`Prompt`] accepted by a [`Gateway`].
#[derive(Clone, Debug)]
pub struct Prompted {
    /// Identifiers of the accepted [`Prompt`].
    pub accepted: payment::Accepted,

    /// Raw response of the [`Gateway`].
    pub payload: Json,
}

/// [`Gateway`] error.
#[derive(Debug, Display, StdError, From)]
pub enum Error {
    /// HTTP request to the [`Gateway`] failed.
    #[display("HTTP request to the payment gateway failed: {_0}")]
    Http(reqwest::Error),

    /// [`Gateway`] issued no access token.
    #[display("Payment gateway issued no access token: {payload}")]
    #[from(ignore)]
    MissingToken {
        /// Raw response of the [`Gateway`].
        #[error(not(source))]
        payload: Json,
    },

    /// [`Gateway`] rejected the request.
    #[display("Payment gateway rejected the request with {status}: {payload}")]
    #[from(ignore)]
    Rejected {
        /// HTTP status code of the response.
        status: u16,

        /// Raw response of the [`Gateway`].
        #[error(not(source))]
        payload: Json,
    },

    /// [`Gateway`] credentials are not configured.
    #[display("Payment gateway is not configured: `{_0}` is missing")]
    #[from(ignore)]
    Misconfigured(#[error(not(source))] &'static str),
}

impl Error {
    /// Returns the raw [`Gateway`] response this [`Error`] was caused by, if
    /// any.
    #[must_use]
    pub fn payload(&self) -> Option<&Json> {
        match self {
            Self::MissingToken { payload } | Self::Rejected { payload, .. } => {
                Some(payload)
            }
            Self::Http(_) | Self::Misconfigured(_) => None,
        }
    }
}

#[cfg(test)]
pub mod memory {
    //! In-memory [`Gateway`] used in tests.

    use std::sync::{Arc, Mutex};

    use serde_json::json;
    use tracerr::Traced;

    use crate::domain::payment;

    use super::{Error, Gateway, Prompt, Prompted};

    /// In-memory [`Gateway`] accepting every [`Prompt`], unless configured to
    /// be missing its credentials.
    #[derive(Clone, Debug, Default)]
    pub struct Memory {
        /// Whether this [`Gateway`] lacks its credentials.
        pub misconfigured: bool,

        /// [`Prompt`]s received so far.
        pub prompts: Arc<Mutex<Vec<Prompt>>>,
    }

    impl Gateway<Prompt> for Memory {
        type Ok = Prompted;
        type Err = Traced<Error>;

        async fn execute(&self, prompt: Prompt) -> Result<Self::Ok, Self::Err> {
            if self.misconfigured {
                return Err(tracerr::new!(Error::Misconfigured("consumer_key")));
            }
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt);
            let n = prompts.len();
            Ok(Prompted {
                accepted: payment::Accepted {
                    merchant_request_id: Some(format!("merchant-{n}").into()),
                    checkout_request_id: Some(format!("ws_CO_{n}").into()),
                },
                payload: json!({
                    "MerchantRequestID": format!("merchant-{n}"),
                    "CheckoutRequestID": format!("ws_CO_{n}"),
                    "ResponseCode": "0",
                }),
            })
        }
    }
}
