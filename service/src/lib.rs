//! Service contains the business logic of the marketplace.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;
pub mod task;

use common::{
    operations::{By, Start},
    Money,
};
use derive_more::{Debug, Error};
use reqwest::Url;
use secrecy::SecretString;

#[cfg(doc)]
use infra::{Database, Gateway, Storage};

pub use self::{command::Command, query::Query, task::Task};

/// [`Service`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// [JWT] decoding key of the identity provider issuing session tokens.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_decoding_key: jsonwebtoken::DecodingKey,

    /// Price of unlocking a landlord contact.
    pub contact_price: Money,

    /// Indicator whether contact purchases may be recorded without a real
    /// payment.
    pub simulate_payments: bool,

    /// URL the payment [`Gateway`] delivers its results to.
    ///
    /// Payments cannot be initiated without it.
    pub payment_callback_url: Option<Url>,

    /// Secret signing the payment callback URLs.
    ///
    /// Payments cannot be initiated or settled without it.
    pub payment_callback_secret: Option<SecretString>,

    /// [`task::ExpireStalePayments`] configuration.
    pub expire_stale_payments: task::expire_stale_payments::Config,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db, St, Gw> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,

    /// [`Storage`] of this [`Service`].
    storage: St,

    /// Payment [`Gateway`] of this [`Service`].
    gateway: Gw,
}

impl<Db, St, Gw> Service<Db, St, Gw> {
    /// Creates a new [`Service`] with the provided parameters.
    pub fn new(
        config: Config,
        database: Db,
        storage: St,
        gateway: Gw,
    ) -> (Self, task::Background)
    where
        Self: Task<
                Start<
                    By<
                        task::ExpireStalePayments<Self>,
                        task::expire_stale_payments::Config,
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Clone
            + 'static,
    {
        let this = Service {
            config,
            database,
            storage,
            gateway,
        };

        let mut bg = task::Background::default();
        let svc = this.clone();
        bg.spawn("ExpireStalePayments", async move {
            svc.execute(Start(By::new(svc.config().expire_stale_payments)))
                .await
        });

        (this, bg)
    }

    /// Returns [`Config`] of this [`Service`].
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns [`Storage`] of this [`Service`].
    #[must_use]
    pub fn storage(&self) -> &St {
        &self.storage
    }

    /// Returns payment [`Gateway`] of this [`Service`].
    #[must_use]
    pub fn gateway(&self) -> &Gw {
        &self.gateway
    }
}
