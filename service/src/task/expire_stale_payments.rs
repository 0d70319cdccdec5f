//! [`ExpireStalePayments`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::operations::{By, Perform, Start, Update};
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::Payment;
use crate::{
    domain::payment,
    infra::{database, Database},
    read, Service,
};

use super::Task;

/// Configuration for [`ExpireStalePayments`] [`Task`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Interval between stale [`Payment`]s lookups.
    pub interval: time::Duration,

    /// Timeout after which a [`Payment`] awaiting its callback is considered
    /// stale.
    pub timeout: time::Duration,
}

/// [`Task`] expiring [`Payment`]s whose gateway callback never arrived.
#[derive(Clone, Copy, Debug)]
pub struct ExpireStalePayments<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db, St, Gw> Task<Start<By<ExpireStalePayments<Self>, Config>>>
    for Service<Db, St, Gw>
where
    ExpireStalePayments<Service<Db, St, Gw>>:
        Task<Perform<()>, Ok = read::payment::Affected, Err: Error>
            + Send
            + Sync
            + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<ExpireStalePayments<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = ExpireStalePayments {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            match task.execute(Perform(())).await {
                Ok(read::payment::Affected(0)) => {}
                Ok(read::payment::Affected(n)) => {
                    log::info!("expired {n} stale `Payment`s");
                }
                Err(e) => {
                    log::error!("`task::ExpireStalePayments` failed: {e}");
                }
            }
        }
    }
}

impl<Db, St, Gw> Task<Perform<()>> for ExpireStalePayments<Service<Db, St, Gw>>
where
    Db: Database<
        Update<By<read::payment::Stale, payment::CreationDateTime>>,
        Ok = read::payment::Affected,
        Err = Traced<database::Error>,
    >,
{
    type Ok = read::payment::Affected;
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let deadline = payment::CreationDateTime::now() - self.config.timeout;
        self.service
            .database()
            .execute(Update(By::new(deadline)))
            .await
            .map_err(tracerr::wrap!())
    }
}

/// Error of [`ExpireStalePayments`] execution.
pub type ExecutionError = Traced<database::Error>;
