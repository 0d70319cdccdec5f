//! Background environment for running [`Task`]s.

use std::{
    error::Error,
    future::{Future, IntoFuture},
    iter,
};

use derive_more::Display;
use futures::{
    future::{self, LocalBoxFuture},
    FutureExt as _, TryFutureExt as _,
};
use tokio::task;
use tracing as log;

#[cfg(doc)]
use crate::Task;

/// Boxed error of a [`Task`].
type BoxError = Box<dyn Error + 'static>;

/// Background environment for running named [`Task`]s.
///
/// Resolves once all the spawned [`Task`]s complete, or as soon as any of
/// them fails.
#[derive(Debug, Default)]
pub struct Background {
    /// Local set of tasks.
    set: task::LocalSet,

    /// Names and handles of spawned tasks.
    handles: Vec<(&'static str, task::JoinHandle<Result<(), BoxError>>)>,
}

impl Background {
    /// Spawns a new [`Task`] with the provided `name` inside the
    /// [`Background`] environment.
    pub fn spawn<F, E>(&mut self, name: &'static str, future: F)
    where
        F: Future<Output = Result<(), E>> + 'static,
        E: Error + 'static,
    {
        log::debug!("spawning `{name}` background task");
        let handle = self
            .set
            .spawn_local(future.map_err(|e| BoxError::from(Box::new(e))));
        self.handles.push((name, handle));
    }

    /// Returns names of the [`Task`]s spawned in this [`Background`].
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handles.iter().map(|(name, _)| *name)
    }
}

impl IntoFuture for Background {
    type Output = Result<(), Failure>;
    type IntoFuture = LocalBoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        let Self { set, handles } = self;
        future::try_join_all(iter::once(set.map(Ok).boxed_local()).chain(
            handles.into_iter().map(|(name, h)| {
                h.map(move |r| match r {
                    Ok(Ok(())) => {
                        log::debug!("`{name}` background task finished");
                        Ok(())
                    }
                    Ok(Err(source)) => Err(Failure { name, source }),
                    Err(e) => Err(Failure {
                        name,
                        source: BoxError::from(Box::new(e)),
                    }),
                })
                .boxed_local()
            }),
        ))
        .map_ok(drop)
        .boxed_local()
    }
}

/// Failure of a [`Task`] running in a [`Background`].
#[derive(Debug, Display)]
#[display("`{name}` task failed: {source}")]
pub struct Failure {
    /// Name of the failed [`Task`].
    pub name: &'static str,

    /// Error the [`Task`] failed with.
    pub source: BoxError,
}

impl Error for Failure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.source)
    }
}

#[cfg(test)]
mod spec {
    use std::io;

    use super::Background;

    #[tokio::test]
    async fn completes_when_all_tasks_do() {
        let mut bg = Background::default();
        bg.spawn("first", async { Ok::<_, io::Error>(()) });
        bg.spawn("second", async { Ok::<_, io::Error>(()) });

        assert_eq!(bg.names().collect::<Vec<_>>(), ["first", "second"]);
        bg.await.unwrap();
    }

    #[tokio::test]
    async fn names_failed_task() {
        let mut bg = Background::default();
        bg.spawn("healthy", async { Ok::<_, io::Error>(()) });
        bg.spawn("broken", async { Err(io::Error::other("boom")) });

        let err = bg.await.unwrap_err();

        assert_eq!(err.name, "broken");
        assert_eq!(err.to_string(), "`broken` task failed: boom");
    }
}
