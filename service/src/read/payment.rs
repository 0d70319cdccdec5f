//! [`Payment`] read model definitions.

#[cfg(doc)]
use crate::domain::{payment, Payment};

/// Selector of [`Payment`]s which are still
/// [`payment::Status::AwaitingCallback`] past a deadline.
#[derive(Clone, Copy, Debug)]
pub struct Stale;

/// Number of [`Payment`]s affected by an operation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Affected(pub u64);
