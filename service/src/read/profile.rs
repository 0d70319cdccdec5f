//! [`Profile`] read model definitions.
//!
//! [`Profile`]: crate::domain::Profile

pub mod list {
    //! [`Profile`]s list definitions.
    //!
    //! [`Profile`]: crate::domain::Profile

    /// Selector of all [`Profile`]s, newest first.
    ///
    /// [`Profile`]: crate::domain::Profile
    #[derive(Clone, Copy, Debug, Default)]
    pub struct All;
}
