//! [`Property`]-related read definitions.
//!
//! [`Property`]: crate::domain::Property

use crate::domain::profile;

pub mod list {
    //! [`Property`] list definitions.
    //!
    //! [`Property`]: crate::domain::Property

    use crate::domain::profile;

    use super::catalog;

    /// Selector of a [`Property`] list, always ordered newest first.
    ///
    /// [`Property`]: crate::domain::Property
    #[derive(Clone, Debug)]
    pub enum Selector {
        /// Publicly available [`Property`]s matching the [`catalog::Filter`],
        /// up to the `limit`, if any.
        ///
        /// [`Property`]: crate::domain::Property
        Catalog {
            /// [`catalog::Filter`] to apply.
            filter: catalog::Filter,

            /// Maximum number of [`Property`]s to select.
            ///
            /// [`Property`]: crate::domain::Property
            limit: Option<usize>,
        },

        /// [`Property`]s owned by the landlord, in any status.
        ///
        /// [`Property`]: crate::domain::Property
        OwnedBy(profile::Id),

        /// All [`Property`]s, in any status.
        ///
        /// [`Property`]: crate::domain::Property
        All,
    }
}

pub mod catalog {
    //! Public [`Property`] catalog definitions.

    use std::str::FromStr;

    use common::Money;
    use derive_more::{Display, Error};

    use crate::domain::{property, Property};

    /// Composition of independent catalog filters.
    ///
    /// A [`Property`] matches when it passes every filter present.
    #[derive(Clone, Debug, Default)]
    pub struct Filter {
        /// [`Search`] over text fields.
        pub search: Option<Search>,

        /// Exact [`property::Kind`] to match.
        pub kind: Option<property::Kind>,

        /// [`PriceRange`] the price must fall into.
        pub price: PriceRange,
    }

    impl Filter {
        /// Indicates whether the provided [`Property`] passes this [`Filter`].
        ///
        /// Doesn't check the [`property::Status`].
        #[must_use]
        pub fn matches(&self, property: &Property) -> bool {
            self.search.as_ref().map_or(true, |s| s.matches(property))
                && self.kind.map_or(true, |k| k == property.kind)
                && self.price.contains(property.price)
        }
    }

    /// Case-insensitive substring search over the title, location and
    /// description of a [`Property`].
    #[derive(Clone, Debug, Display, Eq, PartialEq)]
    pub struct Search(String);

    impl Search {
        /// Creates a new [`Search`] out of the provided user `input`.
        ///
        /// [`None`] is returned if the `input` is blank, meaning no search.
        #[must_use]
        pub fn new(input: impl AsRef<str>) -> Option<Self> {
            let input = input.as_ref().trim();
            (!input.is_empty()).then(|| Self(input.to_lowercase()))
        }

        /// Returns the lowercased needle of this [`Search`].
        #[must_use]
        pub fn needle(&self) -> &str {
            &self.0
        }

        /// Indicates whether the provided [`Property`] matches this
        /// [`Search`].
        #[must_use]
        pub fn matches(&self, property: &Property) -> bool {
            let fields: [&str; 3] = [
                property.title.as_ref(),
                property.location.as_ref(),
                property.description.as_ref(),
            ];
            fields
                .into_iter()
                .any(|text| text.to_lowercase().contains(&self.0))
        }
    }

    /// Inclusive price bracket.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct PriceRange {
        /// Lower bound, if any.
        pub min: Option<Money>,

        /// Upper bound, if any.
        pub max: Option<Money>,
    }

    impl PriceRange {
        /// Standard brackets offered to catalog visitors.
        pub const BRACKETS: &'static [&'static str] = &[
            "0-50000",
            "50000-100000",
            "100000-200000",
            "200000-500000",
            "500000",
        ];

        /// [`PriceRange`] without any bounds.
        pub const ANY: Self = Self {
            min: None,
            max: None,
        };

        /// Indicates whether the provided `price` falls into this
        /// [`PriceRange`].
        #[must_use]
        pub fn contains(&self, price: Money) -> bool {
            self.min.map_or(true, |min| price >= min)
                && self.max.map_or(true, |max| price <= max)
        }
    }

    impl FromStr for PriceRange {
        type Err = InvalidPriceRange;

        /// Parses a bracket token of the `min-max` or `min` form.
        ///
        /// An empty token or `all` means no bounds at all. A zero or empty
        /// `max` means the bracket is open-ended.
        fn from_str(s: &str) -> Result<Self, Self::Err> {
            let token = s.trim();
            if token.is_empty() || token.eq_ignore_ascii_case("all") {
                return Ok(Self::ANY);
            }

            let bound = |b: &str| -> Result<Option<Money>, InvalidPriceRange> {
                let b = b.trim();
                if b.is_empty() {
                    return Ok(None);
                }
                b.parse().map(Some).map_err(|_| InvalidPriceRange)
            };
            let (min, max) = match token.split_once('-') {
                Some((min, max)) => (bound(min)?, bound(max)?),
                None => (bound(token)?, None),
            };
            let max = max.filter(|m| *m != Money::ZERO);

            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    return Err(InvalidPriceRange);
                }
            }
            Ok(Self { min, max })
        }
    }

    /// Error of parsing a [`PriceRange`] bracket token.
    #[derive(Clone, Copy, Debug, Display, Error)]
    #[display("invalid price range")]
    pub struct InvalidPriceRange;

    #[cfg(test)]
    mod spec {
        use common::Money;

        use crate::domain::{
            profile,
            property::{self, Description, Details, Location, Title},
            Property,
        };

        use super::{Filter, PriceRange, Search};

        fn property(title: &str, location: &str, price: u64) -> Property {
            Property::new(
                property::Id::new(),
                profile::Id::new(),
                Details {
                    title: Title::new(title).unwrap(),
                    description: Description::new("Near the main road")
                        .unwrap(),
                    kind: property::Kind::Rent,
                    price: Money::from_shillings(price),
                    location: Location::new(location).unwrap(),
                    bedrooms: None,
                    bathrooms: None,
                    area_sqft: None,
                    amenities: vec![],
                },
                vec![],
            )
        }

        fn range(token: &str) -> PriceRange {
            token.parse().unwrap()
        }

        #[test]
        fn parses_brackets() {
            assert_eq!(range(""), PriceRange::ANY);
            assert_eq!(range("all"), PriceRange::ANY);
            assert_eq!(
                range("50000-100000"),
                PriceRange {
                    min: Some(Money::from_shillings(50_000)),
                    max: Some(Money::from_shillings(100_000)),
                },
            );
            assert_eq!(
                range("500000"),
                PriceRange {
                    min: Some(Money::from_shillings(500_000)),
                    max: None,
                },
            );
            assert_eq!(range("500000-0"), range("500000"));
            assert_eq!(range("500000-"), range("500000"));

            for token in PriceRange::BRACKETS {
                assert!(token.parse::<PriceRange>().is_ok(), "{token}");
            }
        }

        #[test]
        fn rejects_invalid_brackets() {
            for token in ["cheap", "100-abc", "200000-100000", "1-2-3"] {
                assert!(token.parse::<PriceRange>().is_err(), "{token}");
            }
        }

        #[test]
        fn bounds_are_inclusive() {
            let r = range("50000-100000");

            assert!(r.contains(Money::from_shillings(50_000)));
            assert!(r.contains(Money::from_shillings(100_000)));
            assert!(!r.contains(Money::from_shillings(49_999)));
            assert!(!r.contains(Money::from_shillings(100_001)));
        }

        #[test]
        fn open_ended_bracket_includes_any_higher_price() {
            let r = range("500000");

            assert!(r.contains(Money::from_shillings(500_000)));
            assert!(r.contains(Money::from_shillings(987_654_321)));
            assert!(!r.contains(Money::from_shillings(499_999)));
        }

        #[test]
        fn searches_case_insensitively() {
            let p = property("Cozy Bedsitter", "Westlands, Nairobi", 15_000);

            assert!(Search::new("bedsitter").unwrap().matches(&p));
            assert!(Search::new("  NAIROBI ").unwrap().matches(&p));
            assert!(Search::new("main ROAD").unwrap().matches(&p));
            assert!(!Search::new("Mombasa").unwrap().matches(&p));
            assert!(Search::new("   ").is_none());
        }

        #[test]
        fn composes_filters() {
            let p = property("Cozy Bedsitter", "Westlands, Nairobi", 15_000);

            assert!(Filter::default().matches(&p));
            assert!(Filter {
                search: Search::new("westlands"),
                kind: Some(property::Kind::Rent),
                price: range("0-50000"),
            }
            .matches(&p));
            assert!(!Filter {
                search: Search::new("westlands"),
                kind: Some(property::Kind::Sale),
                price: range("0-50000"),
            }
            .matches(&p));
            assert!(!Filter {
                search: None,
                kind: None,
                price: range("50000-100000"),
            }
            .matches(&p));
        }
    }
}

/// Contact details of a [`Property`] landlord, visible only to the landlord
/// themselves, admins, and users who purchased them.
///
/// [`Property`]: crate::domain::Property
#[derive(Clone, Debug, Default)]
pub struct Contact {
    /// [`profile::Phone`] of the landlord.
    pub phone: Option<profile::Phone>,

    /// [`profile::Email`] of the landlord.
    pub email: Option<profile::Email>,
}
