//! [`Money`]-related definitions.

use std::{fmt, iter, ops, str::FromStr};

use rust_decimal::{prelude::ToPrimitive as _, Decimal};

/// Non-negative amount of money in Kenyan shillings (KES).
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Money(Decimal);

impl Money {
    /// Zero [`Money`].
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Creates a new [`Money`] out of the provided `amount`.
    ///
    /// [`None`] is returned if the `amount` is negative.
    #[must_use]
    pub fn new(amount: Decimal) -> Option<Self> {
        (!amount.is_sign_negative() || amount.is_zero())
            .then(|| Self(amount.normalize()))
    }

    /// Creates a new [`Money`] out of whole shillings.
    #[must_use]
    pub fn from_shillings(amount: u64) -> Self {
        Self(Decimal::from(amount))
    }

    /// Returns the decimal amount of this [`Money`].
    #[must_use]
    pub fn amount(self) -> Decimal {
        self.0
    }

    /// Returns this [`Money`] as whole shillings, if it has no fractional
    /// part.
    #[must_use]
    pub fn whole_shillings(self) -> Option<u64> {
        self.0.is_integer().then(|| self.0.to_u64()).flatten()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Money {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s
            .strip_prefix("KES")
            .or_else(|| s.strip_prefix("KSh"))
            .unwrap_or(s)
            .trim()
            .replace(',', "");
        if s.is_empty() {
            return Err("empty amount");
        }
        let amount = Decimal::from_str(&s).map_err(|_| "invalid amount")?;
        Self::new(amount).ok_or("negative amount")
    }
}

impl ops::Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, ops::Add::add)
    }
}

#[cfg(feature = "postgres")]
mod postgres {
    //! Module providing integration with [`postgres_types`] crate.

    use std::error::Error as StdError;

    use postgres_types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    };
    use rust_decimal::Decimal;

    use super::Money;

    impl FromSql<'_> for Money {
        accepts!(NUMERIC);

        fn from_sql(
            ty: &Type,
            raw: &[u8],
        ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
            Money::new(Decimal::from_sql(ty, raw)?)
                .ok_or_else(|| "negative `Money` amount".into())
        }
    }

    impl ToSql for Money {
        accepts!(NUMERIC);
        to_sql_checked!();

        fn to_sql(
            &self,
            ty: &Type,
            w: &mut BytesMut,
        ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
            self.0.to_sql(ty, w)
        }
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! Module providing integration with [`juniper`] crate.

    use std::str::FromStr as _;

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};
    use rust_decimal::Decimal;

    /// Amount of Kenyan shillings as a decimal string (e.g. `"1500"` or
    /// `"1500.50"`). Numeric inputs are accepted as well.
    #[graphql_scalar(with = Self, parse_token(String, i32, f64))]
    type Money = super::Money;

    impl Money {
        fn to_output<S: ScalarValue>(m: &Money) -> Value<S> {
            Value::scalar(m.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            if let Some(s) = input.as_string_value() {
                return Self::from_str(s).map_err(|e| {
                    format!("Cannot parse `Money` input scalar: {e}")
                });
            }
            let amount = if let Some(i) = input.as_int_value() {
                Decimal::from(i)
            } else if let Some(f) = input.as_float_value() {
                Decimal::try_from(f).map_err(|e| {
                    format!("Cannot parse `Money` input scalar: {e}")
                })?
            } else {
                return Err(format!(
                    "Cannot parse `Money` input scalar from value: {input}",
                ));
            };
            Self::new(amount).ok_or_else(|| {
                "Cannot parse `Money` input scalar: negative amount".to_owned()
            })
        }
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use rust_decimal::Decimal;

    use super::Money;

    fn money(s: &str) -> Money {
        Money::new(s.parse::<Decimal>().unwrap()).unwrap()
    }

    #[test]
    fn from_str() {
        assert_eq!(Money::from_str("1500").unwrap(), money("1500"));
        assert_eq!(Money::from_str(" 1500.50 ").unwrap(), money("1500.5"));
        assert_eq!(Money::from_str("KES 200").unwrap(), money("200"));
        assert_eq!(Money::from_str("KSh 1,250,000").unwrap(), money("1250000"));
        assert_eq!(Money::from_str("0").unwrap(), Money::ZERO);

        assert!(Money::from_str("").is_err());
        assert!(Money::from_str("KES").is_err());
        assert!(Money::from_str("-1").is_err());
        assert!(Money::from_str("12abc").is_err());
    }

    #[test]
    fn to_string() {
        assert_eq!(money("1500.00").to_string(), "1500");
        assert_eq!(money("1500.50").to_string(), "1500.5");
        assert_eq!(Money::from_shillings(200).to_string(), "200");
    }

    #[test]
    fn whole_shillings() {
        assert_eq!(money("200").whole_shillings(), Some(200));
        assert_eq!(money("200.00").whole_shillings(), Some(200));
        assert_eq!(money("200.5").whole_shillings(), None);
    }

    #[test]
    fn sums() {
        let total: Money =
            [money("200"), money("200"), money("150.5")].into_iter().sum();
        assert_eq!(total, money("550.5"));
        assert_eq!(std::iter::empty::<Money>().sum::<Money>(), Money::ZERO);
    }

    #[test]
    fn orders_by_amount() {
        assert!(money("50000") < money("100000"));
        assert!(money("100000.01") > money("100000"));
    }
}
