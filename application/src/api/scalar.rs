//! GraphQL scalar definitions.

use std::{fmt, marker::PhantomData, str::FromStr};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use derive_more::{Debug, Into};
use juniper::{
    GraphQLScalar, GraphQLType, InputValue, ParseScalarResult,
    ParseScalarValue, ScalarToken, ScalarValue, Value,
};

/// Helper type to use in `#[graphql(with = ..)]` attribute.
///
/// Uses [`FromStr`]/[`Display`] impls of `As` type to convert the target type
/// to/from GraphQL scalar.
///
/// Target type must implement [`TryFrom`] and [`AsRef`] for `As` type.
///
/// [`Display`]: fmt::Display
#[derive(Debug)]
pub struct Via<As>(PhantomData<As>);

impl<As> Via<As> {
    /// Convert the target type into scalar [`Value`] by using [`Display`] impl
    /// of `As` type.
    ///
    /// [`Display`]: fmt::Display
    pub fn to_output<T, S>(value: &T) -> Value<S>
    where
        As: fmt::Display,
        T: AsRef<As>,
        S: ScalarValue,
    {
        Value::from(value.as_ref().to_string())
    }

    /// Constructs the target type from scalar [`Value`] by using [`FromStr`]
    /// impl of `As` type.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the input value is not a string;
    /// - the input value cannot be parsed into `As` type;
    /// - the parsed value cannot be converted into the target type.
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    pub fn from_input<T, S>(input: &InputValue<S>) -> Result<T, String>
    where
        As: FromStr + fmt::Display,
        As::Err: fmt::Display,
        T: TryFrom<As> + GraphQLType<S, TypeInfo = ()>,
        T::Error: fmt::Display,
        S: ScalarValue,
    {
        let s = input.as_string_value().ok_or_else(|| {
            format!(
                "Cannot parse input scalar `{}`: expected string input \
                 value, found: {input}",
                T::name(&()).expect("always has a name"),
            )
        })?;
        s.parse::<As>()
            .map_err(|e| {
                format!(
                    "Cannot parse input scalar `{}` from \"{s}\" string: {e}",
                    T::name(&()).expect("always has a name"),
                )
            })?
            .try_into()
            .map_err(|e| {
                format!(
                    "Cannot parse input scalar `{}`: {e}",
                    T::name(&()).expect("always has a name"),
                )
            })
    }

    /// Parse the provided [`ScalarToken`].
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be parsed as [`String`].
    pub fn parse_token<S: ScalarValue>(
        value: ScalarToken<'_>,
    ) -> ParseScalarResult<S> {
        <String as ParseScalarValue<S>>::from_str(value)
    }
}

/// Binary data encoded as a standard Base64 string.
///
/// A data URL prefix (e.g. `data:image/png;base64,`) is accepted and ignored.
#[derive(Clone, Debug, GraphQLScalar, Into)]
#[debug("Base64({} bytes)", _0.len())]
#[graphql(with = Self, parse_token(String))]
pub struct Base64(Vec<u8>);

impl Base64 {
    /// Decodes the provided Base64 `input`, stripping a data URL prefix, if
    /// any.
    ///
    /// # Errors
    ///
    /// If the `input` is not a valid Base64.
    pub fn decode(input: &str) -> Result<Self, base64::DecodeError> {
        let data = input
            .split_once(";base64,")
            .filter(|(prefix, _)| prefix.starts_with("data:"))
            .map_or(input, |(_, data)| data);
        BASE64.decode(data.trim()).map(Self)
    }

    /// Returns the decoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn to_output<S: ScalarValue>(v: &Self) -> Value<S> {
        Value::scalar(BASE64.encode(&v.0))
    }

    fn from_input<S: ScalarValue>(input: &InputValue<S>) -> Result<Self, String> {
        let s = input.as_string_value().ok_or_else(|| {
            format!(
                "Cannot parse `Base64` input scalar from non-string value: \
                 {input}",
            )
        })?;
        Self::decode(s)
            .map_err(|e| format!("Cannot parse `Base64` input scalar: {e}"))
    }
}

#[cfg(test)]
mod spec {
    use super::Base64;

    #[test]
    fn decodes_plain_and_data_url() {
        assert_eq!(Base64::decode("AQID").unwrap().as_bytes(), [1, 2, 3]);
        assert_eq!(
            Base64::decode("data:image/png;base64,AQID")
                .unwrap()
                .as_bytes(),
            [1, 2, 3],
        );
        assert!(Base64::decode("not base64!").is_err());
    }
}
