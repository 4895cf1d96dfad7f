use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{Error, Result, from_value};

/// Validation gate applied to a resolved value before it is cached or returned.
pub trait Schema: Send + Sync {
    /// What the fetch function resolves to.
    type Input;
    /// What the query yields.
    type Output;

    /// Validate `input`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the value does not match.
    fn parse(&self, input: Self::Input) -> Result<Self::Output>;
}

/// No validation.
pub struct Unchecked<T>(PhantomData<fn() -> T>);

impl<T> Unchecked<T> {
    /// Create the identity schema.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Unchecked<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Unchecked<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Unchecked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Unchecked")
    }
}

impl<T> Schema for Unchecked<T> {
    type Input = T;
    type Output = T;

    fn parse(&self, input: T) -> Result<T> {
        Ok(input)
    }
}

/// Decodes an untyped JSON value into `T`, reporting the failing path.
///
/// ```
/// use brx::{JsonSchema, Schema};
///
/// let schema = JsonSchema::<Vec<u32>>::new();
/// assert_eq!(schema.parse(serde_json::json!([1, 2])).ok(), Some(vec![1, 2]));
/// assert!(schema.parse(serde_json::json!(["x"])).is_err());
/// ```
pub struct JsonSchema<T>(PhantomData<fn() -> T>);

impl<T> JsonSchema<T> {
    /// Create the schema.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for JsonSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonSchema<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JsonSchema<{}>", std::any::type_name::<T>())
    }
}

impl<T: DeserializeOwned> Schema for JsonSchema<T> {
    type Input = Value;
    type Output = T;

    fn parse(&self, input: Value) -> Result<T> {
        from_value(input).map_err(|(path, message)| Error::validation(path, message))
    }
}

/// Checks a typed value with a predicate.
///
/// ```
/// use brx::{Schema, Validator};
///
/// let non_empty = Validator::new(|items: &Vec<u32>| {
///     if items.is_empty() { Err("expected at least one item".into()) } else { Ok(()) }
/// });
/// assert!(non_empty.parse(vec![]).is_err());
/// ```
pub struct Validator<T, F> {
    check: F,
    _marker: PhantomData<fn(T) -> T>,
}

impl<T, F> Validator<T, F>
where
    F: Fn(&T) -> std::result::Result<(), String>,
{
    /// Wrap a predicate returning the reason of a rejection.
    pub const fn new(check: F) -> Self {
        Self {
            check,
            _marker: PhantomData,
        }
    }
}

impl<T, F> fmt::Debug for Validator<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").finish_non_exhaustive()
    }
}

impl<T, F> Schema for Validator<T, F>
where
    F: Fn(&T) -> std::result::Result<(), String> + Send + Sync,
{
    type Input = T;
    type Output = T;

    fn parse(&self, input: T) -> Result<T> {
        (self.check)(&input).map_err(|message| Error::validation("$", message))?;
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use serde_json::json;

    use super::*;
    use crate::{Post, Posts};

    #[test]
    fn unchecked_is_identity() {
        check!(Unchecked::<u8>::new().parse(7).ok() == Some(7));
    }

    #[test]
    fn json_schema_reports_the_failing_path() {
        let schema = JsonSchema::<Posts>::new();
        let payload = json!([
            { "userId": 1, "id": 1, "title": "a", "body": "b" },
            { "userId": "oops", "id": 2, "title": "c", "body": "d" },
        ]);

        let_assert!(Err(Error::Validation { path, .. }) = schema.parse(payload));
        check!(path == "[1].userId");
    }

    #[test]
    fn json_schema_accepts_matching_payload() {
        let schema = JsonSchema::<Post>::new();
        let post = schema
            .parse(json!({ "userId": 1, "id": 3, "title": "t", "body": "b" }))
            .expect("valid post");
        check!(post.id == 3);
    }

    #[test]
    fn validator_rejects_with_message() {
        let schema = Validator::new(|limit: &u32| {
            if *limit <= 100 {
                Ok(())
            } else {
                Err(format!("limit {limit} exceeds 100"))
            }
        });

        check!(schema.parse(10).ok() == Some(10));
        let_assert!(Err(Error::Validation { message, .. }) = schema.parse(500));
        check!(message == "limit 500 exceeds 100");
    }
}
