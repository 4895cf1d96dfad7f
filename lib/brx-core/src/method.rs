//! Request verbs.

use std::str::FromStr;

use derive_more::Display;

use crate::Error;

/// The verbs the Request Service speaks.
///
/// GET and DELETE never carry a body; the other three may.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Method {
    /// Read.
    #[display("GET")]
    Get,
    /// Create.
    #[display("POST")]
    Post,
    /// Replace.
    #[display("PUT")]
    Put,
    /// Update in place.
    #[display("PATCH")]
    Patch,
    /// Remove.
    #[display("DELETE")]
    Delete,
}

impl Method {
    /// Every verb, in declaration order.
    pub const ALL: [Self; 5] = [Self::Get, Self::Post, Self::Put, Self::Patch, Self::Delete];

    /// Whether a request body may be attached.
    #[must_use]
    pub const fn allows_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl FromStr for Method {
    type Err = Error;

    /// Case-insensitive lookup by name.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.to_string().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| Error::invalid_request(format!("unsupported method {name:?}")))
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Put => Self::PUT,
            Method::Patch => Self::PATCH,
            Method::Delete => Self::DELETE,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    #[test]
    fn only_write_verbs_take_a_body() {
        let with_body: Vec<_> = Method::ALL
            .into_iter()
            .filter(Method::allows_body)
            .collect();
        check!(with_body == [Method::Post, Method::Put, Method::Patch]);
    }

    #[test]
    fn names_round_trip_through_display() {
        for method in Method::ALL {
            let parsed: Method = method.to_string().to_lowercase().parse().expect("known verb");
            check!(parsed == method);
            check!(http::Method::from(method).as_str() == method.to_string());
        }
    }

    #[test]
    fn unknown_names_are_rejected() {
        let_assert!(Err(Error::InvalidRequest(message)) = "OPTIONS".parse::<Method>());
        check!(message.contains("OPTIONS"));
    }
}
