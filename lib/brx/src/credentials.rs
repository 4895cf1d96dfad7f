//! Credential providers.
//!
//! A [`TokenProvider`] is injected into whatever builds an authenticated
//! client. It is consulted once, when the client is constructed.

use std::sync::Arc;

/// Supplies the bearer token used by authenticated clients.
pub trait TokenProvider: Send + Sync {
    /// The current token, or `None` when the user is not signed in.
    fn token(&self) -> Option<String>;
}

impl<P: TokenProvider + ?Sized> TokenProvider for Arc<P> {
    fn token(&self) -> Option<String> {
        (**self).token()
    }
}

impl<P: TokenProvider + ?Sized> TokenProvider for &P {
    fn token(&self) -> Option<String> {
        (**self).token()
    }
}

/// A fixed token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    /// A provider always returning `token`.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    /// A provider that never has a token.
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Reads the token from an environment variable. Empty values count as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    /// Default variable name.
    pub const DEFAULT_VAR: &str = "BRX_AUTH_TOKEN";

    /// Read from `var`.
    #[must_use]
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    /// The variable name.
    #[must_use]
    pub fn var(&self) -> &str {
        &self.var
    }
}

impl Default for EnvToken {
    fn default() -> Self {
        Self::new(Self::DEFAULT_VAR)
    }
}

impl TokenProvider for EnvToken {
    fn token(&self) -> Option<String> {
        std::env::var(&self.var)
            .ok()
            .filter(|token| !token.is_empty())
    }
}

/// The template's placeholder provider: always the literal `"token"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemplateToken;

impl TemplateToken {
    /// The token returned.
    pub const TOKEN: &str = "token";
}

impl TokenProvider for TemplateToken {
    fn token(&self) -> Option<String> {
        Some(Self::TOKEN.to_string())
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::*;

    #[test]
    fn static_token() {
        check!(StaticToken::new("abc").token().as_deref() == Some("abc"));
        check!(StaticToken::none().token().is_none());
    }

    #[test]
    fn template_token() {
        check!(TemplateToken.token().as_deref() == Some("token"));
    }

    #[test]
    fn env_token_missing_variable() {
        let provider = EnvToken::new("BRX_TEST_TOKEN_THAT_IS_NEVER_SET");
        check!(provider.token().is_none());
        check!(provider.var() == "BRX_TEST_TOKEN_THAT_IS_NEVER_SET");
    }

    #[test]
    fn providers_behind_arc() {
        let provider: Arc<dyn TokenProvider> = Arc::new(StaticToken::new("shared"));
        check!(provider.token().as_deref() == Some("shared"));
    }
}
