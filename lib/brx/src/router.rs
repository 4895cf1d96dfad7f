//! Route table and authentication guards.
//!
//! Guards run once per [`Router::navigate`] call, before a page is produced.
//! Changing the token with [`Router::set_token`] does not re-check the
//! current location.

use derive_more::Display;
use tracing::debug;

/// Path of the sign-in page.
pub const LOGIN_PATH: &str = "/auth/login";
/// Path of the sign-up page.
pub const SIGNUP_PATH: &str = "/auth/signup";
/// Path of the home page.
pub const HOME_PATH: &str = "/";
/// Path of the posts page.
pub const POSTS_PATH: &str = "/posts";

/// Whether the user is signed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum AuthState {
    /// No token.
    #[display("unauthenticated")]
    Unauthenticated,
    /// A non-empty token is present.
    #[display("authenticated")]
    Authenticated,
}

/// State shared by every route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteContext {
    /// Authentication token, if any.
    pub token: Option<String>,
}

impl RouteContext {
    /// A context holding `token`.
    #[must_use]
    pub const fn new(token: Option<String>) -> Self {
        Self { token }
    }

    /// Derived authentication state. An empty token counts as absent.
    #[must_use]
    pub fn auth_state(&self) -> AuthState {
        match self.token.as_deref() {
            Some(token) if !token.is_empty() => AuthState::Authenticated,
            _ => AuthState::Unauthenticated,
        }
    }
}

/// Pages of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Page {
    /// `/`
    Home,
    /// `/posts`
    Posts,
    /// `/auth/login`
    Login,
    /// `/auth/signup`
    Signup,
    /// Anything else.
    NotFound,
}

/// Who may see a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Guard {
    /// Signed-in users only.
    Authenticated,
    /// Signed-out users only.
    Guest,
}

/// One entry of the route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// Path, without basepath.
    pub path: &'static str,
    /// Page rendered.
    pub page: Page,
    /// Access rule.
    pub guard: Guard,
}

/// The route table.
pub const ROUTES: [Route; 4] = [
    Route {
        path: HOME_PATH,
        page: Page::Home,
        guard: Guard::Authenticated,
    },
    Route {
        path: POSTS_PATH,
        page: Page::Posts,
        guard: Guard::Authenticated,
    },
    Route {
        path: LOGIN_PATH,
        page: Page::Login,
        guard: Guard::Guest,
    },
    Route {
        path: SIGNUP_PATH,
        page: Page::Signup,
        guard: Guard::Guest,
    },
];

/// A resolved location, basepath removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    /// Normalized path, starting with `/` and without trailing slash.
    pub path: String,
    /// Decoded search parameters, in order.
    pub search: Vec<(String, String)>,
}

impl Location {
    /// First value of the search parameter `name`.
    #[must_use]
    pub fn search_param(&self, name: &str) -> Option<&str> {
        self.search
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Outcome of a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Go to this href (basepath included) instead.
    Redirect(String),
    /// Show `page`.
    Render {
        /// The page.
        page: Page,
        /// Where it was reached.
        location: Location,
    },
}

/// Resolves hrefs to pages, applying the auth guards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Router {
    basepath: String,
    context: RouteContext,
}

impl Router {
    /// Create a router. `basepath` is the prefix every href carries, `/` for none.
    #[must_use]
    pub fn new(basepath: &str, context: RouteContext) -> Self {
        Self {
            basepath: normalize_path(basepath),
            context,
        }
    }

    /// The basepath.
    #[must_use]
    pub fn basepath(&self) -> &str {
        &self.basepath
    }

    /// The route context.
    #[must_use]
    pub const fn context(&self) -> &RouteContext {
        &self.context
    }

    /// Replace the token. Takes effect on the next navigation only.
    pub fn set_token(&mut self, token: Option<String>) {
        self.context.token = token;
    }

    /// Resolve `href` and run the guards.
    #[must_use]
    pub fn navigate(&self, href: &str) -> Navigation {
        let location = self.resolve(href);
        let route = ROUTES.iter().find(|route| route.path == location.path);
        let auth = self.context.auth_state();

        let target = match (route.map(|route| route.guard), auth) {
            (Some(Guard::Authenticated), AuthState::Unauthenticated) => Some(LOGIN_PATH),
            (Some(Guard::Guest), AuthState::Authenticated) => Some(HOME_PATH),
            _ => None,
        };

        if let Some(target) = target {
            let href = self.href(target);
            debug!(from = %location.path, to = %href, %auth, "navigation redirected");
            return Navigation::Redirect(href);
        }

        let page = route.map_or(Page::NotFound, |route| route.page);
        debug!(path = %location.path, %page, "navigation resolved");
        Navigation::Render { page, location }
    }

    /// Prefix `path` with the basepath.
    #[must_use]
    pub fn href(&self, path: &str) -> String {
        let path = normalize_path(path);
        match (self.basepath.as_str(), path.as_str()) {
            ("/", path) => path.to_string(),
            (base, "/") => base.to_string(),
            (base, path) => format!("{base}{path}"),
        }
    }

    fn resolve(&self, href: &str) -> Location {
        let href = href.split_once('#').map_or(href, |(before, _)| before);
        let (raw_path, query) = href.split_once('?').unwrap_or((href, ""));

        let path = normalize_path(raw_path);
        let path = if self.basepath == "/" {
            path
        } else {
            match path.strip_prefix(&self.basepath) {
                Some("") => "/".to_string(),
                Some(rest) if rest.starts_with('/') => rest.to_string(),
                _ => path,
            }
        };

        let search = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();

        Location { path, search }
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}")
    }
}
