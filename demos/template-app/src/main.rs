//! Template application
//!
//! Resolves an href through the router and renders the page it lands on.
//!
//! ```text
//! BRX_PORT=3000 cargo run -p template-app -- /posts?limit=3
//! ```

#![allow(missing_docs)]
#![allow(clippy::print_stdout)]

use brx::{
    AppConfig, ClientFactory, EnvToken, HyperClient, Navigation, Page, PostController, PostsPage,
    QueryClient, RouteContext, Router, StaticToken, TemplateToken, TokenProvider,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const FALLBACK_API_BASE: &str = "https://jsonplaceholder.typicode.com";

#[tokio::main]
async fn main() -> brx::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let (api_base, basepath) = match AppConfig::from_env() {
        Ok(config) => {
            info!(port = %config.port, repo = ?config.repo_name, "configuration loaded");
            let base = config.api_base();
            let base = if base.is_empty() {
                FALLBACK_API_BASE.to_string()
            } else {
                base
            };
            (base, config.basepath)
        }
        Err(err) => {
            warn!(error = %err, "using default configuration");
            (FALLBACK_API_BASE.to_string(), "/".to_string())
        }
    };

    let token = EnvToken::default().token().or_else(|| TemplateToken.token());
    let router = Router::new(&basepath, RouteContext::new(token.clone()));
    let factory = ClientFactory::new(
        api_base,
        token.map_or_else(StaticToken::none, StaticToken::new),
        HyperClient::builder().with_logging().build(),
    );

    let href = std::env::args()
        .nth(1)
        .unwrap_or_else(|| router.href(brx::POSTS_PATH));

    for line in render(&router, &factory, &QueryClient::new(), &href).await {
        println!("{line}");
    }
    Ok(())
}

/// Lines printed for `href`.
async fn render(
    router: &Router,
    factory: &ClientFactory,
    client: &QueryClient,
    href: &str,
) -> Vec<String> {
    match router.navigate(href) {
        Navigation::Redirect(target) => vec![format!("redirect: {target}")],
        Navigation::Render {
            page: Page::Posts,
            location,
        } => {
            let page = PostsPage::new(PostController::new(factory.public()));
            let view = page.view(client, &location).await;
            match view.error {
                Some(error) => vec![format!("error: {error}")],
                None => {
                    let mut lines = vec![format!("{} post(s), limit {}", view.posts.len(), view.limit)];
                    lines.extend(view.posts.iter().map(|post| format!("- {}", post.title)));
                    lines
                }
            }
        }
        Navigation::Render { page, .. } => vec![format!("page: {page}")],
    }
}
