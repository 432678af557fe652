mod api;
mod auth;
mod error;
mod forms;
mod pages;
mod readable;
mod session;
mod views;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    error_handling::HandleErrorLayer,
    extract::Extension,
    handler::Handler as _,
    http::StatusCode,
    routing::{get, post},
    BoxError, Router, Server,
};
use coolstory_common::{Backend, Conf, Context as _, Report};
use coolstory_content::{fixture::bundled_comments, CommentBoard, SharedContent};
use coolstory_identity::SharedIdentity;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub use crate::error::Error;

/// Where this site is reachable from the outside.
#[derive(Clone, Debug)]
pub struct Site {
    pub public_url: String,
}

impl Site {
    pub fn new(public_url: impl Into<String>) -> Self {
        Self {
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn callback_url(&self) -> String {
        format!("{}/auth/callback", self.public_url)
    }

    pub fn secure_cookies(&self) -> bool {
        self.public_url.starts_with("https://")
    }
}

pub struct Services {
    pub content: SharedContent,
    pub identity: SharedIdentity,
    pub comments: Arc<CommentBoard>,
    pub site: Site,
}

pub fn app(services: Services) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/groups", get(pages::groups))
        .route("/groups/:slug", get(pages::group))
        .route("/groups/:slug/join", post(forms::join))
        .route(
            "/stories/new",
            get(pages::new_story).post(forms::create_story),
        )
        .route("/stories/:id", get(pages::story))
        .route("/stories/:id/like", post(forms::like))
        .route("/stories/:id/comments", post(forms::comment))
        .route("/profile", get(pages::profile))
        .route("/about", get(pages::about))
        .route("/api/stories", get(api::stories))
        .route("/login", get(auth::login))
        .route("/auth/callback", get(auth::callback))
        .route("/logout", get(auth::logout).post(auth::logout))
        .fallback(pages::fallback.into_service())
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(|error: BoxError| async move {
                    if error.is::<tower::timeout::error::Elapsed>() {
                        (StatusCode::REQUEST_TIMEOUT, String::new())
                    } else {
                        (StatusCode::INTERNAL_SERVER_ERROR, String::new())
                    }
                }))
                .load_shed()
                .concurrency_limit(1024)
                .timeout(Duration::from_secs(10))
                .layer(Extension(services.content))
                .layer(Extension(services.identity))
                .layer(Extension(services.comments))
                .layer(Extension(Arc::new(services.site)))
                .layer(TraceLayer::new_for_http())
                .into_inner(),
        )
}

pub async fn run(conf: &Conf) -> Result<(), Report> {
    let content = coolstory_content::init_content_source(conf)?;
    let identity = coolstory_identity::init_identity(conf)?;

    let seed = match conf.backend()? {
        Backend::Fixture => bundled_comments()?,
        Backend::Cms => Vec::new(),
    };

    let app = app(Services {
        content,
        identity,
        comments: Arc::new(CommentBoard::new(seed)),
        site: Site::new(conf.public_url()),
    });

    let addr: SocketAddr = conf
        .bind()
        .parse()
        .with_context(|| format!("invalid bind address `{}`", conf.bind()))?;

    tracing::info!(%addr, backend = ?conf.backend()?, "starting server");

    Server::bind(&addr).serve(app.into_make_service()).await?;

    Ok(())
}
