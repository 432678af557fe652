use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::HeaderMap,
    response::{Redirect, Response},
};
use coolstory_identity::{cookie, local_path, OAuthData, SharedIdentity};

use crate::{
    session::{read_cookie, with_cookies, Visitor},
    Error, Site,
};

#[derive(Debug, serde::Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    return_to: Option<String>,
}

#[tracing::instrument(skip(identity, site, session))]
pub async fn login(
    Extension(identity): Extension<SharedIdentity>,
    Extension(site): Extension<Arc<Site>>,
    Visitor(session): Visitor,
    Query(query): Query<LoginQuery>,
) -> Result<Response, Error> {
    let return_to = local_path(query.return_to.as_deref().unwrap_or("/"));

    if session.is_authenticated() {
        return with_cookies(Redirect::to(return_to), &[]);
    }

    let redirect = identity
        .begin_login(&site.callback_url(), return_to)
        .await?;

    let oauth = cookie::set(
        cookie::OAUTH,
        cookie::encode(&redirect.oauth)?,
        cookie::OAUTH_MAX_AGE,
        site.secure_cookies(),
    );

    with_cookies(Redirect::to(&redirect.auth_url), &[oauth])
}

#[derive(serde::Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub async fn callback(
    Extension(identity): Extension<SharedIdentity>,
    Extension(site): Extension<Arc<Site>>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, Error> {
    let oauth = match read_cookie::<OAuthData>(&headers, cookie::OAUTH) {
        Some(oauth) => oauth,
        None => {
            tracing::warn!("OAuth data not found, was the login started here?");

            return with_cookies(Redirect::to("/"), &[]);
        }
    };

    if let Some(error) = query.error.as_deref() {
        tracing::warn!(error = %error, "provider refused the login");

        return with_cookies(Redirect::to("/"), &[cookie::clear(cookie::OAUTH)]);
    }

    let code = query.code.unwrap_or_default();
    let state = query.state.unwrap_or_default();

    match identity.complete_login(&code, &state, &oauth).await {
        Ok(tokens) => {
            tracing::info!("member signed in");

            let tokens = cookie::set(
                cookie::TOKENS,
                cookie::encode(&tokens)?,
                cookie::TOKENS_MAX_AGE,
                site.secure_cookies(),
            );

            with_cookies(
                Redirect::to(local_path(&oauth.return_to)),
                &[tokens, cookie::clear(cookie::OAUTH)],
            )
        }
        Err(err) => {
            tracing::warn!(error = ?err, "unable to complete login");

            with_cookies(Redirect::to("/"), &[cookie::clear(cookie::OAUTH)])
        }
    }
}

pub async fn logout() -> Result<Response, Error> {
    with_cookies(Redirect::to("/"), &[cookie::clear(cookie::TOKENS)])
}
