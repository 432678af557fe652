use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRequest, RequestParts},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Redirect, Response},
};
use coolstory_identity::{
    cookie::{self, Cookie},
    local_path, Session, SharedIdentity, Tokens,
};
use serde::de::DeserializeOwned;

use crate::Error;

/// The visitor behind a request, resolved from the token cookie.
///
/// Never rejects: a missing or broken session is an anonymous visitor.
pub struct Visitor(pub Session);

#[async_trait]
impl<B> FromRequest<B> for Visitor
where
    B: Send,
{
    type Rejection = Infallible;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let identity = match req.extensions().get::<SharedIdentity>() {
            Some(identity) => identity.clone(),
            None => {
                tracing::warn!("no identity provider installed");

                return Ok(Self(Session::anonymous()));
            }
        };

        let tokens = read_cookie::<Tokens>(req.headers(), cookie::TOKENS);

        Ok(Self(Session::resolve(identity.as_ref(), tokens).await))
    }
}

pub fn read_cookie<T>(headers: &HeaderMap, name: &str) -> Option<T>
where
    T: DeserializeOwned,
{
    let raw = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| cookie::find(value, name))?;

    match cookie::decode(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(error = ?err, cookie = name, "ignoring unreadable cookie");

            None
        }
    }
}

pub fn with_cookies<R>(response: R, cookies: &[Cookie<'static>]) -> Result<Response, Error>
where
    R: IntoResponse,
{
    let mut response = response.into_response();

    for cookie in cookies {
        let value = HeaderValue::from_str(&cookie.to_string()).map_err(Error::from_any)?;

        response.headers_mut().append(header::SET_COOKIE, value);
    }

    Ok(response)
}

/// Sends an anonymous visitor to sign in, coming back to `return_to`.
pub fn login_redirect(return_to: &str) -> Result<Response, Error> {
    let query = serde_urlencoded::to_string(&[("return_to", local_path(return_to))])
        .map_err(Error::from_any)?;

    Ok(Redirect::to(&format!("/login?{}", query)).into_response())
}
