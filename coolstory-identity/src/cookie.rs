//! Session and pending-login cookies.

pub use ::cookie::Cookie;
use ::cookie::{time::Duration, SameSite};
use serde::{de::DeserializeOwned, Serialize};

use coolstory_common::{Context as _, Report};

/// Holds the member's tokens, same name and lifetime as the browser client used.
pub const TOKENS: &str = "wix_tokens";
pub const TOKENS_MAX_AGE: i64 = 7 * 24 * 60 * 60;

/// Holds the OAuth data between the redirect to the provider and the callback.
pub const OAUTH: &str = "coolstory_oauth";
pub const OAUTH_MAX_AGE: i64 = 10 * 60;

/// Finds `name` in a `Cookie` request header. Unparsable pairs are skipped.
pub fn find(header: &str, name: &str) -> Option<String> {
    Cookie::split_parse(header)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}

/// JSON, percent encoded so it stays a valid cookie value.
pub fn encode<T>(value: &T) -> Result<String, Report>
where
    T: Serialize,
{
    let json = serde_json::to_string(value)?;

    Ok(urlencoding::encode(&json).into_owned())
}

pub fn decode<T>(raw: &str) -> Result<T, Report>
where
    T: DeserializeOwned,
{
    let json = urlencoding::decode(raw).context("cookie is not valid percent encoding")?;

    serde_json::from_str(&json).context("cookie does not hold the expected json")
}

/// A site wide, script-invisible cookie.
pub fn set(name: &'static str, value: String, max_age: i64, secure: bool) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(max_age))
        .secure(secure)
        .finish()
}

/// A cookie that removes `name` from the browser.
pub fn clear(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build(name, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish();

    cookie.make_removal();

    cookie
}
