use isahc::{
    config::{Configurable as _, RedirectPolicy},
    http::{Method, StatusCode},
    AsyncReadResponseExt as _, HttpClient, Request,
};
use serde::de::DeserializeOwned;

use crate::{err, Context as _, Uri};

const USER_AGENT: &str = concat!("coolstory/", env!("CARGO_PKG_VERSION"));

pub fn client() -> Result<HttpClient, crate::Report> {
    let client = HttpClient::builder()
        .default_header("User-Agent", USER_AGENT)
        .default_header("Accept", "application/json")
        .redirect_policy(RedirectPolicy::Follow)
        .build()?;

    Ok(client)
}

/// Sends one JSON request and decodes the JSON answer.
///
/// Non 2xx answers become errors carrying the status and the body.
#[tracing::instrument(err, skip(client, uri, headers, body), fields(uri = %uri))]
pub async fn send_json<T>(
    client: &HttpClient,
    method: Method,
    uri: &Uri,
    headers: &[(&str, &str)],
    body: Option<&serde_json::Value>,
) -> Result<T, crate::Report>
where
    T: DeserializeOwned,
{
    let (status, text) = send(client, method, uri, headers, body).await?;

    if !status.is_success() {
        return Err(err!("`{}` answered {}: {}", uri, status, text));
    }

    decode(uri, &text)
}

/// Like [`send_json`], but a `404` answer is `None` instead of an error.
#[tracing::instrument(err, skip(client, uri, headers, body), fields(uri = %uri))]
pub async fn send_json_optional<T>(
    client: &HttpClient,
    method: Method,
    uri: &Uri,
    headers: &[(&str, &str)],
    body: Option<&serde_json::Value>,
) -> Result<Option<T>, crate::Report>
where
    T: DeserializeOwned,
{
    let (status, text) = send(client, method, uri, headers, body).await?;

    if status == StatusCode::NOT_FOUND {
        tracing::debug!("not found");

        return Ok(None);
    }

    if !status.is_success() {
        return Err(err!("`{}` answered {}: {}", uri, status, text));
    }

    decode(uri, &text).map(Some)
}

async fn send(
    client: &HttpClient,
    method: Method,
    uri: &Uri,
    headers: &[(&str, &str)],
    body: Option<&serde_json::Value>,
) -> Result<(StatusCode, String), crate::Report> {
    tracing::debug!(method = %method, "sending");

    let mut req = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        req = req.header(*name, *value);
    }

    let body = match body {
        Some(body) => {
            req = req.header("Content-Type", "application/json");
            serde_json::to_vec(body)?
        }
        None => Vec::new(),
    };

    let mut res = client.send_async(req.body(body)?).await?;

    let status = res.status();
    let text = res.text().await?;

    Ok((status, text))
}

fn decode<T>(uri: &Uri, text: &str) -> Result<T, crate::Report>
where
    T: DeserializeOwned,
{
    let text = if text.trim().is_empty() { "null" } else { text };

    serde_json::from_str(text).with_context(|| format!("decoding answer of `{}`", uri))
}

pub fn join_uri(base: &str, path: &str) -> Result<Uri, crate::Report> {
    let joined = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));

    Uri::try_from(joined.as_str()).with_context(|| format!("invalid url `{}`", joined))
}
