//! Who is visiting: the OAuth round trip with the identity provider and the
//! session built from its tokens.

pub mod cookie;
pub mod demo;
pub mod pkce;
pub mod wix;

use std::sync::Arc;

use coolstory_common::{models::Member, Backend, Conf, Report};

pub use demo::DemoIdentity;
pub use wix::WixIdentity;

/// Member tokens as persisted in the session cookie.
#[derive(Clone, Debug, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Tokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl Tokens {
    pub fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at <= now)
    }
}

/// Everything the callback needs to finish a login.
#[derive(Clone, Debug, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct OAuthData {
    pub state: String,
    pub code_verifier: String,
    pub redirect_uri: String,
    /// Local path to land on once signed in.
    pub return_to: String,
}

#[derive(Clone, Debug)]
pub struct LoginRedirect {
    pub auth_url: String,
    pub oauth: OAuthData,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    #[error("the state returned by the provider does not match the pending login")]
    StateMismatch,
    #[error("the provider did not return an authorization code")]
    MissingCode,
    #[error("the session has expired")]
    Expired,
    #[error("the pending login holds a malformed code verifier")]
    InvalidVerifier,
}

#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Prepares a login and returns where to send the browser.
    async fn begin_login(&self, redirect_uri: &str, return_to: &str)
        -> Result<LoginRedirect, Report>;

    /// Exchanges the authorization code for member tokens.
    async fn complete_login(
        &self,
        code: &str,
        state: &str,
        oauth: &OAuthData,
    ) -> Result<Tokens, Report>;

    async fn current_member(&self, tokens: &Tokens) -> Result<Member, Report>;
}

pub type SharedIdentity = Arc<dyn IdentityProvider>;

/// The fixture backend pairs with the local demo login, the CMS backend with
/// Wix.
#[tracing::instrument(skip(conf), err)]
pub fn init_identity(conf: &Conf) -> Result<SharedIdentity, Report> {
    let identity: SharedIdentity = match conf.backend()? {
        Backend::Fixture => Arc::new(DemoIdentity::default()),
        Backend::Cms => Arc::new(WixIdentity::new(&conf.wix()?)?),
    };

    Ok(identity)
}

pub(crate) fn check_callback(code: &str, state: &str, oauth: &OAuthData) -> Result<(), LoginError> {
    if code.trim().is_empty() {
        return Err(LoginError::MissingCode);
    }

    if state != oauth.state {
        return Err(LoginError::StateMismatch);
    }

    if !pkce::is_valid_code_verifier(&oauth.code_verifier) {
        return Err(LoginError::InvalidVerifier);
    }

    Ok(())
}

pub(crate) fn new_oauth_data(redirect_uri: &str, return_to: &str) -> OAuthData {
    OAuthData {
        state: pkce::generate_state(),
        code_verifier: pkce::generate_code_verifier(),
        redirect_uri: redirect_uri.to_string(),
        return_to: local_path(return_to).to_string(),
    }
}

/// Keeps redirects on this site: anything but a plain absolute path becomes `/`.
///
/// The result always fits in a `Location` header.
pub fn local_path(target: &str) -> &str {
    let plain = target
        .bytes()
        .all(|b| (b' '..0x7f).contains(&b) && b != b'\\');

    if plain && target.starts_with('/') && !target.starts_with("//") {
        target
    } else {
        "/"
    }
}

/// The visitor as seen by one request.
#[derive(Clone, Debug, Default)]
pub struct Session {
    pub tokens: Option<Tokens>,
    pub member: Option<Member>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.member.is_some()
    }

    /// Resolves the member behind `tokens`.
    ///
    /// Any failure leaves the visitor anonymous; it is logged and nothing
    /// else.
    #[tracing::instrument(skip(provider, tokens))]
    pub async fn resolve(provider: &dyn IdentityProvider, tokens: Option<Tokens>) -> Self {
        let tokens = match tokens {
            Some(tokens) => tokens,
            None => return Self::anonymous(),
        };

        if tokens.is_expired(chrono::Utc::now().timestamp()) {
            tracing::warn!(error = %LoginError::Expired, "treating visitor as anonymous");

            return Self::anonymous();
        }

        match provider.current_member(&tokens).await {
            Ok(member) => Self {
                tokens: Some(tokens),
                member: Some(member),
            },
            Err(err) => {
                tracing::warn!(error = ?err, "failed to get current member");

                Self::anonymous()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_path_rejects_other_sites() {
        assert_eq!(local_path("/stories/1"), "/stories/1");
        assert_eq!(local_path("//evil.example"), "/");
        assert_eq!(local_path("https://evil.example"), "/");
        assert_eq!(local_path("/\\evil.example"), "/");
        assert_eq!(local_path(""), "/");
    }

    #[test]
    fn local_path_rejects_header_breaking_bytes() {
        assert_eq!(local_path("/stories/1\n"), "/");
        assert_eq!(local_path("/stories\r\nSet-Cookie: x=1"), "/");
        assert_eq!(local_path("/a\tb"), "/");
        assert_eq!(local_path("/a\u{7f}"), "/");
        assert_eq!(local_path("/caf\u{e9}"), "/");
        assert_eq!(local_path("/groups/nature?tab=top#list"), "/groups/nature?tab=top#list");
    }

    #[test]
    fn callback_checks_state_and_code() {
        let oauth = new_oauth_data("http://localhost:8080/auth/callback", "/profile");

        assert_eq!(check_callback("code", &oauth.state, &oauth), Ok(()));
        assert_eq!(
            check_callback("code", "other", &oauth),
            Err(LoginError::StateMismatch)
        );
        assert_eq!(
            check_callback(" ", &oauth.state, &oauth),
            Err(LoginError::MissingCode)
        );

        let mut tampered = oauth.clone();
        tampered.code_verifier = "short".into();
        assert_eq!(
            check_callback("code", &tampered.state, &tampered),
            Err(LoginError::InvalidVerifier)
        );
    }

    #[test]
    fn expiry() {
        let tokens = Tokens {
            access_token: "a".into(),
            refresh_token: None,
            expires_at: Some(100),
        };

        assert!(tokens.is_expired(100));
        assert!(!tokens.is_expired(99));
        assert!(!Tokens { expires_at: None, ..tokens }.is_expired(i64::MAX));
    }

    #[tokio::test]
    async fn broken_sessions_fall_back_to_anonymous() {
        let provider = DemoIdentity::default();
        let tokens = Tokens {
            access_token: "forged".into(),
            refresh_token: None,
            expires_at: None,
        };

        let session = Session::resolve(&provider, Some(tokens)).await;
        assert!(!session.is_authenticated());
        assert!(session.tokens.is_none());

        let session = Session::resolve(&provider, None).await;
        assert!(!session.is_authenticated());
    }
}
