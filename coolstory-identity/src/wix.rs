use isahc::{http::Method, HttpClient};
use serde_json::json;

use coolstory_common::{
    models::Member,
    utils::{self, join_uri, send_json},
    Report, WixCredentials,
};

use crate::{check_callback, new_oauth_data, pkce, IdentityProvider, LoginRedirect, OAuthData, Tokens};

const TOKEN_PATH: &str = "/oauth2/token";
const REDIRECT_SESSION_PATH: &str = "/_api/redirects-api/v1/redirect-session";
const MY_MEMBER_PATH: &str = "/members/v1/members/my?fieldsets=FULL";

/// Wix headless OAuth: PKCE authorization code flow against the site's
/// OAuth app.
pub struct WixIdentity {
    client: HttpClient,
    client_id: String,
    api_base: String,
}

#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_tokens(self, now: i64) -> Tokens {
        Tokens {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self.expires_in.map(|secs| now + secs),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct RedirectSessionResponse {
    redirect_session: RedirectSession,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct RedirectSession {
    full_url: String,
}

/// Body of the members API `get` endpoints.
#[derive(Debug, serde::Deserialize)]
pub struct MemberResponse {
    pub member: WixMember,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WixMember {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub login_email: Option<String>,
    #[serde(default)]
    pub profile: Option<WixProfile>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct WixProfile {
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub photo: Option<WixPhoto>,
}

#[derive(Debug, serde::Deserialize)]
pub struct WixPhoto {
    #[serde(default)]
    pub url: Option<String>,
}

impl From<WixMember> for Member {
    fn from(member: WixMember) -> Self {
        let profile = member.profile.unwrap_or_default();

        Member {
            id: member.id,
            login_email: member.login_email,
            nickname: profile.nickname,
            photo: profile.photo.and_then(|photo| photo.url),
        }
    }
}

impl WixIdentity {
    pub fn new(credentials: &WixCredentials) -> Result<Self, Report> {
        Ok(Self {
            client: utils::client()?,
            client_id: credentials.client_id.clone(),
            api_base: credentials.api_base.clone(),
        })
    }

    /// Anonymous visitor tokens, needed to open a redirect session.
    #[tracing::instrument(skip(self), err)]
    pub async fn visitor_tokens(&self) -> Result<Tokens, Report> {
        let body = json!({
            "clientId": self.client_id,
            "grantType": "anonymous",
        });

        let res: TokenResponse = send_json(
            &self.client,
            Method::POST,
            &join_uri(&self.api_base, TOKEN_PATH)?,
            &[],
            Some(&body),
        )
        .await?;

        Ok(res.into_tokens(chrono::Utc::now().timestamp()))
    }
}

fn auth_request(client_id: &str, oauth: &OAuthData) -> serde_json::Value {
    json!({
        "auth": {
            "authRequest": {
                "redirectUri": oauth.redirect_uri,
                "clientId": client_id,
                "codeChallenge": pkce::code_challenge(&oauth.code_verifier),
                "codeChallengeMethod": "S256",
                "responseMode": "query",
                "responseType": "code",
                "scope": "offline_access",
                "state": oauth.state,
            }
        }
    })
}

#[async_trait::async_trait]
impl IdentityProvider for WixIdentity {
    #[tracing::instrument(skip(self), err)]
    async fn begin_login(
        &self,
        redirect_uri: &str,
        return_to: &str,
    ) -> Result<LoginRedirect, Report> {
        let oauth = new_oauth_data(redirect_uri, return_to);
        let visitor = self.visitor_tokens().await?;

        let res: RedirectSessionResponse = send_json(
            &self.client,
            Method::POST,
            &join_uri(&self.api_base, REDIRECT_SESSION_PATH)?,
            &[("Authorization", visitor.access_token.as_str())],
            Some(&auth_request(&self.client_id, &oauth)),
        )
        .await?;

        Ok(LoginRedirect {
            auth_url: res.redirect_session.full_url,
            oauth,
        })
    }

    #[tracing::instrument(skip(self, code, state, oauth), err)]
    async fn complete_login(
        &self,
        code: &str,
        state: &str,
        oauth: &OAuthData,
    ) -> Result<Tokens, Report> {
        check_callback(code, state, oauth)?;

        let body = json!({
            "clientId": self.client_id,
            "grantType": "authorization_code",
            "redirectUri": oauth.redirect_uri,
            "code": code,
            "codeVerifier": oauth.code_verifier,
        });

        let res: TokenResponse = send_json(
            &self.client,
            Method::POST,
            &join_uri(&self.api_base, TOKEN_PATH)?,
            &[],
            Some(&body),
        )
        .await?;

        Ok(res.into_tokens(chrono::Utc::now().timestamp()))
    }

    #[tracing::instrument(skip(self, tokens), err)]
    async fn current_member(&self, tokens: &Tokens) -> Result<Member, Report> {
        let res: MemberResponse = send_json(
            &self.client,
            Method::GET,
            &join_uri(&self.api_base, MY_MEMBER_PATH)?,
            &[("Authorization", tokens.access_token.as_str())],
            None,
        )
        .await?;

        Ok(res.member.into())
    }
}
