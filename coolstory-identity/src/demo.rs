use coolstory_common::{bail, models::Member, Report};

use crate::{check_callback, new_oauth_data, IdentityProvider, LoginRedirect, OAuthData, Tokens};

const TOKEN_PREFIX: &str = "demo.";

/// Signs every visitor in as one fixed member without leaving the site.
///
/// The authorization URL points straight back at the callback, so the whole
/// login round trip runs locally.
#[derive(Clone, Debug)]
pub struct DemoIdentity {
    member: Member,
}

impl DemoIdentity {
    pub fn new(member: Member) -> Self {
        Self { member }
    }

    fn token(&self) -> String {
        format!("{}{}", TOKEN_PREFIX, self.member.id)
    }
}

impl Default for DemoIdentity {
    fn default() -> Self {
        Self::new(Member {
            id: "demo-member".into(),
            login_email: Some("guest@coolstory.example".into()),
            nickname: Some("Guest Storyteller".into()),
            photo: None,
        })
    }
}

#[async_trait::async_trait]
impl IdentityProvider for DemoIdentity {
    #[tracing::instrument(skip(self), err)]
    async fn begin_login(
        &self,
        redirect_uri: &str,
        return_to: &str,
    ) -> Result<LoginRedirect, Report> {
        let oauth = new_oauth_data(redirect_uri, return_to);

        let auth_url = format!(
            "{}?code={}&state={}",
            redirect_uri,
            urlencoding::encode(&crate::pkce::code_challenge(&oauth.code_verifier)),
            urlencoding::encode(&oauth.state),
        );

        Ok(LoginRedirect { auth_url, oauth })
    }

    #[tracing::instrument(skip(self, code, state, oauth), err)]
    async fn complete_login(
        &self,
        code: &str,
        state: &str,
        oauth: &OAuthData,
    ) -> Result<Tokens, Report> {
        check_callback(code, state, oauth)?;

        if code != crate::pkce::code_challenge(&oauth.code_verifier) {
            bail!("authorization code was not issued for this login");
        }

        Ok(Tokens {
            access_token: self.token(),
            refresh_token: None,
            expires_at: None,
        })
    }

    async fn current_member(&self, tokens: &Tokens) -> Result<Member, Report> {
        if tokens.access_token != self.token() {
            bail!("unknown demo token");
        }

        Ok(self.member.clone())
    }
}
