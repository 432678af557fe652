pub mod models;
pub mod submission;
pub mod utils;

use std::str::FromStr;

pub use color_eyre::{
    eyre::{bail, eyre as err, Context, Report},
    install,
};
pub use http::Uri;

#[twelf::config]
pub struct Conf {
    /// Where stories and groups come from, `fixture` or `cms`
    pub backend: Option<String>,

    /// Address the web server listens on
    pub bind: Option<String>,

    /// Public base URL of this site, used to build the OAuth callback
    pub public_url: Option<String>,

    /// Wix OAuth client ID
    pub wix_client_id: Option<String>,

    /// Wix API key for server side reads and writes
    pub wix_api_key: Option<String>,

    /// Wix site ID the API key is scoped to
    pub wix_site_id: Option<String>,

    /// Wix REST API base URL
    pub wix_api_base: Option<String>,
}

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:8080";
pub const DEFAULT_WIX_API_BASE: &str = "https://www.wixapis.com";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Fixture,
    Cms,
}

impl FromStr for Backend {
    type Err = Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixture" | "demo" | "mock" => Ok(Backend::Fixture),
            "cms" | "wix" | "live" => Ok(Backend::Cms),
            other => bail!("unknown backend `{}`, expected `fixture` or `cms`", other),
        }
    }
}

/// Everything needed to talk to Wix on behalf of this site.
#[derive(Clone, Debug)]
pub struct WixCredentials {
    pub client_id: String,
    pub api_key: String,
    pub site_id: String,
    pub api_base: String,
}

impl Conf {
    pub fn backend(&self) -> Result<Backend, Report> {
        self.backend
            .as_deref()
            .map(Backend::from_str)
            .unwrap_or(Ok(Backend::Fixture))
    }

    pub fn bind(&self) -> &str {
        self.bind.as_deref().unwrap_or(DEFAULT_BIND)
    }

    pub fn public_url(&self) -> &str {
        self.public_url
            .as_deref()
            .unwrap_or(DEFAULT_PUBLIC_URL)
            .trim_end_matches('/')
    }

    pub fn wix(&self) -> Result<WixCredentials, Report> {
        fn required(value: &Option<String>, key: &str) -> Result<String, Report> {
            match value.as_deref().map(str::trim) {
                Some(value) if !value.is_empty() => Ok(value.to_string()),
                _ => bail!("`{}` must be set when using the cms backend", key),
            }
        }

        Ok(WixCredentials {
            client_id: required(&self.wix_client_id, "wix_client_id")?,
            api_key: required(&self.wix_api_key, "wix_api_key")?,
            site_id: required(&self.wix_site_id, "wix_site_id")?,
            api_base: self
                .wix_api_base
                .as_deref()
                .unwrap_or(DEFAULT_WIX_API_BASE)
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conf() -> Conf {
        Conf {
            backend: None,
            bind: None,
            public_url: None,
            wix_client_id: None,
            wix_api_key: None,
            wix_site_id: None,
            wix_api_base: None,
        }
    }

    #[test]
    fn backend_defaults_to_fixture() {
        assert_eq!(conf().backend().unwrap(), Backend::Fixture);
    }

    #[test]
    fn backend_parses_aliases() {
        assert_eq!("CMS".parse::<Backend>().unwrap(), Backend::Cms);
        assert_eq!("demo".parse::<Backend>().unwrap(), Backend::Fixture);
        assert!("postgres".parse::<Backend>().is_err());
    }

    #[test]
    fn wix_requires_every_credential() {
        let mut conf = conf();
        conf.wix_client_id = Some("client".into());
        conf.wix_api_key = Some("key".into());
        assert!(conf.wix().is_err());

        conf.wix_site_id = Some("site".into());
        conf.wix_api_base = Some("http://127.0.0.1:9000/".into());
        let wix = conf.wix().unwrap();
        assert_eq!(wix.api_base, "http://127.0.0.1:9000");
        assert_eq!(wix.site_id, "site");
    }

    #[test]
    fn public_url_drops_trailing_slash() {
        let mut conf = conf();
        conf.public_url = Some("https://coolstory.example/".into());
        assert_eq!(conf.public_url(), "https://coolstory.example");
    }
}
