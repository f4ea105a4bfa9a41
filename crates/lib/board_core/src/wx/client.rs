//! Subscriber profile lookups against the platform API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::WxError;

/// Default platform API base.
pub const DEFAULT_API_BASE: &str = "https://api.weixin.qq.com";

/// Source of subscriber profiles.
#[async_trait]
pub trait ProfileClient: Send + Sync {
    /// Nickname of the subscriber `open_id`, if the platform reports one.
    async fn nickname(&self, open_id: &str) -> Result<Option<String>, WxError>;
}

#[derive(Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
    errcode: Option<i64>,
    errmsg: Option<String>,
}

#[derive(Deserialize)]
struct UserInfoResponse {
    nickname: Option<String>,
    errcode: Option<i64>,
    errmsg: Option<String>,
}

fn check(errcode: Option<i64>, errmsg: Option<String>, what: &str) -> Result<(), WxError> {
    match errcode {
        Some(code) if code != 0 => Err(WxError::Backend(format!(
            "{what}: {code} {}",
            errmsg.unwrap_or_default()
        ))),
        _ => Ok(()),
    }
}

/// [`ProfileClient`] for the official-account HTTP API.
///
/// Fetches a fresh access token for every lookup.
#[derive(Debug, Clone)]
pub struct WeChatProfileClient {
    client: Client,
    api_base: String,
    app_id: String,
    app_secret: String,
}

impl WeChatProfileClient {
    pub fn new(
        api_base: &str,
        app_id: &str,
        app_secret: &str,
        timeout: Duration,
    ) -> Result<Self, WxError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WxError::Backend(format!("http client: {e}")))?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            app_id: app_id.to_string(),
            app_secret: app_secret.to_string(),
        })
    }

    async fn access_token(&self) -> Result<String, WxError> {
        let resp: AccessTokenResponse = self
            .client
            .get(format!("{}/cgi-bin/token", self.api_base))
            .query(&[
                ("grant_type", "client_credential"),
                ("appid", self.app_id.as_str()),
                ("secret", self.app_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| WxError::Backend(format!("token request failed: {e}")))?
            .json()
            .await
            .map_err(|e| WxError::Backend(format!("token response parse error: {e}")))?;

        check(resp.errcode, resp.errmsg, "token")?;
        resp.access_token
            .ok_or_else(|| WxError::Backend("token response without access_token".into()))
    }
}

#[async_trait]
impl ProfileClient for WeChatProfileClient {
    async fn nickname(&self, open_id: &str) -> Result<Option<String>, WxError> {
        let token = self.access_token().await?;
        let resp: UserInfoResponse = self
            .client
            .get(format!("{}/cgi-bin/user/info", self.api_base))
            .query(&[
                ("access_token", token.as_str()),
                ("openid", open_id),
                ("lang", "zh_CN"),
            ])
            .send()
            .await
            .map_err(|e| WxError::Backend(format!("user info request failed: {e}")))?
            .json()
            .await
            .map_err(|e| WxError::Backend(format!("user info parse error: {e}")))?;

        check(resp.errcode, resp.errmsg, "user info")?;
        debug!(open_id, "fetched subscriber profile");
        Ok(resp.nickname.filter(|n| !n.is_empty()))
    }
}
