use derive_more::{Display, From, Into};
use log::debug;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::audio_track::AudioTrack;
use crate::config::Config;
use crate::exponential_retry::ExponentialRetry;
use crate::vk_error::{ApiErrorBody, VkError};

/// Largest page `audio.get` will return in one call.
pub const AUDIO_PAGE_SIZE: usize = 6000;

/// Page owner as the API expects it: users are positive, groups negative.
#[derive(Display, From, Into, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OwnerId(i64);

#[derive(Display, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageKind {
    #[display("user")]
    User,
    #[display("group")]
    Group,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct VkUser {
    #[serde(alias = "uid")]
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct VkGroup {
    #[serde(alias = "gid")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GroupsResponse {
    List(Vec<VkGroup>),
    Wrapped { groups: Vec<VkGroup> },
}

impl From<GroupsResponse> for Vec<VkGroup> {
    fn from(resp: GroupsResponse) -> Self {
        match resp {
            GroupsResponse::List(groups) | GroupsResponse::Wrapped { groups } => groups,
        }
    }
}

#[derive(Deserialize, Debug)]
struct AudioPage {
    count: usize,
    #[serde(default)]
    items: Vec<AudioTrack>,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    response: Option<T>,
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Unwrap the `{"response": ...}` / `{"error": ...}` envelope.
pub fn parse_api_response<T: DeserializeOwned>(text: &str) -> Result<T, VkError> {
    let resp: ApiResponse<T> = serde_json::from_str(text)?;
    if let Some(error) = resp.error {
        return Err(error.into());
    }
    resp.response.ok_or_else(|| VkError::Api {
        code: -1,
        message: "empty response".into(),
    })
}

pub fn parse_token_response(text: &str) -> Result<String, VkError> {
    let resp: TokenResponse = serde_json::from_str(text)?;
    match resp.access_token {
        Some(token) if resp.error.is_none() => Ok(token),
        _ => Err(VkError::Auth(
            resp.error_description
                .or(resp.error)
                .unwrap_or_else(|| "no access_token".into()),
        )),
    }
}

#[derive(Debug)]
pub struct VkConnection {
    client: Client,
    config: Config,
    access_token: String,
}

impl VkConnection {
    pub fn new(config: &Config, access_token: &str) -> Self {
        Self {
            client: Client::new(),
            config: config.clone(),
            access_token: access_token.into(),
        }
    }

    /// Exchange login and password for an access token.
    pub async fn create_token(
        config: &Config,
        login: &str,
        password: &str,
    ) -> Result<String, VkError> {
        let client_secret = config
            .client_secret
            .as_ref()
            .ok_or(VkError::Config("VKASYNC_CLIENT_SECRET"))?;
        let url: Url = config.oauth_url.parse()?;
        let form = [
            ("grant_type", "password"),
            ("client_id", config.client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("username", login),
            ("password", password),
            ("scope", config.scope.as_str()),
            ("v", config.api_version.as_str()),
        ];
        let conn = Self::new(config, "");
        let text = conn.post_form(&url, &form).await?.text().await?;
        parse_token_response(&text)
    }

    pub fn method_url(&self, method: &str, params: &[(&str, String)]) -> Result<Url, VkError> {
        let mut url = Url::parse(&self.config.api_url)?.join(method)?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())))
            .append_pair("access_token", &self.access_token)
            .append_pair("v", &self.config.api_version);
        Ok(url)
    }

    pub async fn call_method<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, VkError> {
        debug!("call {} {:?}", method, params);
        let url = self.method_url(method, params)?;
        let text = self.get(&url).await?.text().await?;
        parse_api_response(&text)
    }

    /// `users.get`; without ids the API describes the token owner.
    pub async fn users_get(&self, user_ids: Option<&str>) -> Result<Vec<VkUser>, VkError> {
        let params: Vec<_> = user_ids
            .map(|ids| ("user_ids", ids.to_string()))
            .into_iter()
            .collect();
        self.call_method("users.get", &params).await
    }

    pub async fn groups_get_by_id(&self, group_ids: &str) -> Result<Vec<VkGroup>, VkError> {
        let resp: GroupsResponse = self
            .call_method("groups.getById", &[("group_ids", group_ids.to_string())])
            .await?;
        Ok(resp.into())
    }

    /// Every track of the page, fetched in `AUDIO_PAGE_SIZE` chunks.
    pub async fn audio_get(&self, owner_id: OwnerId) -> Result<Vec<AudioTrack>, VkError> {
        let mut tracks: Vec<AudioTrack> = Vec::new();
        loop {
            let params = [
                ("owner_id", owner_id.to_string()),
                ("offset", tracks.len().to_string()),
                ("count", AUDIO_PAGE_SIZE.to_string()),
            ];
            let page: AudioPage = self.call_method("audio.get", &params).await?;
            if page.items.is_empty() {
                break;
            }
            tracks.extend(page.items);
            if tracks.len() >= page.count {
                break;
            }
        }
        debug!("owner {} has {} tracks", owner_id, tracks.len());
        Ok(tracks)
    }

    /// Resolve a screen name or numeric id into an owner id.
    pub async fn resolve_owner(
        &self,
        page_name: &str,
        kind: PageKind,
    ) -> Result<Option<OwnerId>, VkError> {
        let page_name = page_name.strip_prefix('-').unwrap_or(page_name);
        let owner_id = match kind {
            PageKind::Group => self
                .groups_get_by_id(page_name)
                .await?
                .first()
                .map(|g| -g.id),
            PageKind::User => self.users_get(Some(page_name)).await?.first().map(|u| u.id),
        };
        Ok(owner_id.map(Into::into))
    }
}

impl ExponentialRetry for VkConnection {
    fn get_client(&self) -> &Client {
        &self.client
    }

    fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.config.retry_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{Config, ConfigInner};
    use crate::test_server::spawn_server;
    use crate::vk_connection::{
        parse_api_response, parse_token_response, OwnerId, PageKind, VkConnection, VkGroup,
        VkUser,
    };
    use crate::vk_error::VkError;

    fn test_config(api_url: &str) -> Config {
        Config::from_inner(ConfigInner {
            api_url: api_url.into(),
            oauth_url: format!("{}token", api_url),
            client_secret: Some("secret".into()),
            ..ConfigInner::default()
        })
    }

    #[test]
    fn test_method_url() {
        let config = test_config("https://api.vk.com/method/");
        let conn = VkConnection::new(&config, "abc");
        let url = conn
            .method_url("audio.get", &[("owner_id", "-42".into())])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.vk.com/method/audio.get?owner_id=-42&access_token=abc&v=5.131"
        );
    }

    #[test]
    fn test_parse_api_response() {
        let users: Vec<VkUser> = parse_api_response(
            r#"{"response": [{"id": 1, "first_name": "Pavel", "last_name": "Durov"}]}"#,
        )
        .unwrap();
        assert_eq!(users[0].id, 1);

        let err = parse_api_response::<Vec<VkUser>>(
            r#"{"error": {"error_code": 5, "error_msg": "User authorization failed"}}"#,
        )
        .unwrap_err();
        assert!(err.is_auth());

        let err = parse_api_response::<Vec<VkUser>>(
            r#"{"error": {"error_code": 113, "error_msg": "Invalid user id"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, VkError::Api { code: 113, .. }));
    }

    #[test]
    fn test_parse_token_response() {
        assert_eq!(
            parse_token_response(r#"{"access_token": "tok", "expires_in": 0, "user_id": 1}"#)
                .unwrap(),
            "tok"
        );
        let err = parse_token_response(
            r#"{"error": "invalid_client", "error_description": "Username or password is incorrect"}"#,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Authorization failed: Username or password is incorrect"
        );
    }

    #[test]
    fn test_owner_id_display() {
        let owner: OwnerId = (-42i64).into();
        assert_eq!(owner.to_string(), "-42");
        assert_eq!(i64::from(owner), -42);
        assert_eq!(PageKind::Group.to_string(), "group");
    }

    #[tokio::test]
    async fn test_resolve_owner() {
        let addr = spawn_server(vec![
            (
                "/method/groups.getById",
                200,
                br#"{"response": {"groups": [{"id": 42, "name": "club"}]}}"#.to_vec(),
            ),
            (
                "/method/users.get?user_ids=durov",
                200,
                br#"{"response": [{"id": 1, "first_name": "Pavel"}]}"#.to_vec(),
            ),
            ("/method/users.get", 200, br#"{"response": []}"#.to_vec()),
        ])
        .await;
        let config = test_config(&format!("http://{}/method/", addr));
        let conn = VkConnection::new(&config, "abc");

        let owner = conn.resolve_owner("-club42", PageKind::Group).await.unwrap();
        assert_eq!(owner, Some(OwnerId::from(-42i64)));

        let owner = conn.resolve_owner("durov", PageKind::User).await.unwrap();
        assert_eq!(owner, Some(OwnerId::from(1i64)));

        let owner = conn.resolve_owner("nobody", PageKind::User).await.unwrap();
        assert_eq!(owner, None);
    }

    #[tokio::test]
    async fn test_groups_legacy_shape() {
        let addr = spawn_server(vec![(
            "/method/groups.getById",
            200,
            br#"{"response": [{"gid": 7, "name": "old"}]}"#.to_vec(),
        )])
        .await;
        let config = test_config(&format!("http://{}/method/", addr));
        let conn = VkConnection::new(&config, "abc");
        let groups = conn.groups_get_by_id("old").await.unwrap();
        assert_eq!(
            groups,
            vec![VkGroup {
                id: 7,
                name: "old".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_audio_get_pages() {
        let addr = spawn_server(vec![
            (
                "/method/audio.get?owner_id=1&offset=0&",
                200,
                br#"{"response": {"count": 3, "items": [
                    {"artist": "A", "title": "1", "url": "http://x/1.mp3"},
                    {"artist": "A", "title": "2", "url": "http://x/2.mp3"}]}}"#
                    .to_vec(),
            ),
            (
                "/method/audio.get?owner_id=1&offset=2&",
                200,
                br#"{"response": {"count": 3, "items": [
                    {"artist": "B", "title": "3", "url": "http://x/3.mp3"}]}}"#
                    .to_vec(),
            ),
        ])
        .await;
        let config = test_config(&format!("http://{}/method/", addr));
        let conn = VkConnection::new(&config, "abc");
        let tracks = conn.audio_get(OwnerId::from(1i64)).await.unwrap();
        let titles: Vec<_> = tracks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_create_token() {
        let addr = spawn_server(vec![
            (
                "/method/token?grant_type=password&client_id=2274003&client_secret=secret&username=good",
                200,
                br#"{"access_token": "tok", "expires_in": 0, "user_id": 1}"#.to_vec(),
            ),
            (
                "/method/token",
                401,
                br#"{"error": "invalid_client", "error_description": "bad password"}"#.to_vec(),
            ),
        ])
        .await;
        let config = test_config(&format!("http://{}/method/", addr));
        let token = VkConnection::create_token(&config, "good", "pw").await.unwrap();
        assert_eq!(token, "tok");

        let err = VkConnection::create_token(&config, "bad", "pw")
            .await
            .unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_users_get() {
        let config = Config::init_config().unwrap();
        let token = std::env::var("VKASYNC_TEST_TOKEN").unwrap();
        let conn = VkConnection::new(&config, &token);
        let users = conn.users_get(None).await.unwrap();
        assert_eq!(users.len(), 1);
    }
}
