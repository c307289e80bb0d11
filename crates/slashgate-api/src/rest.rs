//! Async REST client for the platform API.
//!
//! Covers what an interactions-only application needs: command registration
//! and out-of-band interaction callbacks.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use slashgate_commands::{CommandRegistrar, ResponseTransport};
use slashgate_common::config::{ApplicationConfig, DEFAULT_API_BASE};
use slashgate_common::error::ResponseError;
use slashgate_common::models::{CommandPayload, InteractionResponse, RegisteredCommand};
use slashgate_common::snowflake::Snowflake;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// The HTTP response had a non-2xx status code.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, RestError>;

/// Bot-authenticated client bound to one application.
///
/// ```rust,no_run
/// use slashgate_api::RestClient;
///
/// # async fn run() -> slashgate_api::rest::Result<()> {
/// let rest = RestClient::new("mytoken", slashgate_common::Snowflake::new(1234), None)?;
/// let commands = rest.global_commands().await?;
/// println!("{} commands registered", commands.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
    application_id: Snowflake,
}

impl RestClient {
    pub fn new(
        token: impl Into<String>,
        application_id: Snowflake,
        base_url: Option<&str>,
    ) -> Result<Self> {
        let token = {
            let t = token.into();
            if t.starts_with("Bot ") { t } else { format!("Bot {t}") }
        };
        let client = Client::builder()
            .default_headers({
                let mut h = reqwest::header::HeaderMap::new();
                h.insert(
                    reqwest::header::AUTHORIZATION,
                    reqwest::header::HeaderValue::from_str(&token)
                        .map_err(|e| RestError::Other(e.to_string()))?,
                );
                h.insert(
                    reqwest::header::CONTENT_TYPE,
                    reqwest::header::HeaderValue::from_static("application/json"),
                );
                h
            })
            .build()
            .map_err(RestError::Http)?;

        Ok(Self {
            client,
            base_url: base_url
                .unwrap_or(DEFAULT_API_BASE)
                .trim_end_matches('/')
                .to_owned(),
            application_id,
        })
    }

    pub fn from_config(app: &ApplicationConfig) -> Result<Self> {
        let application_id = app
            .id
            .parse()
            .map_err(|_| RestError::Other(format!("invalid application id {:?}", app.id)))?;
        Self::new(app.token.as_str(), application_id, Some(&app.api_base))
    }

    pub fn application_id(&self) -> Snowflake {
        self.application_id
    }

    // ── Internal ──────────────────────────────────────────────────────────────

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, path, "rest request");
        let mut req = self.client.request(method, &url);
        if let Some(b) = body {
            req = req.json(b);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let msg = resp
                .json::<Value>()
                .await
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned))
                .unwrap_or_else(|| status.to_string());
            return Err(RestError::Api { status: status.as_u16(), message: msg });
        }
        if status == StatusCode::NO_CONTENT {
            return serde_json::from_value(Value::Null).map_err(RestError::Json);
        }
        Ok(resp.json::<T>().await?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::GET, path, None).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        self.request(Method::POST, path, Some(body)).await
    }

    async fn put<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        self.request(Method::PUT, path, Some(body)).await
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    fn commands_path(&self, guild_id: Option<Snowflake>) -> String {
        match guild_id {
            Some(guild) => format!("/applications/{}/guilds/{guild}/commands", self.application_id),
            None => format!("/applications/{}/commands", self.application_id),
        }
    }

    pub async fn global_commands(&self) -> Result<Vec<RegisteredCommand>> {
        self.get(&self.commands_path(None)).await
    }

    pub async fn guild_commands(&self, guild_id: Snowflake) -> Result<Vec<RegisteredCommand>> {
        self.get(&self.commands_path(Some(guild_id))).await
    }

    /// Replace the whole command set of the global scope or one guild.
    pub async fn overwrite_commands(
        &self,
        guild_id: Option<Snowflake>,
        commands: &[CommandPayload],
    ) -> Result<Vec<RegisteredCommand>> {
        let body = serde_json::to_value(commands)?;
        self.put(&self.commands_path(guild_id), &body).await
    }

    // ── Interactions ──────────────────────────────────────────────────────────

    pub async fn create_interaction_response(
        &self,
        interaction_id: Snowflake,
        token: &str,
        response: &InteractionResponse,
    ) -> Result<()> {
        let body = serde_json::to_value(response)?;
        let _: Value = self
            .post(&format!("/interactions/{interaction_id}/{token}/callback"), &body)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CommandRegistrar for RestClient {
    async fn get_global_commands(&self) -> anyhow::Result<Vec<RegisteredCommand>> {
        Ok(self.global_commands().await?)
    }

    async fn bulk_override_commands(
        &self,
        commands: &[CommandPayload],
    ) -> anyhow::Result<Vec<RegisteredCommand>> {
        Ok(self.overwrite_commands(None, commands).await?)
    }

    async fn get_guild_commands(&self, guild_id: Snowflake) -> anyhow::Result<Vec<RegisteredCommand>> {
        Ok(self.guild_commands(guild_id).await?)
    }

    async fn bulk_override_guild_commands(
        &self,
        guild_id: Snowflake,
        commands: &[CommandPayload],
    ) -> anyhow::Result<Vec<RegisteredCommand>> {
        Ok(self.overwrite_commands(Some(guild_id), commands).await?)
    }
}

/// Out-of-band delivery, for handlers that answer after the webhook returned.
#[async_trait]
impl ResponseTransport for RestClient {
    async fn send_initial_response(
        &self,
        interaction_id: Snowflake,
        token: &str,
        response: &InteractionResponse,
    ) -> std::result::Result<(), ResponseError> {
        self.create_interaction_response(interaction_id, token, response)
            .await
            .map_err(|e| ResponseError::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_gets_bot_prefix_once() {
        assert!(RestClient::new("abc", Snowflake::new(1), None).is_ok());
        assert!(RestClient::new("Bot abc", Snowflake::new(1), None).is_ok());
        assert!(matches!(
            RestClient::new("bad\ntoken", Snowflake::new(1), None),
            Err(RestError::Other(_))
        ));
    }

    #[test]
    fn command_paths_are_scoped() {
        let rest = RestClient::new("t", Snowflake::new(7), Some("https://example.test/api/")).unwrap();
        assert_eq!(rest.base_url, "https://example.test/api");
        assert_eq!(rest.commands_path(None), "/applications/7/commands");
        assert_eq!(
            rest.commands_path(Some(Snowflake::new(9))),
            "/applications/7/guilds/9/commands"
        );
    }

    #[test]
    fn config_needs_numeric_application_id() {
        let mut app = ApplicationConfig {
            id: "not-a-number".into(),
            public_key: String::new(),
            token: "t".into(),
            api_base: DEFAULT_API_BASE.into(),
        };
        assert!(RestClient::from_config(&app).is_err());
        app.id = "42".into();
        assert_eq!(RestClient::from_config(&app).unwrap().application_id(), Snowflake::new(42));
    }
}
