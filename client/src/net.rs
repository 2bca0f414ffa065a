use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Url;
use serde_json::Value;
use tracing::debug;

use crate::error::{ConfigError, SketchError, SketchResult};

/// Request/response roster lookup, independent of the live socket.
#[derive(Clone, Debug)]
pub struct ParticipantsClient {
    http: reqwest::Client,
    api_base: Url,
}

impl ParticipantsClient {
    pub fn new(api_base: &str) -> SketchResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder().default_headers(headers).build()?;
        let api_base = Url::parse(api_base).map_err(|error| ConfigError::Invalid {
            field: "api_base",
            reason: error.to_string(),
        })?;
        if api_base.cannot_be_a_base() {
            return Err(ConfigError::Invalid {
                field: "api_base",
                reason: "must be a hierarchical http(s) url".into(),
            }
            .into());
        }
        Ok(Self { http, api_base })
    }

    /// Room ids go in as a single escaped path segment.
    pub fn participants_url(&self, room: &str) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["rooms", room, "participants"]);
        }
        url
    }

    pub async fn list(&self, room: &str) -> SketchResult<Vec<String>> {
        let url = self.participants_url(room);
        debug!(%url, "listing participants");
        let body = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_participants(&body)
    }
}

/// Accepts `["ada", "bob"]` or objects carrying a nickname field in any
/// letter case, e.g. `[{"Nickname": "ada"}]`.
pub fn parse_participants(body: &str) -> SketchResult<Vec<String>> {
    let value: Value = serde_json::from_str(body)
        .map_err(|error| SketchError::TransportFailure(format!("participant list: {error}")))?;
    let Value::Array(items) = value else {
        return Err(SketchError::TransportFailure(
            "participant list is not an array".into(),
        ));
    };
    let mut nicknames = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(nickname) => nicknames.push(nickname),
            Value::Object(fields) => {
                let nickname = fields
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case("nickname"))
                    .and_then(|(_, value)| value.as_str());
                if let Some(nickname) = nickname {
                    nicknames.push(nickname.to_string());
                }
            }
            _ => {}
        }
    }
    Ok(nicknames)
}
