//! Request and response models for the WeCom API.
//!
//! See <https://developer.work.weixin.qq.com/document/path/90236> for the
//! message payloads and <https://developer.work.weixin.qq.com/document/path/90313>
//! for the error codes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `errcode` value of a successful call.
pub const SUCCESS: i64 = 0;

/// Error codes meaning the access token is missing, invalid, or expired.
pub const TOKEN_ERRCODES: [i64; 3] = [40014, 41001, 42001];

/// Recipient selector matching every member visible to the application.
pub const ALL_USERS: &str = "@all";

/// Default button text of a text card.
pub const DEFAULT_BUTTON_TEXT: &str = "详情";

/// Base response envelope shared by every endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Error code, `0` on success.
    #[serde(default)]
    pub errcode: i64,
    /// Error message, `"ok"` on success.
    #[serde(default)]
    pub errmsg: String,
}

impl ApiResponse {
    /// Whether the call succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.errcode == SUCCESS
    }

    /// Whether the error code says the access token must be refetched.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        TOKEN_ERRCODES.contains(&self.errcode)
    }
}

/// Response of `GET /cgi-bin/gettoken`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    /// Response envelope.
    #[serde(flatten)]
    pub base: ApiResponse,
    /// The access token, absent on failure.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Token lifetime in seconds as reported by the server.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Response of `POST /cgi-bin/message/send`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendResponse {
    /// Response envelope.
    #[serde(flatten)]
    pub base: ApiResponse,
    /// Message id, usable to recall the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msgid: Option<String>,
    /// `|`-joined user ids that could not be delivered to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invaliduser: Option<String>,
    /// `|`-joined department ids that could not be delivered to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalidparty: Option<String>,
    /// `|`-joined tag ids that could not be delivered to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalidtag: Option<String>,
    /// `|`-joined user ids without a license.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlicenseduser: Option<String>,
    /// Code for updating template card buttons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_code: Option<String>,
}

/// Response of `POST /cgi-bin/media/upload`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Response envelope.
    #[serde(flatten)]
    pub base: ApiResponse,
    /// Media type echoed by the server.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
    /// Id of the uploaded media, valid for three days.
    #[serde(default)]
    pub media_id: String,
    /// Upload time as a decimal string of Unix seconds.
    #[serde(default)]
    pub created_at: String,
}

impl UploadResponse {
    /// Upload time parsed from `created_at`.
    #[must_use]
    pub fn created_at_time(&self) -> Option<DateTime<Utc>> {
        let secs = self.created_at.trim().parse::<i64>().ok()?;
        DateTime::from_timestamp(secs, 0)
    }
}

/// Kind of temporary media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// JPG or PNG, up to 10 MiB.
    Image,
    /// AMR audio, up to 2 MiB and 60 seconds.
    Voice,
    /// MP4 video, up to 10 MiB.
    Video,
    /// Any file, up to 20 MiB.
    File,
}

impl MediaType {
    /// Value used in the `type` query parameter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Voice => "voice",
            Self::Video => "video",
            Self::File => "file",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "voice" => Ok(Self::Voice),
            "video" => Ok(Self::Video),
            "file" => Ok(Self::File),
            other => Err(format!("unknown media type: {other}")),
        }
    }
}

/// Who receives a message.
///
/// Each selector is a `|`-joined list of ids. Empty selectors are omitted from
/// the request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    /// User ids, or `@all`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub touser: String,
    /// Department ids.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub toparty: String,
    /// Tag ids.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub totag: String,
}

impl Recipient {
    /// Every member visible to the application.
    #[must_use]
    pub fn all() -> Self {
        Self::user(ALL_USERS)
    }

    /// A single user id, or an already `|`-joined list.
    #[must_use]
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            touser: id.into(),
            toparty: String::new(),
            totag: String::new(),
        }
    }

    /// A list of user ids.
    #[must_use]
    pub fn users<S: AsRef<str>>(ids: &[S]) -> Self {
        Self::user(join_ids(ids))
    }

    /// Add departments to the selector.
    #[must_use]
    pub fn with_parties<S: AsRef<str>>(mut self, ids: &[S]) -> Self {
        self.toparty = join_ids(ids);
        self
    }

    /// Add tags to the selector.
    #[must_use]
    pub fn with_tags<S: AsRef<str>>(mut self, ids: &[S]) -> Self {
        self.totag = join_ids(ids);
        self
    }

    /// Whether no selector is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.touser.is_empty() && self.toparty.is_empty() && self.totag.is_empty()
    }
}

impl Default for Recipient {
    fn default() -> Self {
        Self::all()
    }
}

fn join_ids<S: AsRef<str>>(ids: &[S]) -> String {
    ids.iter()
        .map(AsRef::as_ref)
        .filter(|id| !id.is_empty())
        .collect::<Vec<_>>()
        .join("|")
}

/// A text card message.
///
/// Limits: title 128 bytes, description 512 bytes, url 2048 bytes. The button
/// text cannot be changed when the message is viewed in WeChat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextCard {
    /// Card title.
    pub title: String,
    /// Card body. Supports a limited set of HTML tags.
    pub description: String,
    /// Link opened on click.
    pub url: String,
    /// Button text.
    pub btntxt: String,
}

impl TextCard {
    /// Maximum title length in bytes.
    pub const MAX_TITLE_BYTES: usize = 128;
    /// Maximum description length in bytes.
    pub const MAX_DESCRIPTION_BYTES: usize = 512;
    /// Maximum url length in bytes.
    pub const MAX_URL_BYTES: usize = 2048;

    /// Build a card with the default button text.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            url: url.into(),
            btntxt: DEFAULT_BUTTON_TEXT.to_string(),
        }
    }

    /// Replace the button text.
    #[must_use]
    pub fn with_button(mut self, text: impl Into<String>) -> Self {
        self.btntxt = text.into();
        self
    }
}

/// Type-specific part of a `message/send` body.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "msgtype", rename_all = "lowercase")]
pub enum MessageBody {
    /// Plain text.
    Text {
        /// Text content.
        text: Content,
    },
    /// Markdown, only rendered inside the WeCom app.
    Markdown {
        /// Markdown content.
        markdown: Content,
    },
    /// Text card.
    Textcard {
        /// Card fields.
        textcard: TextCard,
    },
    /// Image referencing uploaded media.
    Image {
        /// Media reference.
        image: MediaRef,
    },
}

impl MessageBody {
    /// Plain text body.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            text: Content {
                content: content.into(),
            },
        }
    }

    /// Markdown body.
    #[must_use]
    pub fn markdown(content: impl Into<String>) -> Self {
        Self::Markdown {
            markdown: Content {
                content: content.into(),
            },
        }
    }

    /// Image body referencing uploaded media.
    #[must_use]
    pub fn image(media_id: impl Into<String>) -> Self {
        Self::Image {
            image: MediaRef {
                media_id: media_id.into(),
            },
        }
    }

    /// Value of the `msgtype` field.
    #[must_use]
    pub const fn msgtype(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Markdown { .. } => "markdown",
            Self::Textcard { .. } => "textcard",
            Self::Image { .. } => "image",
        }
    }
}

/// Responses that carry the common envelope.
pub trait Envelope {
    /// The `errcode`/`errmsg` pair.
    fn envelope(&self) -> &ApiResponse;
}

impl Envelope for ApiResponse {
    fn envelope(&self) -> &ApiResponse {
        self
    }
}

impl Envelope for SendResponse {
    fn envelope(&self) -> &ApiResponse {
        &self.base
    }
}

impl Envelope for UploadResponse {
    fn envelope(&self) -> &ApiResponse {
        &self.base
    }
}

/// `{"content": ...}` object.
#[derive(Debug, Clone, Serialize)]
pub struct Content {
    /// The content.
    pub content: String,
}

/// `{"media_id": ...}` object.
#[derive(Debug, Clone, Serialize)]
pub struct MediaRef {
    /// Id returned by a media upload.
    pub media_id: String,
}

/// Full `message/send` request body.
#[derive(Debug, Clone, Serialize)]
pub struct SendRequest<'a> {
    /// Recipient selectors.
    #[serde(flatten)]
    pub recipient: &'a Recipient,
    /// Application id.
    pub agentid: i64,
    /// Message type and payload.
    #[serde(flatten)]
    pub body: &'a MessageBody,
    /// `1` when duplicate checking is enabled.
    pub enable_duplicate_check: u8,
    /// Window in seconds for duplicate checking.
    pub duplicate_check_interval: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn send_response_parses_failure_envelope() {
        let body = r#"{"errcode": 60020, "errmsg": "not allow to access from your ip, hint: [1689001883303762673458360]"}"#;
        let resp: SendResponse = serde_json::from_str(body).expect("parse");
        assert!(!resp.base.is_success());
        assert_eq!(resp.base.errcode, 60020);
        assert!(resp.msgid.is_none());
    }

    #[test]
    fn send_response_parses_success_with_msgid() {
        let body = r#"{"errcode": 0, "errmsg": "ok", "msgid": "3yzdAQ63LCLTa8NC", "invaliduser": ""}"#;
        let resp: SendResponse = serde_json::from_str(body).expect("parse");
        assert!(resp.base.is_success());
        assert_eq!(resp.msgid.as_deref(), Some("3yzdAQ63LCLTa8NC"));
        assert_eq!(resp.invaliduser.as_deref(), Some(""));
    }

    #[test]
    fn upload_response_parses_media_fields() {
        let body = r#"{"errcode":0,"errmsg":"","type":"image","media_id":"1G6nrLmr5EC3MMb_","created_at":"1380000000"}"#;
        let resp: UploadResponse = serde_json::from_str(body).expect("parse");
        assert_eq!(resp.media_type, Some(MediaType::Image));
        assert_eq!(resp.media_id, "1G6nrLmr5EC3MMb_");
        let created = resp.created_at_time().expect("timestamp");
        assert_eq!(created.timestamp(), 1_380_000_000);
    }

    #[test]
    fn upload_response_tolerates_bad_timestamp() {
        let resp = UploadResponse {
            created_at: "soon".to_string(),
            ..UploadResponse::default()
        };
        assert!(resp.created_at_time().is_none());
    }

    #[test]
    fn token_errors_are_recognised() {
        let expired = ApiResponse {
            errcode: 42001,
            errmsg: "access_token expired".to_string(),
        };
        assert!(expired.is_token_error());
        let ip = ApiResponse {
            errcode: 60020,
            errmsg: String::new(),
        };
        assert!(!ip.is_token_error());
    }

    #[test]
    fn recipient_joins_ids_and_skips_empty_selectors() {
        let to = Recipient::users(&["alice", "", "bob"]).with_tags(&["7"]);
        assert_eq!(to.touser, "alice|bob");
        let value = serde_json::to_value(&to).expect("serialize");
        assert_eq!(value, json!({"touser": "alice|bob", "totag": "7"}));
    }

    #[test]
    fn default_recipient_is_everyone() {
        assert_eq!(Recipient::default().touser, "@all");
        assert!(!Recipient::default().is_empty());
        assert!(Recipient::users::<&str>(&[]).is_empty());
    }

    #[test]
    fn send_request_flattens_into_wire_shape() {
        let to = Recipient::all();
        let body = MessageBody::text("hello");
        let req = SendRequest {
            recipient: &to,
            agentid: 1_000_002,
            body: &body,
            enable_duplicate_check: 1,
            duplicate_check_interval: 600,
        };
        let value = serde_json::to_value(&req).expect("serialize");
        assert_eq!(
            value,
            json!({
                "touser": "@all",
                "agentid": 1_000_002,
                "msgtype": "text",
                "text": {"content": "hello"},
                "enable_duplicate_check": 1,
                "duplicate_check_interval": 600
            })
        );
    }

    #[test]
    fn textcard_uses_default_button() {
        let card = TextCard::new("Build", "passed", "https://ci.example.com/1");
        let body = MessageBody::Textcard { textcard: card };
        let value = serde_json::to_value(&body).expect("serialize");
        assert_eq!(value["msgtype"], "textcard");
        assert_eq!(value["textcard"]["btntxt"], DEFAULT_BUTTON_TEXT);
        assert_eq!(body.msgtype(), "textcard");
    }

    #[test]
    fn markdown_and_image_bodies_serialize() {
        let md = serde_json::to_value(MessageBody::markdown("**hi**")).expect("serialize");
        assert_eq!(md, json!({"msgtype": "markdown", "markdown": {"content": "**hi**"}}));
        let img = serde_json::to_value(MessageBody::image("MID")).expect("serialize");
        assert_eq!(img, json!({"msgtype": "image", "image": {"media_id": "MID"}}));
    }

    #[test]
    fn media_type_parses_case_insensitively() {
        assert_eq!("Voice".parse::<MediaType>(), Ok(MediaType::Voice));
        assert!("gif".parse::<MediaType>().is_err());
        assert_eq!(MediaType::File.to_string(), "file");
    }
}
