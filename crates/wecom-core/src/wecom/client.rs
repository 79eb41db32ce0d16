//! WeCom application API client.
//!
//! Every operation is one authenticate-then-call round trip:
//!
//! 1. Fetch an access token from `gettoken` (or reuse the cached one)
//! 2. Call the endpoint with `access_token` in the query string
//!
//! The token is cached until the API reports it missing, invalid, or expired.
//! The client does not track the server-side lifetime itself.

use std::time::Duration;

use base64::Engine as _;
use reqwest::{Client, Response, header};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::config::{ApiConfig, AppConfig};
use crate::wecom::media::{
    encode_upload_body, html_file_name, multipart_content_type, new_boundary, validate_upload,
};
use crate::wecom::models::{
    ApiResponse, Envelope, MediaType, MessageBody, Recipient, SendRequest, SendResponse, TextCard,
    TokenResponse, UploadResponse,
};
use crate::wecom::text::split_text;
use crate::{CoreError, Result};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// WeCom application API client.
#[derive(Debug)]
pub struct WecomClient {
    http_client: Client,
    api: ApiConfig,
    token: Mutex<Option<String>>,
}

impl WecomClient {
    /// Create a client for one application.
    ///
    /// # Errors
    ///
    /// Returns an error if the corp id or secret is empty, or HTTP client
    /// creation fails.
    pub fn new(api: ApiConfig, timeout: Duration) -> Result<Self> {
        if api.corp_id.trim().is_empty() {
            return Err(CoreError::Config("api.corp_id is not set".to_string()));
        }
        if api.secret.trim().is_empty() {
            return Err(CoreError::Config("api.secret is not set".to_string()));
        }

        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Api(format!("creating HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            api,
            token: Mutex::new(None),
        })
    }

    /// Create a client from the loaded application configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the API section is incomplete or HTTP client
    /// creation fails.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let timeout = config.runtime.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self::new(config.api.clone(), Duration::from_secs(timeout))
    }

    /// The API settings this client was built with.
    #[must_use]
    pub const fn api_config(&self) -> &ApiConfig {
        &self.api
    }

    /// Recipient used when the caller does not name one.
    #[must_use]
    pub fn default_recipient(&self) -> Recipient {
        Recipient::user(self.api.default_recipient.clone())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/cgi-bin/{path}", self.api.base_url.trim_end_matches('/'))
    }

    // ─── Token ───────────────────────────────────────────────────────

    /// Return the cached access token, fetching a new one if none is cached.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Auth`] if the server does not hand out a token.
    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }
        let token = self.fetch_token().await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Drop the cached access token so the next call fetches a new one.
    pub async fn invalidate_token(&self) {
        self.token.lock().await.take();
    }

    async fn fetch_token(&self) -> Result<String> {
        let url = format!(
            "{}?corpid={}&corpsecret={}",
            self.endpoint("gettoken"),
            urlencoding::encode(&self.api.corp_id),
            urlencoding::encode(&self.api.secret)
        );

        log::debug!("fetching access token for corp {}", self.api.corp_id);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| {
                CoreError::Auth(format!("token request failed: {}", e.without_url()))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CoreError::Auth(format!(
                "token request failed: {status} - {text}"
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| {
                CoreError::Auth(format!("parsing token response: {}", e.without_url()))
            })?;

        match body.access_token {
            Some(token) if !token.is_empty() => {
                log::debug!(
                    "obtained access token (expires_in: {})",
                    body.expires_in.unwrap_or_default()
                );
                Ok(token)
            }
            _ => Err(CoreError::Auth(format!(
                "failed to get access token: errcode {} - {}",
                body.base.errcode, body.base.errmsg
            ))),
        }
    }

    // ─── Messages ────────────────────────────────────────────────────

    /// Send any message body to `to`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be fetched, the request fails,
    /// or the API reports a non-zero errcode.
    pub async fn send(&self, body: &MessageBody, to: &Recipient) -> Result<SendResponse> {
        if to.is_empty() {
            return Err(CoreError::Validation("message has no recipient".to_string()));
        }

        let token = self.access_token().await?;
        let url = format!(
            "{}?access_token={}",
            self.endpoint("message/send"),
            urlencoding::encode(&token)
        );

        let interval = self.api.duplicate_check_interval;
        let request = SendRequest {
            recipient: to,
            agentid: self.api.agent_id,
            body,
            enable_duplicate_check: u8::from(interval > 0),
            duplicate_check_interval: interval,
        };

        log::debug!("sending {} message to {}", body.msgtype(), describe(to));

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| CoreError::Api(format!("send request failed: {}", e.without_url())))?;

        let parsed: SendResponse = self
            .read_envelope(response, &token, "send message")
            .await?;
        if let Some(invalid) = parsed.invaliduser.as_deref().filter(|s| !s.is_empty()) {
            log::warn!("message not delivered to users: {invalid}");
        }
        Ok(parsed)
    }

    /// Send a plain text message.
    ///
    /// # Errors
    ///
    /// See [`WecomClient::send`].
    pub async fn send_text(&self, text: &str, to: &Recipient) -> Result<SendResponse> {
        self.send(&MessageBody::text(text), to).await
    }

    /// Send a text message split into chunks of at most `max_content_bytes`.
    ///
    /// Falls back to the configured chunk size when `max_content_bytes` is
    /// `None`. Chunks are sent in order; the first failing chunk stops the
    /// send and later chunks are not delivered.
    ///
    /// # Errors
    ///
    /// See [`WecomClient::send`].
    pub async fn send_text_autosplit(
        &self,
        text: &str,
        to: &Recipient,
        max_content_bytes: Option<usize>,
    ) -> Result<Vec<SendResponse>> {
        let max = max_content_bytes.unwrap_or(self.api.max_content_bytes);
        if max == 0 {
            return Err(CoreError::Validation(
                "max_content_bytes must be positive".to_string(),
            ));
        }

        let chunks = split_text(text, max);
        let total = chunks.len();
        let mut responses = Vec::with_capacity(total);
        for (i, chunk) in chunks.into_iter().enumerate() {
            log::debug!("sending chunk {}/{total} ({} bytes)", i + 1, chunk.len());
            responses.push(self.send_text(&chunk, to).await?);
        }
        Ok(responses)
    }

    /// Send a markdown message. Only rendered inside the WeCom app.
    ///
    /// Inline images (`![alt](url)`) are not supported by the server.
    ///
    /// # Errors
    ///
    /// See [`WecomClient::send`].
    pub async fn send_markdown(&self, text: &str, to: &Recipient) -> Result<SendResponse> {
        self.send(&MessageBody::markdown(text), to).await
    }

    /// Send a text card.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if a field exceeds its byte limit,
    /// otherwise see [`WecomClient::send`].
    pub async fn send_textcard(&self, card: &TextCard, to: &Recipient) -> Result<SendResponse> {
        validate_textcard(card)?;
        let body = MessageBody::Textcard {
            textcard: card.clone(),
        };
        self.send(&body, to).await
    }

    /// Upload an image and send it.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload or the send fails.
    pub async fn send_image(
        &self,
        content: &[u8],
        filename: &str,
        to: &Recipient,
    ) -> Result<SendResponse> {
        let content_type = image_content_type(content);
        let uploaded = self
            .upload_temp_media(filename, content, content_type, MediaType::Image)
            .await?;
        self.send(&MessageBody::image(uploaded.media_id), to).await
    }

    /// Decode a base64 image and send it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for invalid base64, otherwise see
    /// [`WecomClient::send_image`].
    pub async fn send_image_base64(&self, encoded: &str, to: &Recipient) -> Result<SendResponse> {
        let content = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| CoreError::Validation(format!("invalid base64 image: {e}")))?;
        let filename = match image_content_type(&content) {
            "image/png" => "picture.png",
            _ => "picture.jpg",
        };
        self.send_image(&content, filename, to).await
    }

    // ─── Media ───────────────────────────────────────────────────────

    /// Upload a temporary media file. The media expires after three days.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if the size is out of range for
    /// `media_type`, [`CoreError::Remote`] if the API rejects the upload.
    pub async fn upload_temp_media(
        &self,
        filename: &str,
        content: &[u8],
        content_type: &str,
        media_type: MediaType,
    ) -> Result<UploadResponse> {
        validate_upload(media_type, content.len())?;

        let token = self.access_token().await?;
        let url = format!(
            "{}?access_token={}&type={media_type}",
            self.endpoint("media/upload"),
            urlencoding::encode(&token)
        );

        let boundary = new_boundary(content);
        let body = encode_upload_body(&boundary, filename, content_type, content);

        log::debug!(
            "uploading {media_type} {filename} ({} bytes, {content_type})",
            content.len()
        );

        let response = self
            .http_client
            .post(&url)
            .header(header::CONTENT_TYPE, multipart_content_type(&boundary))
            .body(body)
            .send()
            .await
            .map_err(|e| CoreError::Api(format!("upload request failed: {}", e.without_url())))?;

        let uploaded: UploadResponse = self
            .read_envelope(response, &token, "upload media")
            .await?;
        log::info!("uploaded {filename} as media {}", uploaded.media_id);
        Ok(uploaded)
    }

    /// Upload an HTML document as a file, forcing a `.html` name.
    ///
    /// # Errors
    ///
    /// See [`WecomClient::upload_temp_media`].
    pub async fn upload_html(&self, filename: &str, content: &str) -> Result<UploadResponse> {
        self.upload_temp_media(
            &html_file_name(filename),
            content.as_bytes(),
            "text/html",
            MediaType::File,
        )
        .await
    }

    /// Build the download URL of a temporary media item.
    ///
    /// The URL embeds the current access token. Media ids are shared by all
    /// applications of the same corp and expire after three days.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be fetched.
    pub async fn temp_media_url(&self, media_id: &str) -> Result<String> {
        let token = self.access_token().await?;
        Ok(self.media_url(&token, media_id))
    }

    fn media_url(&self, token: &str, media_id: &str) -> String {
        format!(
            "{}?access_token={}&media_id={}",
            self.endpoint("media/get"),
            urlencoding::encode(token),
            urlencoding::encode(media_id)
        )
    }

    /// Download a temporary media item.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Remote`] if the server answers with an error
    /// envelope instead of the media content.
    pub async fn download_temp_media(&self, media_id: &str) -> Result<Vec<u8>> {
        let token = self.access_token().await?;
        let url = self.media_url(&token, media_id);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| CoreError::Api(format!("media request failed: {}", e.without_url())))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CoreError::Api(format!(
                "get media failed: {status} - {text}"
            )));
        }

        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("json") || v.starts_with("text/plain"));

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CoreError::Api(format!("reading media body: {}", e.without_url())))?;

        if is_json && let Ok(envelope) = serde_json::from_slice::<ApiResponse>(&bytes) {
            self.check(&envelope, &token).await?;
        }

        Ok(bytes.to_vec())
    }

    // ─── Response handling ───────────────────────────────────────────

    async fn read_envelope<T>(&self, response: Response, token: &str, what: &str) -> Result<T>
    where
        T: DeserializeOwned + Envelope,
    {
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CoreError::Api(format!("{what} failed: {status} - {text}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| {
                CoreError::Api(format!("reading {what} response: {}", e.without_url()))
            })?;

        let parsed: T = serde_json::from_slice(&bytes)
            .map_err(|e| CoreError::Serialization(format!("parsing {what} response: {e}")))?;

        self.check(parsed.envelope(), token).await?;
        Ok(parsed)
    }

    /// Turn a non-zero errcode into an error. `used_token` is the token the
    /// request carried; the cache is only cleared if it still holds that one.
    async fn check(&self, envelope: &ApiResponse, used_token: &str) -> Result<()> {
        if envelope.is_success() {
            return Ok(());
        }
        if envelope.is_token_error() {
            let mut cached = self.token.lock().await;
            if cached.as_deref() == Some(used_token) {
                log::info!(
                    "access token rejected (errcode {}), dropping cache",
                    envelope.errcode
                );
                cached.take();
            }
        }
        Err(CoreError::Remote {
            errcode: envelope.errcode,
            errmsg: envelope.errmsg.clone(),
        })
    }
}

/// Check text card fields against their byte limits.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] naming the first field over its limit.
pub fn validate_textcard(card: &TextCard) -> Result<()> {
    let fields = [
        ("title", card.title.len(), TextCard::MAX_TITLE_BYTES),
        ("description", card.description.len(), TextCard::MAX_DESCRIPTION_BYTES),
        ("url", card.url.len(), TextCard::MAX_URL_BYTES),
    ];
    for (name, len, max) in fields {
        if len > max {
            return Err(CoreError::Validation(format!(
                "text card {name} is {len} bytes, limit is {max}"
            )));
        }
    }
    Ok(())
}

/// Sniff JPEG/PNG magic bytes. Images must be one of the two.
fn image_content_type(content: &[u8]) -> &'static str {
    if content.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else {
        "image/jpeg"
    }
}

fn describe(to: &Recipient) -> String {
    let mut parts = Vec::new();
    if !to.touser.is_empty() {
        parts.push(format!("users {}", to.touser));
    }
    if !to.toparty.is_empty() {
        parts.push(format!("parties {}", to.toparty));
    }
    if !to.totag.is_empty() {
        parts.push(format!("tags {}", to.totag));
    }
    parts.join(", ")
}
