use crate::dtos::{ChannelMessage, ImageUploadResponse};
use crate::error::{ErrorMessage, HttpError};

/// HTTP client wrapper for the two outbound integrations: the third-party
/// image host and the news channel endpoint.
///
/// Cloning is cheap because reqwest::Client uses Arc internally.
#[derive(Clone)]
pub struct HttpClient {
    pub conn: reqwest::Client,
}

impl HttpClient {
    pub fn new(conn: reqwest::Client) -> Self {
        Self { conn }
    }

    /// Upload an image to the external host and return the hosted URL.
    ///
    /// This sits on the required path of article submission: a failure here
    /// fails the whole submission, there is no article-without-image fallback.
    pub async fn upload_image(
        &self,
        image_api_url: &str,
        image_api_key: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, HttpError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("image", part);

        let response = self
            .conn
            .post(image_api_url)
            .bearer_auth(image_api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Image upload request failed: {}", e);
                HttpError::server_error(ErrorMessage::UploadFailed.to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!(status = %response.status(), "Image host rejected upload");
            return Err(HttpError::server_error(ErrorMessage::UploadFailed.to_string()));
        }

        let body: ImageUploadResponse = response.json().await.map_err(|e| {
            tracing::error!("Image upload response parse error: {}", e);
            HttpError::server_error(ErrorMessage::UploadFailed.to_string())
        })?;

        Ok(body.url)
    }

    /// Remove a hosted image. Best effort: callers log the error and move on,
    /// an orphaned file on the host is acceptable, a dangling record is not.
    pub async fn delete_image(
        &self,
        image_api_url: &str,
        image_api_key: &str,
        image_url: &str,
    ) -> Result<(), HttpError> {
        let response = self
            .conn
            .delete(image_api_url)
            .bearer_auth(image_api_key)
            .query(&[("url", image_url)])
            .send()
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(HttpError::server_error(format!(
                "Image host returned {}",
                response.status()
            )));
        }

        Ok(())
    }

    /// Deliver `{text, image_url}` to the fixed channel endpoint.
    ///
    /// Fire-and-forget downstream of approval: the caller catches and logs
    /// failures, never unwinding the approval itself.
    pub async fn notify_channel(
        &self,
        channel_api_url: &str,
        text: &str,
        image_url: Option<&str>,
    ) -> Result<(), HttpError> {
        let message = ChannelMessage {
            text: text.to_string(),
            image_url: image_url.map(|s| s.to_string()),
        };

        let response = self
            .conn
            .post(channel_api_url)
            .json(&message)
            .send()
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(HttpError::server_error(format!(
                "Channel endpoint returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}
