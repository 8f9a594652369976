//! HTTP client for the inspection API.
//!
//! Session handling is a pre-seeded cookie in the client's cookie store;
//! this subsystem never logs in or refreshes sessions. Ordinary requests
//! share one short timeout, photo uploads get a longer one.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::cookie::Jar;
use reqwest::{multipart, Client, Request, Response, Url};

use crate::config::SyncSettings;
use crate::error::{Error, Result};
use crate::models::{Inspection, InspectionEntry, InspectionStatus, LocalImage, RecordId};

use super::wire::{
    parse_api_error, CreateEntryRequest, StatusUpdateRequest, UpdateEntryRequest, WireEntry,
    WireInspection, WireUploadResponse,
};

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
    upload_timeout: Duration,
}

impl ApiClient {
    pub fn new(settings: &SyncSettings) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        if let Some(cookie) = &settings.session_cookie {
            let url = Url::parse(&settings.base_url).map_err(|error| {
                Error::Config(format!("Invalid base URL {}: {error}", settings.base_url))
            })?;
            jar.add_cookie_str(cookie, &url);
        }

        let client = Client::builder()
            .cookie_provider(jar)
            .timeout(settings.request_timeout)
            .build()?;

        Ok(Self {
            base_url: settings.base_url.clone(),
            client,
            upload_timeout: settings.upload_timeout,
        })
    }

    /// Fetch the current server copy of an inspection.
    pub async fn inspection(&self, id: &RecordId) -> Result<Inspection> {
        let url = format!(
            "{}/api/inspections/{}",
            self.base_url,
            urlencoding::encode(id.as_str())
        );
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;
        let wire = check(response).await?.json::<WireInspection>().await?;
        wire.try_into()
    }

    /// List an inspection's entries, optionally only those changed after
    /// the given Unix-ms cursor.
    pub async fn entries(
        &self,
        inspection_id: &RecordId,
        updated_after: Option<i64>,
    ) -> Result<Vec<InspectionEntry>> {
        let url = format!(
            "{}/api/inspections/{}/entries",
            self.base_url,
            urlencoding::encode(inspection_id.as_str())
        );
        let mut request = self.client.get(url).header("Accept", "application/json");
        if let Some(cursor) = updated_after {
            request = request.query(&[("updated_after", cursor.to_string())]);
        }

        let response = request.send().await?;
        let wire = check(response).await?.json::<Vec<WireEntry>>().await?;
        wire.into_iter().map(InspectionEntry::try_from).collect()
    }

    /// Create an entry server-side; the response carries the server id.
    pub async fn create_entry(&self, entry: &InspectionEntry) -> Result<InspectionEntry> {
        let url = format!("{}/api/inspection-entries", self.base_url);
        let response = self
            .client
            .post(url)
            .json(&CreateEntryRequest::from(entry))
            .send()
            .await?;
        let wire = check(response).await?.json::<WireEntry>().await?;
        wire.try_into()
    }

    /// Push the current state of an entry the server already knows.
    pub async fn update_entry(&self, entry: &InspectionEntry) -> Result<InspectionEntry> {
        let url = format!(
            "{}/api/inspection-entries/{}",
            self.base_url,
            urlencoding::encode(entry.id.as_str())
        );
        let response = self
            .client
            .patch(url)
            .json(&UpdateEntryRequest::from(entry))
            .send()
            .await?;
        let wire = check(response).await?.json::<WireEntry>().await?;
        wire.try_into()
    }

    /// Remove an entry server-side.
    pub async fn delete_entry(&self, id: &RecordId) -> Result<()> {
        let url = format!(
            "{}/api/inspection-entries/{}",
            self.base_url,
            urlencoding::encode(id.as_str())
        );
        let response = self.client.delete(url).send().await?;
        check(response).await?;
        Ok(())
    }

    /// Transition an inspection's lifecycle status.
    pub async fn set_inspection_status(
        &self,
        id: &RecordId,
        status: InspectionStatus,
    ) -> Result<()> {
        let url = format!(
            "{}/api/inspections/{}/status",
            self.base_url,
            urlencoding::encode(id.as_str())
        );
        let body = StatusUpdateRequest {
            status: status.as_str(),
            updated_at: Utc::now().timestamp_millis(),
        };
        let response = self.client.patch(url).json(&body).send().await?;
        check(response).await?;
        Ok(())
    }

    /// Upload a photo and return its durable server URL.
    pub async fn upload_photo(&self, image: &LocalImage) -> Result<String> {
        let bytes = tokio::fs::read(&image.local_path).await?;
        let request = self.build_upload_request(image, bytes)?;
        let response = self.client.execute(request).await?;
        let payload = check(response).await?.json::<WireUploadResponse>().await?;
        payload.into_url()
    }

    fn build_upload_request(&self, image: &LocalImage, bytes: Vec<u8>) -> Result<Request> {
        let file_name = Path::new(&image.local_path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("photo.jpg")
            .to_string();

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_for_path(&image.local_path))?;

        let mut form = multipart::Form::new()
            .text("inspectionId", image.inspection_id.to_string())
            .part("photo", part);
        if let Some(entry_id) = &image.entry_id {
            form = form.text("entryId", entry_id.to_string());
        }

        self.client
            .post(format!("{}/api/inspection-photos", self.base_url))
            .timeout(self.upload_timeout)
            .multipart(form)
            .build()
            .map_err(Error::Network)
    }
}

async fn check(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(Error::Api {
        status,
        message: parse_api_error(&body),
    })
}

fn mime_for_path(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("heic") => "image/heic",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn client() -> ApiClient {
        let mut settings = SyncSettings::new("https://api.example.com", "acct_1");
        settings.session_cookie = Some("session=abc123".to_string());
        ApiClient::new(&settings).unwrap()
    }

    #[test]
    fn test_upload_request_shape() {
        let api = client();
        let image = LocalImage::new(
            "/data/images/ins-9/1-photo.jpg",
            RecordId::from("ins_9"),
            Some(RecordId::from("ent_55")),
        );

        let request = api.build_upload_request(&image, vec![0, 1, 2, 3]).unwrap();
        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(
            request.url().as_str(),
            "https://api.example.com/api/inspection-photos"
        );
        assert_eq!(request.timeout(), Some(&Duration::from_secs(120)));
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path("/img/a.JPG"), "image/jpeg");
        assert_eq!(mime_for_path("/img/a.png"), "image/png");
        assert_eq!(mime_for_path("/img/a"), "application/octet-stream");
    }
}
