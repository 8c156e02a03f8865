//! Remote storage client (Drive v3 REST API)
//!
//! Authenticates as a service account: a signed RS256 assertion is exchanged
//! for a bearer token, which is cached until shortly before it expires.
//! Every call is logged under the `drive` target so it lands in the remote
//! log stream.

use super::drive_ops::{DriveFile, DriveOperations, ARTIFACT_MIME_TYPE, FOLDER_MIME_TYPE};
use anyhow::{Context, Result};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info};

const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: u64 = 3600;
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
const MULTIPART_BOUNDARY: &str = "mongo_drive_rotator_boundary";

/// Fields read from the service account credential file
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read credential file {:?}", path))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse credential file {:?}", path))
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Blocking Drive v3 client
pub struct DriveClient {
    http: reqwest::blocking::Client,
    key: ServiceAccountKey,
    token: Mutex<Option<CachedToken>>,
}

impl DriveClient {
    /// Build a client from a service account credential file
    pub fn from_credentials_file(path: &Path) -> Result<Self> {
        let key = ServiceAccountKey::from_file(path)?;
        Self::new(key)
    }

    pub fn new(key: ServiceAccountKey) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            key,
            token: Mutex::new(None),
        })
    }

    fn access_token(&self) -> Result<String> {
        let mut cached = self
            .token
            .lock()
            .map_err(|_| anyhow::anyhow!("Token cache poisoned"))?;

        if let Some(ref token) = *cached {
            if Instant::now() + TOKEN_REFRESH_MARGIN < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.fetch_token()?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    fn fetch_token(&self) -> Result<CachedToken> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("System clock is before the Unix epoch")?
            .as_secs();

        let claims = Claims {
            iss: &self.key.client_email,
            scope: DRIVE_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };

        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .context("Invalid service account private key")?;
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .context("Failed to sign service account assertion")?;

        debug!(target: "drive", "Requesting access token for {}", self.key.client_email);

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .context("Failed to request access token")?;

        let response = check_status(response, "token exchange")?;
        let token: TokenResponse = response.json().context("Failed to parse token response")?;

        Ok(CachedToken {
            value: token.access_token,
            expires_at: Instant::now()
                + Duration::from_secs(token.expires_in.unwrap_or(TOKEN_LIFETIME_SECS)),
        })
    }
}

fn check_status(
    response: reqwest::blocking::Response,
    operation: &str,
) -> Result<reqwest::blocking::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().unwrap_or_default();
        error!(target: "drive", "{} failed with status {}: {}", operation, status, body);
        anyhow::bail!("{} failed with status {}: {}", operation, status, body)
    }
}

/// Build a multipart/related upload body: JSON metadata part, then media part
fn multipart_body(metadata: &serde_json::Value, media: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(media.len() + 512);
    body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", ARTIFACT_MIME_TYPE).as_bytes());
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}

impl DriveOperations for DriveClient {
    fn list_children(&self, parent_id: &str) -> Result<Vec<DriveFile>> {
        let query = format!("'{}' in parents and trashed = false", parent_id);
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let token = self.access_token()?;
            let mut request = self
                .http
                .get(FILES_URL)
                .bearer_auth(token)
                .query(&[
                    ("q", query.as_str()),
                    ("fields", "nextPageToken, files(id, name, mimeType)"),
                    ("pageSize", "1000"),
                ]);
            if let Some(ref page) = page_token {
                request = request.query(&[("pageToken", page.as_str())]);
            }

            let response = request
                .send()
                .with_context(|| format!("Failed to list children of {}", parent_id))?;
            let response = check_status(response, "list")?;
            let page: FileList = response.json().context("Failed to parse file list")?;

            files.extend(page.files);
            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        debug!(target: "drive", "Listed {} children of {}", files.len(), parent_id);
        Ok(files)
    }

    fn create_folder(&self, name: &str, parent_id: &str) -> Result<String> {
        let metadata = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
            "parents": [parent_id],
        });

        let response = self
            .http
            .post(FILES_URL)
            .bearer_auth(self.access_token()?)
            .query(&[("fields", "id")])
            .json(&metadata)
            .send()
            .with_context(|| format!("Failed to create folder '{}' in {}", name, parent_id))?;
        let response = check_status(response, "create folder")?;
        let created: CreatedFile = response.json().context("Failed to parse created folder")?;

        info!(target: "drive", "Created folder '{}' ({}) in {}", name, created.id, parent_id);
        Ok(created.id)
    }

    fn upload_file(&self, parent_id: &str, path: &Path) -> Result<String> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| anyhow::anyhow!("Upload path has no file name: {:?}", path))?;
        let media = fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;

        let metadata = serde_json::json!({
            "name": name,
            "parents": [parent_id],
        });

        let response = self
            .http
            .post(UPLOAD_URL)
            .bearer_auth(self.access_token()?)
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", MULTIPART_BOUNDARY),
            )
            .body(multipart_body(&metadata, &media))
            .send()
            .with_context(|| format!("Failed to upload '{}' to {}", name, parent_id))?;
        let response = check_status(response, "upload")?;
        let created: CreatedFile = response.json().context("Failed to parse uploaded file")?;

        info!(target: "drive", "Uploaded '{}' ({}) to {}", name, created.id, parent_id);
        Ok(created.id)
    }

    fn delete_file(&self, file_id: &str) -> Result<()> {
        let response = self
            .http
            .delete(format!("{}/{}", FILES_URL, file_id))
            .bearer_auth(self.access_token()?)
            .send()
            .with_context(|| format!("Failed to delete {}", file_id))?;
        check_status(response, "delete")?;

        info!(target: "drive", "Deleted {}", file_id);
        Ok(())
    }
}
