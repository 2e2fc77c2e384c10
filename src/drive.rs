// Drive client module: a small blocking HTTP client over the Drive v3
// file endpoints. Each operation is a single request with no retry; a
// non-success status becomes an error carrying the status and body so
// the caller sees exactly what the provider said.

use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::io::Read;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/drive/v3";
const DEFAULT_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3";

/// MIME type marking an object as a folder rather than a file.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

// Boundary for the two-part upload body. Fixed string; the metadata and
// media parts never contain it.
const UPLOAD_BOUNDARY: &str = "gdrive_tasks_upload";

/// The slice of file metadata this program cares about.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Client handle passed explicitly to every operation. Holds the
/// blocking HTTP client, the two endpoint roots (metadata and upload)
/// and the bearer token for the session.
#[derive(Clone)]
pub struct DriveClient {
    client: Client,
    base_url: String,
    upload_url: String,
    token: String,
}

impl DriveClient {
    pub fn new(access_token: &str) -> Result<Self> {
        Self::with_endpoints(access_token, DEFAULT_BASE_URL, DEFAULT_UPLOAD_URL)
    }

    /// Build a client against custom endpoint roots. Tests point this
    /// at a local fake backend.
    pub fn with_endpoints(access_token: &str, base_url: &str, upload_url: &str) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(DriveClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            upload_url: upload_url.trim_end_matches('/').to_string(),
            token: access_token.to_string(),
        })
    }

    /// Create a remote file named `name` under `parent_id` and upload
    /// `content` as its body in one multipart request. Returns the
    /// created object's id and name.
    pub fn create_file(
        &self,
        name: &str,
        mime_type: &str,
        content: &mut dyn Read,
        parent_id: &str,
    ) -> Result<DriveFile> {
        let mut data = Vec::new();
        content
            .read_to_end(&mut data)
            .context("Reading upload content")?;

        let metadata = serde_json::json!({
            "name": name,
            "mimeType": mime_type,
            "parents": [parent_id],
        });
        let url = format!("{}/files?uploadType=multipart", self.upload_url);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={}", UPLOAD_BOUNDARY),
            )
            .body(multipart_related(&metadata.to_string(), mime_type, &data))
            .send()
            .context("Failed to send upload request")?;
        let res = ensure_success("Upload", res)?;
        res.json().context("Parsing created file json")
    }

    /// Create a folder-typed object. No parent is set, so it lands in
    /// the drive root.
    pub fn create_folder(&self, name: &str) -> Result<DriveFile> {
        let url = format!("{}/files", self.base_url);
        let body = serde_json::json!({ "name": name, "mimeType": FOLDER_MIME_TYPE });
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .context("Failed to send folder create request")?;
        let res = ensure_success("Folder create", res)?;
        res.json().context("Parsing created folder json")
    }

    /// Fetch a file's metadata, confirming it exists and is visible to
    /// this account.
    pub fn file_metadata(&self, file_id: &str) -> Result<DriveFile> {
        let url = format!("{}/files/{}", self.base_url, file_id);
        let res = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .context("Failed to send metadata request")?;
        let res = ensure_success("Metadata fetch", res)?;
        res.json().context("Parsing file metadata json")
    }

    /// Ids of every object whose name equals `name` exactly, in the
    /// order the provider lists them.
    pub fn files_by_name(&self, name: &str) -> Result<Vec<String>> {
        let url = format!("{}/files", self.base_url);
        let query = format!("name='{}'", escape_query_value(name));
        let res = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("q", query.as_str())])
            .send()
            .context("Failed to send list request")?;
        let res = ensure_success("List", res)?;
        let list: FileList = res.json().context("Parsing file list json")?;
        Ok(list.files.into_iter().map(|f| f.id).collect())
    }

    /// Update the file's display name. The request body carries the
    /// name field and nothing else, so the rest of the metadata is left
    /// untouched.
    pub fn rename_file(&self, file_id: &str, new_name: &str) -> Result<DriveFile> {
        let url = format!("{}/files/{}", self.base_url, file_id);
        let body = serde_json::json!({ "name": new_name });
        let res = self
            .client
            .patch(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .context("Failed to send rename request")?;
        let res = ensure_success("Rename", res)?;
        res.json().context("Parsing renamed file json")
    }

    /// Download the file converted to `mime_type`. Works only for
    /// workspace documents the provider can convert.
    pub fn export_file(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>> {
        let url = format!("{}/files/{}/export", self.base_url, file_id);
        let res = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("mimeType", mime_type)])
            .send()
            .context("Failed to send export request")?;
        let res = ensure_success("Export", res)?;
        let bytes = res.bytes().context("Reading export body")?;
        Ok(bytes.to_vec())
    }
}

/// Browser viewer link for a presentation file id.
pub fn presentation_link(file_id: &str) -> String {
    format!("https://docs.google.com/presentation/d/{}", file_id)
}

fn ensure_success(action: &str, res: Response) -> Result<Response> {
    if !res.status().is_success() {
        let status = res.status();
        let txt = res.text().unwrap_or_else(|_| "".into());
        bail!("{} failed: {} - {}", action, status, txt);
    }
    Ok(res)
}

// Single quotes delimit string literals in Drive list queries; escape
// them and the escape character itself inside the value.
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

// Drive's one-shot upload body: a json metadata part followed by the
// media part, in `multipart/related` framing.
fn multipart_related(metadata_json: &str, media_type: &str, media: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(metadata_json.len() + media.len() + 256);
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{}\r\n",
            UPLOAD_BOUNDARY, metadata_json
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!("--{}\r\nContent-Type: {}\r\n\r\n", UPLOAD_BOUNDARY, media_type).as_bytes(),
    );
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{}--\r\n", UPLOAD_BOUNDARY).as_bytes());
    body
}
