use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::info;

use crate::audio::EncodedAudio;

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const DRIVE_UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart&fields=id,webViewLink";

#[derive(Debug, Clone, Deserialize)]
pub struct DriveFile {
    pub id: String,
    #[serde(rename = "webViewLink")]
    pub web_view_link: String,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileRef>,
}

#[derive(Debug, Deserialize)]
struct FileRef {
    id: String,
}

/// Upload a finalized recording into the named Drive folder, creating the
/// folder on first use. The upload MIME type comes from the codec the
/// capture device actually negotiated.
pub async fn upload_audio(
    client: &reqwest::Client,
    token: &str,
    audio: &EncodedAudio,
    filename: &str,
    folder_name: &str,
) -> Result<DriveFile> {
    let folder_id = match find_folder(client, token, folder_name).await? {
        Some(id) => id,
        None => create_folder(client, token, folder_name).await?,
    };

    let metadata = serde_json::json!({
        "name": filename,
        "parents": [folder_id],
        "mimeType": audio.codec.essence(),
    });

    let form = Form::new()
        .part(
            "metadata",
            Part::text(metadata.to_string())
                .mime_str("application/json")
                .context("invalid metadata part")?,
        )
        .part(
            "file",
            Part::bytes(audio.bytes.clone())
                .file_name(filename.to_string())
                .mime_str(audio.codec.essence())
                .context("invalid audio MIME type")?,
        );

    let file: DriveFile = client
        .post(DRIVE_UPLOAD_URL)
        .bearer_auth(token)
        .multipart(form)
        .send()
        .await
        .context("Drive upload request failed")?
        .error_for_status()
        .context("Drive upload rejected")?
        .json()
        .await
        .context("Drive upload returned an unexpected body")?;

    info!("Uploaded {} ({} bytes) to Drive", filename, audio.len());
    Ok(file)
}

async fn find_folder(
    client: &reqwest::Client,
    token: &str,
    folder_name: &str,
) -> Result<Option<String>> {
    let query = format!(
        "mimeType='application/vnd.google-apps.folder' and name='{folder_name}' and trashed=false"
    );

    let list: FileList = client
        .get(DRIVE_FILES_URL)
        .query(&[("q", query.as_str())])
        .bearer_auth(token)
        .send()
        .await
        .context("Drive folder lookup failed")?
        .error_for_status()
        .context("Drive folder lookup rejected")?
        .json()
        .await
        .context("Drive folder lookup returned an unexpected body")?;

    Ok(list.files.into_iter().next().map(|f| f.id))
}

async fn create_folder(
    client: &reqwest::Client,
    token: &str,
    folder_name: &str,
) -> Result<String> {
    let metadata = serde_json::json!({
        "name": folder_name,
        "mimeType": "application/vnd.google-apps.folder",
    });

    let created: FileRef = client
        .post(DRIVE_FILES_URL)
        .bearer_auth(token)
        .json(&metadata)
        .send()
        .await
        .context("Drive folder creation failed")?
        .error_for_status()
        .context("Drive folder creation rejected")?
        .json()
        .await
        .context("Drive folder creation returned an unexpected body")?;

    info!("Created Drive folder '{}'", folder_name);
    Ok(created.id)
}
