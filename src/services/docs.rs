use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

const DOCS_URL: &str = "https://docs.googleapis.com/v1/documents";

#[derive(Debug, Clone)]
pub struct DocInfo {
    pub document_id: String,
    pub web_view_link: String,
}

#[derive(Debug, Deserialize)]
struct CreatedDoc {
    #[serde(rename = "documentId")]
    document_id: String,
}

/// Create a titled Google Doc and insert the summary at the start of its
/// body. Returns the document id plus a constructed edit link.
pub async fn create_summary_doc(
    client: &reqwest::Client,
    token: &str,
    title: &str,
    summary: &str,
) -> Result<DocInfo> {
    let created: CreatedDoc = client
        .post(DOCS_URL)
        .bearer_auth(token)
        .json(&serde_json::json!({ "title": title }))
        .send()
        .await
        .context("document creation failed")?
        .error_for_status()
        .context("document creation rejected")?
        .json()
        .await
        .context("document creation returned an unexpected body")?;

    let update_url = format!("{}/{}:batchUpdate", DOCS_URL, created.document_id);
    let body = serde_json::json!({
        "requests": [{
            "insertText": {
                "location": { "index": 1 },
                "text": summary,
            }
        }]
    });

    client
        .post(&update_url)
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .context("document update failed")?
        .error_for_status()
        .context("document update rejected")?;

    info!("Created summary document '{}'", title);

    let web_view_link = format!(
        "https://docs.google.com/document/d/{}/edit",
        created.document_id
    );

    Ok(DocInfo {
        document_id: created.document_id,
        web_view_link,
    })
}
