use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SHEETS_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

const HEADER_ROW: [&str; 4] = ["Date", "Session Name", "Summary Link", "Audio Link"];

/// One row of the tabular session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLogEntry {
    pub date: String,
    pub session_name: String,
    pub summary_link: String,
    pub audio_link: String,
}

/// Append one session row to the named spreadsheet, creating the
/// spreadsheet (with its header row) on first use.
pub async fn append_session_log(
    client: &reqwest::Client,
    token: &str,
    spreadsheet_title: &str,
    entry: &SessionLogEntry,
) -> Result<()> {
    let spreadsheet_id = match find_spreadsheet(client, token, spreadsheet_title).await? {
        Some(id) => id,
        None => {
            let id = create_spreadsheet(client, token, spreadsheet_title).await?;
            let header: Vec<String> = HEADER_ROW.iter().map(|s| s.to_string()).collect();
            append_values(client, token, &id, &header).await?;
            id
        }
    };

    let row = vec![
        entry.date.clone(),
        entry.session_name.clone(),
        entry.summary_link.clone(),
        entry.audio_link.clone(),
    ];
    append_values(client, token, &spreadsheet_id, &row).await?;

    info!("Logged session '{}' to sheet", entry.session_name);
    Ok(())
}

/// Read back all logged sessions (every row after the header). An absent
/// spreadsheet means an empty history.
pub async fn fetch_history(
    client: &reqwest::Client,
    token: &str,
    spreadsheet_title: &str,
) -> Result<Vec<SessionLogEntry>> {
    let Some(spreadsheet_id) = find_spreadsheet(client, token, spreadsheet_title).await? else {
        return Ok(Vec::new());
    };

    let url = format!("{SHEETS_URL}/{spreadsheet_id}/values/Sheet1!A2:D");
    let response: Value = client
        .get(&url)
        .bearer_auth(token)
        .send()
        .await
        .context("history read failed")?
        .error_for_status()
        .context("history read rejected")?
        .json()
        .await
        .context("history read returned an unexpected body")?;

    let Some(rows) = response.get("values").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    let cell = |row: &Value, idx: usize| -> String {
        row.get(idx)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    Ok(rows
        .iter()
        .map(|row| SessionLogEntry {
            date: cell(row, 0),
            session_name: cell(row, 1),
            summary_link: cell(row, 2),
            audio_link: cell(row, 3),
        })
        .collect())
}

async fn find_spreadsheet(
    client: &reqwest::Client,
    token: &str,
    title: &str,
) -> Result<Option<String>> {
    let query = format!(
        "mimeType='application/vnd.google-apps.spreadsheet' and name='{title}' and trashed=false"
    );

    let response: Value = client
        .get(DRIVE_FILES_URL)
        .query(&[("q", query.as_str())])
        .bearer_auth(token)
        .send()
        .await
        .context("spreadsheet lookup failed")?
        .error_for_status()
        .context("spreadsheet lookup rejected")?
        .json()
        .await
        .context("spreadsheet lookup returned an unexpected body")?;

    Ok(response
        .pointer("/files/0/id")
        .and_then(Value::as_str)
        .map(|s| s.to_string()))
}

async fn create_spreadsheet(
    client: &reqwest::Client,
    token: &str,
    title: &str,
) -> Result<String> {
    let response: Value = client
        .post(SHEETS_URL)
        .bearer_auth(token)
        .json(&serde_json::json!({ "properties": { "title": title } }))
        .send()
        .await
        .context("spreadsheet creation failed")?
        .error_for_status()
        .context("spreadsheet creation rejected")?
        .json()
        .await
        .context("spreadsheet creation returned an unexpected body")?;

    let id = response
        .get("spreadsheetId")
        .and_then(Value::as_str)
        .context("spreadsheet creation response missing id")?
        .to_string();

    info!("Created spreadsheet '{}'", title);
    Ok(id)
}

async fn append_values(
    client: &reqwest::Client,
    token: &str,
    spreadsheet_id: &str,
    values: &[String],
) -> Result<()> {
    let url = format!(
        "{SHEETS_URL}/{spreadsheet_id}/values/Sheet1:append?valueInputOption=USER_ENTERED"
    );

    client
        .post(&url)
        .bearer_auth(token)
        .json(&serde_json::json!({ "values": [values] }))
        .send()
        .await
        .context("sheet append failed")?
        .error_for_status()
        .context("sheet append rejected")?;

    Ok(())
}
