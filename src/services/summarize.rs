use anyhow::{Context, Result};
use serde_json::Value;

const MODEL: &str = "models/gemini-1.5-flash";

/// Summarize a transcript via the Gemini generateContent endpoint.
pub async fn summarize_transcript(
    client: &reqwest::Client,
    token: &str,
    transcript: &str,
) -> Result<String> {
    let url = format!("https://generativelanguage.googleapis.com/v1beta/{MODEL}:generateContent");

    let body = serde_json::json!({
        "contents": [{
            "parts": [{
                "text": format!(
                    "Please provide a concise, readable summary of the following transcript:\n\n{transcript}"
                )
            }]
        }]
    });

    let response: Value = client
        .post(&url)
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .context("summarization request failed")?
        .error_for_status()
        .context("summarization rejected")?
        .json()
        .await
        .context("summarization returned an unexpected body")?;

    let summary = response
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .unwrap_or("No summary generated.")
        .to_string();

    Ok(summary)
}
