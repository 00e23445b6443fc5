//! `wellmed extract` — Extract a local PDF the way the upload endpoint does.

use std::path::Path;
use wellmed_gateway::api::AnalyzeResponse;

pub async fn run(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = tokio::fs::read(file)
        .await
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;

    let document = wellmed_documents::extract_pdf(bytes)
        .await
        .map_err(|e| format!("Failed to extract {}: {e}", file.display()))?;
    tracing::debug!(pages = document.pages, "Extracted {}", file.display());

    let response = AnalyzeResponse {
        success: true,
        document,
    };
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
