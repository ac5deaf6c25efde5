use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::{AppError, AppResult, MetricsError};

use super::summary::RunSummary;

/// Writes the summary as pretty JSON.
///
/// # Errors
///
/// Returns an error if the summary cannot be serialized or the file cannot be written.
pub(crate) async fn export_summary(path: &str, summary: &RunSummary) -> AppResult<()> {
    let json = serde_json::to_vec_pretty(summary)
        .map_err(|err| AppError::metrics(MetricsError::SerializeSummary { source: err }))?;
    write_file(path, &json).await.map_err(|err| {
        AppError::metrics(MetricsError::WriteSummary {
            path: path.to_owned(),
            source: err,
        })
    })?;
    tracing::info!("Summary written to {}", path);
    Ok(())
}

async fn write_file(path: &str, bytes: &[u8]) -> Result<(), std::io::Error> {
    let file = tokio::fs::File::create(path).await?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
