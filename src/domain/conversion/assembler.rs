use super::error::ConversionError;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// How the final audio file was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyOutcome {
    /// No artifacts; an empty output file was written
    Empty,
    SingleCopy,
    Concatenated { parts: usize },
    /// Concatenation failed, the first usable artifact was copied instead
    FallbackCopy,
    /// Concatenation failed and no artifact was usable
    FallbackEmpty,
}

/// Join per-chunk artifacts, in order, into `output`.
///
/// Known limitation: parts are joined byte for byte, not re-encoded or
/// remuxed. The result is not a well-formed single MP3 stream. Each part's
/// ID3 tags and encoder headers stay in the middle of the file, and the
/// declared duration or seek tables only describe the first part. Most
/// players tolerate this, but nothing guarantees it.
///
/// Never fails: when joining breaks, the first non-empty readable artifact
/// is copied to `output`, or an empty file is written if there is none.
pub async fn assemble(artifacts: &[PathBuf], output: &Path) -> AssemblyOutcome {
    match try_assemble(artifacts, output).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(
                output = %output.display(),
                parts = artifacts.len(),
                error = %e,
                "Audio assembly failed, falling back to first usable artifact"
            );
            fallback(artifacts, output).await
        }
    }
}

async fn try_assemble(artifacts: &[PathBuf], output: &Path) -> Result<AssemblyOutcome, ConversionError> {
    match artifacts {
        [] => {
            write_output(output, &[]).await?;
            Ok(AssemblyOutcome::Empty)
        }
        [single] => {
            tokio::fs::copy(single, output)
                .await
                .map_err(|e| assembly_failure(single, e))?;
            Ok(AssemblyOutcome::SingleCopy)
        }
        parts => {
            let mut file = tokio::fs::File::create(output)
                .await
                .map_err(|e| assembly_failure(output, e))?;
            for part in parts {
                let bytes = tokio::fs::read(part)
                    .await
                    .map_err(|e| assembly_failure(part, e))?;
                file.write_all(&bytes)
                    .await
                    .map_err(|e| assembly_failure(output, e))?;
            }
            file.flush().await.map_err(|e| assembly_failure(output, e))?;
            Ok(AssemblyOutcome::Concatenated { parts: parts.len() })
        }
    }
}

async fn fallback(artifacts: &[PathBuf], output: &Path) -> AssemblyOutcome {
    for artifact in artifacts {
        let usable = matches!(tokio::fs::metadata(artifact).await, Ok(meta) if meta.len() > 0);
        if !usable {
            continue;
        }
        if tokio::fs::copy(artifact, output).await.is_ok() {
            return AssemblyOutcome::FallbackCopy;
        }
    }

    if let Err(e) = write_output(output, &[]).await {
        tracing::error!(output = %output.display(), error = %e, "Failed to write empty audio output");
    }
    AssemblyOutcome::FallbackEmpty
}

async fn write_output(output: &Path, bytes: &[u8]) -> Result<(), ConversionError> {
    tokio::fs::write(output, bytes)
        .await
        .map_err(|e| assembly_failure(output, e))
}

fn assembly_failure(path: &Path, err: std::io::Error) -> ConversionError {
    ConversionError::AssemblyFailure(format!("{}: {}", path.display(), err))
}
