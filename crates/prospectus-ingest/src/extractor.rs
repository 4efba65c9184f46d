//! PDF-to-markdown extractor adapter.
//!
//! The extractor is an external CLI-style subprocess taking input and
//! output paths. Its stdout/stderr are opaque; a non-zero exit is a fatal
//! ingestion error. The core never parses PDFs itself.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use prospectus_core::cancel::CancelContext;
use prospectus_core::error::{Error, Result};

/// Subprocess adapter for the external PDF extractor.
#[derive(Debug, Clone)]
pub struct PdfExtractor {
    command: String,
}

impl PdfExtractor {
    /// An adapter invoking `command <input> <output>`.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Extract `input` into markdown at `output`.
    pub fn extract(&self, input: &Path, output: &Path, cancel: &CancelContext) -> Result<()> {
        cancel.check("pdf extraction")?;
        debug!(command = %self.command, input = %input.display(), "running pdf extractor");
        let result = Command::new(&self.command)
            .arg(input)
            .arg(output)
            .output()
            .map_err(|e| Error::Extraction(format!("failed to spawn {}: {e}", self.command)))?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let snippet: String = stderr.chars().take(200).collect();
            return Err(Error::Extraction(format!(
                "{} exited with {}: {snippet}",
                self.command, result.status
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_an_extraction_error() {
        let extractor = PdfExtractor::new("definitely-not-a-real-extractor");
        let err = extractor
            .extract(
                Path::new("in.pdf"),
                Path::new("out.md"),
                &CancelContext::none(),
            )
            .unwrap_err();
        assert_eq!(err.error_type(), "EXTRACTION");
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_fatal() {
        let extractor = PdfExtractor::new("false");
        let err = extractor
            .extract(
                Path::new("in.pdf"),
                Path::new("out.md"),
                &CancelContext::none(),
            )
            .unwrap_err();
        assert_eq!(err.error_type(), "EXTRACTION");
    }

    #[cfg(unix)]
    #[test]
    fn zero_exit_succeeds() {
        let extractor = PdfExtractor::new("true");
        assert!(extractor
            .extract(
                Path::new("in.pdf"),
                Path::new("out.md"),
                &CancelContext::none()
            )
            .is_ok());
    }
}
