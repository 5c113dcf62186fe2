//! Local file payloads handed to the service

use std::path::Path;

use crate::error::{Error, Result};

/// A file held by the caller, ready to be submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    name: String,
    content: Vec<u8>,
    mime_type: String,
}

impl LocalFile {
    /// Create a file from memory. The name must be non-empty.
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidFile("file name is empty".to_string()));
        }
        let mime_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self {
            name,
            content,
            mime_type,
        })
    }

    /// Read a file from disk; the submitted name is the final path component
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::InvalidFile(format!("no file name in {}", path.display())))?
            .to_string();

        let content = tokio::fs::read(path)
            .await
            .map_err(|e| Error::Io(format!("{}: {}", path.display(), e)))?;

        tracing::debug!(file_name = %name, size = content.len(), "Loaded local file");

        Self::new(name, content)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}
