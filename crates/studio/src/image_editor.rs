//! Image editor view: upload a picture, describe a change, get an edited copy.

use crate::error::InputError;
use anyhow::{Context, Result};
use image::ImageFormat;
use providers::AiGateway;
use shared::media::InlineImage;
use std::fs;
use std::path::{Path, PathBuf};

/// Sniff the MIME type from the file contents; only PNG, JPEG and WEBP pass.
pub fn detect_mime(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes).ok()? {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::WebP => Some("image/webp"),
        _ => None,
    }
}

/// Decode a result `data:` URI and write it out. An extension matching the
/// image type is added when `path` has none.
pub fn save_data_uri(data_uri: &str, path: &Path) -> Result<PathBuf> {
    let image = InlineImage::from_data_uri(data_uri)?;
    let path = if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(image.extension())
    };
    fs::write(&path, &image.bytes).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

#[derive(Debug, Clone)]
pub struct SelectedImage {
    pub path: PathBuf,
    pub image: InlineImage,
}

#[derive(Debug, Default)]
pub struct ImageEditor {
    selected: Option<SelectedImage>,
    prompt: String,
    result: Option<String>,
    error: Option<String>,
}

impl ImageEditor {
    pub fn selected(&self) -> Option<&SelectedImage> {
        self.selected.as_ref()
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// `data:` URI of the last edited image.
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn select_file(&mut self, path: &Path) -> Result<(), InputError> {
        match fs::read(path) {
            Ok(bytes) => self.select_bytes(path, bytes),
            Err(e) => self.reject(InputError::Unreadable(e.to_string())),
        }
    }

    /// A new selection replaces the old one and clears the previous result.
    pub fn select_bytes(&mut self, path: &Path, bytes: Vec<u8>) -> Result<(), InputError> {
        let Some(mime) = detect_mime(&bytes) else {
            return self.reject(InputError::UnsupportedType);
        };
        self.selected = Some(SelectedImage {
            path: path.to_path_buf(),
            image: InlineImage::new(mime, bytes),
        });
        self.result = None;
        self.error = None;
        Ok(())
    }

    pub async fn submit(&mut self, gateway: &AiGateway) -> Result<(), InputError> {
        let image = match self.selected.as_ref() {
            Some(selected) => selected.image.clone(),
            None => return self.reject(InputError::NoFile),
        };
        let prompt = self.prompt.trim().to_string();
        if prompt.is_empty() {
            return self.reject(InputError::EmptyPrompt);
        }

        let reply = gateway.edit_image(&image, &prompt).await;
        self.result = reply.image_url;
        self.error = match (&self.result, reply.error) {
            (_, Some(error)) => Some(error),
            (None, None) => Some(providers::gateway::NO_IMAGE_RETURNED.to_string()),
            (Some(_), None) => None,
        };
        Ok(())
    }

    pub fn save_result(&self, path: &Path) -> Result<PathBuf> {
        let uri = self
            .result
            .as_deref()
            .context("there is no edited image to save yet")?;
        save_data_uri(uri, path)
    }

    fn reject(&mut self, err: InputError) -> Result<(), InputError> {
        self.error = Some(err.to_string());
        Err(err)
    }
}
