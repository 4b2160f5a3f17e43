//! HD image generator view: prompt plus aspect ratio in, one image out.

use crate::error::InputError;
use crate::image_editor::save_data_uri;
use anyhow::{Context, Result};
use providers::AiGateway;
use shared::media::{AspectRatio, MediaError};
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct ImageGenerator {
    prompt: String,
    aspect_ratio: AspectRatio,
    result: Option<String>,
    error: Option<String>,
}

impl ImageGenerator {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn set_aspect_ratio(&mut self, ratio: &str) -> Result<(), MediaError> {
        self.aspect_ratio = ratio.parse()?;
        Ok(())
    }

    pub async fn submit(&mut self, gateway: &AiGateway) -> Result<(), InputError> {
        let prompt = self.prompt.trim().to_string();
        if prompt.is_empty() {
            let err = InputError::EmptyPrompt;
            self.error = Some(err.to_string());
            return Err(err);
        }

        let reply = gateway.generate_image(&prompt, self.aspect_ratio).await;
        self.error = match (&reply.image_url, reply.error) {
            (_, Some(error)) => Some(error),
            (None, None) => Some(providers::gateway::NO_IMAGE_RETURNED.to_string()),
            (Some(_), None) => None,
        };
        self.result = reply.image_url;
        Ok(())
    }

    pub fn save_result(&self, path: &Path) -> Result<PathBuf> {
        let uri = self
            .result
            .as_deref()
            .context("there is no generated image to save yet")?;
        save_data_uri(uri, path)
    }
}
