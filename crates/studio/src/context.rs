//! Application context and navigation.
//!
//! Settings, the shared gateway and the active view travel together in one
//! [`AppContext`] handed to the front end, instead of living in globals.

use anyhow::Result;
use providers::{AiGateway, CredentialReselector, GeminiClient};
use shared::settings::AppSettings;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Chat,
    ImageEditor,
    Slideshow,
    ImageGenerator,
}

impl View {
    pub const ALL: [View; 4] = [
        View::Chat,
        View::ImageEditor,
        View::Slideshow,
        View::ImageGenerator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Chat => "chat",
            View::ImageEditor => "edit",
            View::Slideshow => "slides",
            View::ImageGenerator => "imagine",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            View::Chat => "Chat",
            View::ImageEditor => "Image Editor",
            View::Slideshow => "Slideshow",
            View::ImageGenerator => "HD Image Generator",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_start_matches('/');
        View::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown view: {}", s))
    }
}

/// Which view is on screen.
#[derive(Debug, Default)]
pub struct Navigation {
    active: View,
}

impl Navigation {
    pub fn active(&self) -> View {
        self.active
    }

    /// Returns true when the view actually changed.
    pub fn navigate(&mut self, view: View) -> bool {
        let changed = self.active != view;
        self.active = view;
        changed
    }
}

pub struct AppContext {
    pub settings: AppSettings,
    pub gateway: Arc<AiGateway>,
    pub navigation: Navigation,
    reselector: Arc<dyn CredentialReselector>,
}

impl AppContext {
    pub fn new(settings: AppSettings, reselector: Arc<dyn CredentialReselector>) -> Result<Self> {
        let gateway = build_gateway(&settings, reselector.clone())?;
        Ok(Self {
            settings,
            gateway,
            navigation: Navigation::default(),
            reselector,
        })
    }

    /// Swap in a gateway built from the current settings (e.g. after a key change).
    pub fn rebuild_gateway(&mut self) -> Result<()> {
        self.gateway = build_gateway(&self.settings, self.reselector.clone())?;
        Ok(())
    }
}

fn build_gateway(
    settings: &AppSettings,
    reselector: Arc<dyn CredentialReselector>,
) -> Result<Arc<AiGateway>> {
    let client = GeminiClient::new(settings.gemini.clone())?;
    Ok(Arc::new(AiGateway::new(Arc::new(client), reselector)))
}
