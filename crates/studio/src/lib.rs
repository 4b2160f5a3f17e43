//! Persona Studio core: chat session, feature views and persistence.

pub mod context;
pub mod error;
pub mod image_editor;
pub mod image_generator;
pub mod preferences;
pub mod session;
pub mod settings;
pub mod slideshow;

pub use context::{AppContext, Navigation, View};
pub use error::{InputError, SessionError};
pub use preferences::PreferenceStore;
pub use session::{SessionController, SessionState};
