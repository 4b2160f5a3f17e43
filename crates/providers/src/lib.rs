pub mod error;
pub mod gateway;
pub mod gemini;
pub mod persona;
pub mod sse;

pub use error::ProviderError;
pub use gateway::{AiGateway, CredentialReselector, GenerativeBackend};
pub use gemini::GeminiClient;
