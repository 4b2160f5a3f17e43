/// Rejections from the session controller
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("Still waiting for the previous reply")]
    Busy,

    #[error("No message is waiting for a reply")]
    NotSending,
}

/// Form validation failures, caught before any remote call.
///
/// The display strings are shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("Please upload an image first.")]
    NoFile,

    #[error("Unsupported file type. Please upload a PNG, JPEG or WEBP image.")]
    UnsupportedType,

    #[error("Couldn't read that file: {0}")]
    Unreadable(String),

    #[error("Please enter a prompt first.")]
    EmptyPrompt,
}
