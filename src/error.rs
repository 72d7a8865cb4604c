use thiserror::Error;

pub type Result<T> = std::result::Result<T, RenderError>;

/// The single rendering error. Each variant names the situation that
/// invalidated the session; none of them is recoverable, the caller is
/// expected to close the context with `discard = true`.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("backend surface failure: {0}")]
    Surface(String),
    #[error("cannot stroke or fill an empty path")]
    EmptyPath,
    #[error("cannot create font {family:?} (size {size}, bold {bold}): {reason}")]
    Font {
        family: String,
        size: f64,
        bold: bool,
        reason: String,
    },
    #[error("no paint source is set")]
    NoPaintSource,
    #[error("transform stack is empty")]
    TransformStackEmpty,
    #[error("render context is not initialized")]
    NotInitialized,
    #[error("render context is already initialized")]
    AlreadyInitialized,
    #[error("render context is closed")]
    Closed,
    #[error("no output sink is set")]
    NoOutput,
    #[error("backend does not support {0}")]
    Unsupported(&'static str),
    #[error("output sink failure")]
    Io(#[from] std::io::Error),
    #[error("backend error")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "cairo")]
impl From<cairo::Error> for RenderError {
    fn from(err: cairo::Error) -> Self {
        RenderError::Backend(Box::new(err))
    }
}

#[cfg(feature = "cairo")]
impl From<png::EncodingError> for RenderError {
    fn from(err: png::EncodingError) -> Self {
        RenderError::Backend(Box::new(err))
    }
}

#[cfg(feature = "svg")]
impl From<quick_xml::Error> for RenderError {
    fn from(err: quick_xml::Error) -> Self {
        RenderError::Backend(Box::new(err))
    }
}
