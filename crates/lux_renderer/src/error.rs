use thiserror::Error;

/// Reasons a render could not start.
///
/// Cancellation is not an error; see `RenderStatus::Cancelled`.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("No camera set in the scene. Cannot render frame.")]
    NotReady,

    #[error("Failed to build render thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

pub type RenderResult<T> = Result<T, RenderError>;
