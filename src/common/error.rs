use thiserror::Error;

/// Reasons an enrollment request is rejected before any capture starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("First name is required")]
    MissingFirstName,

    #[error("Last name is required")]
    MissingLastName,

    #[error("{field} cannot contain the character '{character}'")]
    ReservedCharacter { field: &'static str, character: char },

    #[error("Age must be a number between 1 and 150, got {0}")]
    AgeOutOfRange(i64),
}

#[derive(Error, Debug)]
pub enum FaceRecError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Need at least {required} samples, got {captured}")]
    InsufficientSamples { captured: usize, required: usize },

    #[error("User not found: {0}")]
    UserNotFound(u32),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, FaceRecError>;
