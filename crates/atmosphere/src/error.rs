use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("sprite name '{name}' is already registered")]
    SpriteNameTaken { name: String },
    #[error("sprite '{name}' has zero area")]
    EmptySprite { name: String },
}
