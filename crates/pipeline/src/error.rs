use data_loader::UserId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecommendError {
    /// The model has no factor vector for this user
    #[error("User {0} is unknown to the model")]
    UnknownUser(UserId),

    #[error("Filter failed: {0}")]
    Filter(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RecommendError>;
