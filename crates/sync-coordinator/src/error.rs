use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("sync coordinator has stopped")]
    Stopped,
}

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
