use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Expr(#[from] ExprError),
}

/// Errors raised by the boolean expression evaluator.
#[derive(Debug, Error)]
pub enum ExprError {
    #[error("parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("unknown identifier: {name}")]
    UnknownIdentifier { name: String },

    #[error("cannot evaluate: {message}")]
    Eval { message: String },
}

pub type Result<T> = std::result::Result<T, ModelError>;
