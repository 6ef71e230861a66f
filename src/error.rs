use std::error::Error;
use std::fmt;

use crate::generator::GenerateError;

#[derive(Debug)]
pub enum AppError {
    Io(std::io::Error),
    Db(sea_orm::DbErr),
    Json(serde_json::Error),
    Generate(GenerateError),
    NotFound(String),
    InvalidInput(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Io(err) => write!(f, "io error: {err}"),
            AppError::Db(err) => write!(f, "database error: {err}"),
            AppError::Json(err) => write!(f, "json error: {err}"),
            AppError::Generate(err) => write!(f, "Cannot generate combo: {err}"),
            AppError::NotFound(message) => write_multiline(f, "Not found", message),
            AppError::InvalidInput(message) => write_multiline(f, "Invalid input", message),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Io(err) => Some(err),
            AppError::Db(err) => Some(err),
            AppError::Json(err) => Some(err),
            AppError::Generate(err) => Some(err),
            AppError::NotFound(_) | AppError::InvalidInput(_) => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(value: sea_orm::DbErr) -> Self {
        Self::Db(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<GenerateError> for AppError {
    fn from(value: GenerateError) -> Self {
        Self::Generate(value)
    }
}

fn write_multiline(f: &mut fmt::Formatter<'_>, label: &str, message: &str) -> fmt::Result {
    if message.contains('\n') {
        write!(f, "{label}:\n{message}")
    } else {
        write!(f, "{label}: {message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiline_messages_start_on_next_line() {
        let err = AppError::InvalidInput("tag names already exist:\n- Power\n- Flow".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid input:\ntag names already exist:\n- Power\n- Flow"
        );
    }

    #[test]
    fn generator_errors_keep_their_source() {
        let err: AppError = GenerateError::EmptyPool.into();
        assert_eq!(
            err.to_string(),
            "Cannot generate combo: no moves match the selected tags"
        );
        let source = err.source().expect("source");
        assert_eq!(source.to_string(), "no moves match the selected tags");
    }
}
