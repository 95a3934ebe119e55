use std::fmt;

#[derive(Debug, Clone)]
pub enum WachError {
    ConfigError {
        key: String,
        message: String,
    },
    IoError {
        operation: String,
        path: String,
        message: String,
    },
}

impl WachError {
    pub fn io(operation: &str, path: impl ToString, error: impl ToString) -> Self {
        WachError::IoError {
            operation: operation.to_string(),
            path: path.to_string(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for WachError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ConfigError { key, message } => {
                write!(f, "Configuration error for key '{key}': {message}")
            }
            Self::IoError {
                operation,
                path,
                message,
            } => {
                write!(f, "I/O error during '{operation}' on '{path}': {message}")
            }
        }
    }
}

impl std::error::Error for WachError {}

impl From<WachError> for String {
    fn from(error: WachError) -> Self {
        error.to_string()
    }
}
