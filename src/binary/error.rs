use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unsupported binary format (leading bytes: {magic})")]
    UnsupportedFormat { magic: String },

    #[error("Corrupt {format} binary: {reason}")]
    CorruptBinary { format: String, reason: String },

    #[error("File unreadable: {reason}")]
    FileUnreadable { reason: String },
}

impl ParseError {
    pub fn unsupported(data: &[u8]) -> Self {
        let magic = if data.is_empty() {
            "<empty file>".to_string()
        } else {
            data.iter()
                .take(4)
                .map(|b| format!("{b:02x}"))
                .collect::<Vec<_>>()
                .join(" ")
        };
        ParseError::UnsupportedFormat { magic }
    }

    pub fn corrupt(format: &str, reason: impl Into<String>) -> Self {
        ParseError::CorruptBinary {
            format: format.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for ParseError {
    fn from(err: std::io::Error) -> Self {
        ParseError::FileUnreadable {
            reason: err.to_string(),
        }
    }
}
