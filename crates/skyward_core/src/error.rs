use std::error::Error;
use std::fmt;
use std::io;

/// Why a container conversion was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFault {
    MissingKey,
    BadHeader,
    BadDigest,
    UnknownRegion,
}

impl ContainerFault {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::MissingKey => "key material is not loaded",
            Self::BadHeader => "container header is malformed",
            Self::BadDigest => "container digest does not match payload",
            Self::UnknownRegion => "decrypted payload is not a known save layout",
        }
    }
}

impl fmt::Display for ContainerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error for ContainerFault {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorCode {
    File(io::ErrorKind),
    Format,
    Decode(ContainerFault),
    Encode(ContainerFault),
    InvalidValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreError {
    pub code: CoreErrorCode,
    pub message: String,
}

impl CoreError {
    pub fn new(code: CoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn file(err: &io::Error, context: impl fmt::Display) -> Self {
        Self::new(CoreErrorCode::File(err.kind()), format!("{context}: {err}"))
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::new(CoreErrorCode::Format, message)
    }

    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::new(CoreErrorCode::InvalidValue, message)
    }

    pub fn decode(fault: ContainerFault) -> Self {
        Self::new(CoreErrorCode::Decode(fault), fault.as_str())
    }

    pub fn encode(fault: ContainerFault) -> Self {
        Self::new(CoreErrorCode::Encode(fault), fault.as_str())
    }

    /// The container fault behind a decode or encode failure, if any.
    pub fn container_fault(&self) -> Option<ContainerFault> {
        match self.code {
            CoreErrorCode::Decode(fault) | CoreErrorCode::Encode(fault) => Some(fault),
            _ => None,
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            CoreErrorCode::File(kind) => write!(f, "File({kind:?}): {}", self.message),
            code => write!(f, "{code:?}: {}", self.message),
        }
    }
}

impl Error for CoreError {}
