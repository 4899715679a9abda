use std::{
    fmt, io,
    path::PathBuf,
};


/// Failure modes of the compression core.
///
/// InputTooLarge and Corrupt describe unusable input; Internal means a
/// self-check tripped and indicates a bug rather than anything the
/// caller did.
#[derive(Debug)]
pub enum CodecError {
    /// Payload bit length doesn't fit the 24 bit container field, or
    /// the model list doesn't fit in 8 bits.
    InputTooLarge(u64),
    /// Compressed container is inconsistent with itself.
    Corrupt(String),
    /// A self-check failed.
    Internal(String),
}
impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::InputTooLarge(bits) => {
                write!(f, "input too large: {bits} bits")
            }
            CodecError::Corrupt(msg) => {
                write!(f, "corrupt data: {msg}")
            }
            CodecError::Internal(msg) => {
                write!(f, "internal error: {msg}")
            }
        }
    }
}
impl From<io::Error> for CodecError {
    fn from(err: io::Error) -> CodecError {
        CodecError::Corrupt(err.to_string())
    }
}


/// Errors from file-level compression or extraction.
#[derive(Debug)]
pub enum PackError {
    FileExists(PathBuf),
    Io(io::Error),
    Codec(CodecError),
}
impl fmt::Display for PackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackError::FileExists(path) => {
                write!(f, "A file at location {} already exists.\n\
                    To overwrite existing files, enable file clobbering via '-clobber'.",
                    path.display()
                )
            }
            PackError::Io(err) => {
                write!(f, "{err}")
            }
            PackError::Codec(err) => {
                write!(f, "{err}")
            }
        }
    }
}
impl From<io::Error> for PackError {
    fn from(err: io::Error) -> PackError {
        PackError::Io(err)
    }
}
impl From<CodecError> for PackError {
    fn from(err: CodecError) -> PackError {
        PackError::Codec(err)
    }
}


/// Errors from command line parsing.
#[derive(Debug)]
pub enum ConfigError {
    InvalidMode(String),
    InvalidThreadCount(String),
    InvalidInput(PathBuf),
    NoInput,
}
impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidMode(mode) => {
                write!(f, "{mode} is not a valid mode.")
            }
            ConfigError::InvalidThreadCount(count) => {
                write!(f, "{count} is not a valid thread count.")
            }
            ConfigError::InvalidInput(path) => {
                write!(f, "{} is not a valid input.", path.display())
            }
            ConfigError::NoInput => {
                write!(f, "No input file specified.")
            }
        }
    }
}
