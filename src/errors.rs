use std::error::Error;
use std::fmt;
use std::io;

/// Enumeration of all possible errors raised by the extraction pipeline
#[derive(Debug)]
pub enum ExtractorError {
    /// Malformed or incomplete container data
    ContainerParse(String),
    /// The track carries no usable decoder configuration record
    MissingCodecConfiguration(String),
    /// The container holds no video track
    NoVideoTrack,
    /// The container holds more than one video track
    UnsupportedMultiTrack(usize),
    /// The decode engine refused the codec configuration
    UnsupportedCodecConfiguration(String),
    /// The decode engine reported a fault; the session is over
    DecoderFault(String),
    /// A sample was submitted before the decoder was configured
    NotConfigured,
    /// The session was closed or ended by an earlier fault
    SessionEnded,
    /// A queued request was replaced by a newer seek before it ran
    Superseded,
    Stream(StreamError),
    Io(io::Error),
}

/// Byte source specific errors
#[derive(Debug)]
pub struct StreamError {
    pub message: String,
}

impl StreamError {
    /// Create a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl ExtractorError {
    /// Shorthand for a container parse failure.
    pub fn parse(message: impl Into<String>) -> Self {
        ExtractorError::ContainerParse(message.into())
    }

    /// True for errors after which the session cannot continue.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ExtractorError::Superseded)
    }
}

impl fmt::Display for ExtractorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractorError::ContainerParse(message) => {
                write!(f, "Container parse error: {}", message)
            }
            ExtractorError::MissingCodecConfiguration(message) => {
                write!(f, "Missing codec configuration: {}", message)
            }
            ExtractorError::NoVideoTrack => write!(f, "No video track found"),
            ExtractorError::UnsupportedMultiTrack(count) => {
                write!(f, "Found {} video tracks, only one is supported", count)
            }
            ExtractorError::UnsupportedCodecConfiguration(codec) => {
                write!(f, "Codec configuration for {} is not supported", codec)
            }
            ExtractorError::DecoderFault(message) => write!(f, "Decoder error: {}", message),
            ExtractorError::NotConfigured => {
                write!(f, "Sample submitted before the decoder was configured")
            }
            ExtractorError::SessionEnded => write!(f, "Extraction session has ended"),
            ExtractorError::Superseded => write!(f, "Request superseded by a newer seek"),
            ExtractorError::Stream(err) => write!(f, "Stream error: {}", err),
            ExtractorError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for ExtractorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ExtractorError::Stream(err) => Some(err),
            ExtractorError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl Error for StreamError {}

// Conversion implementations
impl From<io::Error> for ExtractorError {
    fn from(err: io::Error) -> Self {
        ExtractorError::Io(err)
    }
}

impl From<StreamError> for ExtractorError {
    fn from(err: StreamError) -> Self {
        ExtractorError::Stream(err)
    }
}

// Conversion to io::Error for callers working in io::Result
impl From<ExtractorError> for io::Error {
    fn from(err: ExtractorError) -> Self {
        io::Error::other(err)
    }
}

impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        io::Error::other(err)
    }
}

// Type alias for Result with ExtractorError
pub type ExtractorResult<T> = Result<T, ExtractorError>;
