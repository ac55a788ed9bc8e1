use std::error::Error;
use std::fmt;

/// Crate error type for decoding and encoding geometries.
#[derive(Debug)]
pub enum WkError {
    /// A WKB read would have gone past the end of the feature's bytes.
    TruncatedInput {
        offset: usize,
        needed: usize,
        len: usize,
    },
    /// WKT text does not follow the grammar.
    MalformedText { message: String, position: usize },
    /// Unknown WKB type code, byte order marker, or inconsistent dimension flags.
    UnsupportedEncoding(String),
    /// The interrupt hook reported an interruption.
    Cancelled { feature_id: usize },
    /// Rectangle columns do not have the same length.
    MismatchedLength { expected: usize, got: usize },
    /// A writer received more features than its exporter can hold.
    ExporterExhausted { n_features: usize },
    /// Wraps a decode error with the index of the feature being decoded.
    Feature {
        feature_id: usize,
        source: Box<WkError>,
    },
    /// Wraps errors returned by `rusqlite`.
    Sql(rusqlite::Error),
    /// Wraps errors returned by an output sink.
    Io(std::io::Error),
    /// Wraps errors returned while formatting text.
    Fmt(fmt::Error),
}

impl WkError {
    pub(crate) fn malformed<S: Into<String>>(message: S, position: usize) -> Self {
        Self::MalformedText {
            message: message.into(),
            position,
        }
    }

    /// Attach the feature index to a decode error.
    pub(crate) fn in_feature(self, feature_id: usize) -> Self {
        match self {
            Self::Feature { .. } | Self::Cancelled { .. } => self,
            other => Self::Feature {
                feature_id,
                source: Box::new(other),
            },
        }
    }

    /// Return the underlying error, looking through `Feature` wrappers.
    pub fn kind(&self) -> &WkError {
        match self {
            Self::Feature { source, .. } => source.kind(),
            other => other,
        }
    }

    /// Return the index of the feature the error happened in, if known.
    pub fn feature_id(&self) -> Option<usize> {
        match self {
            Self::Feature { feature_id, .. } | Self::Cancelled { feature_id } => Some(*feature_id),
            _ => None,
        }
    }
}

impl fmt::Display for WkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TruncatedInput {
                offset,
                needed,
                len,
            } => write!(
                f,
                "truncated input: need {needed} bytes at offset {offset}, but the buffer has {len} bytes"
            ),
            Self::MalformedText { message, position } => {
                write!(f, "malformed WKT at position {position}: {message}")
            }
            Self::UnsupportedEncoding(msg) => write!(f, "unsupported encoding: {msg}"),
            Self::Cancelled { feature_id } => write!(f, "cancelled at feature {feature_id}"),
            Self::MismatchedLength { expected, got } => {
                write!(f, "mismatched length: expected {expected}, got {got}")
            }
            Self::ExporterExhausted { n_features } => {
                write!(f, "exporter holds only {n_features} features")
            }
            Self::Feature { feature_id, source } => write!(f, "feature {feature_id}: {source}"),
            Self::Sql(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::Fmt(err) => write!(f, "{err}"),
        }
    }
}

impl Error for WkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Feature { source, .. } => Some(source.as_ref()),
            Self::Sql(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Fmt(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for WkError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Sql(err)
    }
}

impl From<std::io::Error> for WkError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<fmt::Error> for WkError {
    fn from(err: fmt::Error) -> Self {
        Self::Fmt(err)
    }
}

pub type Result<T> = std::result::Result<T, WkError>;

#[cfg(test)]
mod tests {
    use super::WkError;

    #[test]
    fn feature_wrapper_keeps_kind() {
        let err = WkError::malformed("unknown geometry type", 3).in_feature(7);
        assert_eq!(err.feature_id(), Some(7));
        assert!(matches!(
            err.kind(),
            WkError::MalformedText { position: 3, .. }
        ));
        assert_eq!(
            err.to_string(),
            "feature 7: malformed WKT at position 3: unknown geometry type"
        );
    }

    #[test]
    fn feature_wrapper_is_not_nested_twice() {
        let err = WkError::UnsupportedEncoding("x".to_string())
            .in_feature(1)
            .in_feature(2);
        assert_eq!(err.feature_id(), Some(1));
    }
}
