//! Errors raised while executing a conversion path.
//!
//! A `ConversionError` always describes one step: the handler performing it
//! and the formats on either side. The traverser turns the last one it saw
//! into an `AppError` once every alternative path is exhausted.

use convgraph_core::error::{AppError, ErrorKind};
use convgraph_core::traits::handler::HandlerError;
use thiserror::Error;

/// A single failed step, or a failed handler initialization.
#[derive(Debug, Clone, Error)]
pub enum ConversionError {
    /// No handler with this name is registered.
    #[error("Handler '{handler}' is not registered")]
    HandlerNotFound {
        /// Handler name taken from the path.
        handler: String,
    },

    /// `Handler::init` returned an error.
    #[error("Handler '{handler}' failed to initialize: {reason}")]
    InitFailed {
        /// Handler name.
        handler: String,
        /// Reported cause.
        reason: String,
    },

    /// `Handler::init` did not finish in time.
    #[error("Handler '{handler}' did not initialize within {seconds}s")]
    InitTimeout {
        /// Handler name.
        handler: String,
        /// Configured limit.
        seconds: u64,
    },

    /// `Handler::convert` returned an error.
    #[error("Handler '{handler}' failed converting {from} → {to}: {source}")]
    StepFailed {
        /// Handler name.
        handler: String,
        /// Input format id.
        from: String,
        /// Output format id.
        to: String,
        /// Handler-reported cause.
        #[source]
        source: HandlerError,
    },

    /// `Handler::convert` did not finish in time.
    #[error("Handler '{handler}' timed out converting {from} → {to} after {seconds}s")]
    StepTimeout {
        /// Handler name.
        handler: String,
        /// Input format id.
        from: String,
        /// Output format id.
        to: String,
        /// Configured limit.
        seconds: u64,
    },

    /// The handler reported success but produced nothing usable.
    #[error("Handler '{handler}' produced malformed output for {from} → {to}: {reason}")]
    MalformedOutput {
        /// Handler name.
        handler: String,
        /// Input format id.
        from: String,
        /// Output format id.
        to: String,
        /// What was wrong with the output.
        reason: String,
    },

    /// The run was cancelled.
    #[error("Conversion was cancelled")]
    Cancelled,
}

impl ConversionError {
    /// Whether this error ends the whole run rather than just one path.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether the handler itself is unusable, as opposed to one conversion.
    pub fn is_handler_failure(&self) -> bool {
        matches!(
            self,
            Self::HandlerNotFound { .. } | Self::InitFailed { .. } | Self::InitTimeout { .. }
        )
    }
}

impl From<ConversionError> for AppError {
    fn from(err: ConversionError) -> Self {
        let kind = match &err {
            ConversionError::Cancelled => ErrorKind::Cancelled,
            ConversionError::HandlerNotFound { .. } => ErrorKind::NotFound,
            ConversionError::InitFailed { .. } | ConversionError::InitTimeout { .. } => {
                ErrorKind::Handler
            }
            _ => ErrorKind::Conversion,
        };
        AppError::with_source(kind, err.to_string(), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_error_names_handler_and_formats() {
        let err = ConversionError::StepFailed {
            handler: "raster".into(),
            from: "png".into(),
            to: "jpeg".into(),
            source: HandlerError::Encode("quality out of range".into()),
        };
        let message = err.to_string();
        assert!(message.contains("raster"));
        assert!(message.contains("png → jpeg"));
        assert!(!err.is_handler_failure());
    }

    #[test]
    fn test_app_error_kinds() {
        let cancelled: AppError = ConversionError::Cancelled.into();
        assert_eq!(cancelled.kind, ErrorKind::Cancelled);

        let init: AppError = ConversionError::InitTimeout {
            handler: "slow".into(),
            seconds: 5,
        }
        .into();
        assert_eq!(init.kind, ErrorKind::Handler);
        assert!(init.source.is_some());
    }
}
