use serde::Serialize;
use std::fmt;

/// Coarse classification shared by every error type in the workspace.
///
/// Protocol errors are caller mistakes on the gateway wire and are never
/// retried. Application errors abort the current conversation turn.
/// Transport errors mean a remote endpoint could not be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    Protocol,
    Application,
    Transport,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorClass::Protocol => "protocol",
            ErrorClass::Application => "application",
            ErrorClass::Transport => "transport",
        };
        f.write_str(label)
    }
}

/// Implemented by error enums that can report their [`ErrorClass`].
pub trait Classify {
    fn class(&self) -> ErrorClass;
}
