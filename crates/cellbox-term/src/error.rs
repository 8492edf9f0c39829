// SPDX-License-Identifier: MIT
//
// Error type for every fallible session operation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the terminal subsystem.
#[derive(Debug, Error)]
pub enum Error {
    /// The terminal device could not be opened.
    #[error("failed to open terminal device {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A termios or descriptor-control call failed.
    #[error("{op} failed: {source}")]
    Termios {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// SIGWINCH / SIGIO delivery could not be set up.
    #[error("failed to register signal handlers: {0}")]
    Signal(#[source] io::Error),

    /// Neither `$TERM` nor the configuration names a terminal type.
    #[error("TERM environment variable not set")]
    TermNotSet,

    /// The operation needs a session that has been initialized.
    #[error("session is not initialized")]
    NotInitialized,

    /// `init` was called on a live session.
    #[error("session is already initialized")]
    AlreadyInitialized,

    /// The other end of an internal channel is gone.
    #[error("event pipeline disconnected")]
    Disconnected,

    /// Reading the input descriptor failed.
    #[error("failed to read terminal input: {0}")]
    Read(#[source] io::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    /// The configuration file is not valid TOML for [`Config`](crate::config::Config).
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn termios(op: &'static str) -> Self {
        Self::Termios {
            op,
            source: io::Error::last_os_error(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_error_names_the_path() {
        let err = Error::Open {
            path: PathBuf::from("/dev/tty"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(err.to_string().starts_with("failed to open terminal device /dev/tty"));
    }

    #[test]
    fn termios_error_names_the_operation() {
        let err = Error::Termios {
            op: "tcgetattr",
            source: io::Error::from(io::ErrorKind::Other),
        };
        assert!(err.to_string().starts_with("tcgetattr failed"));
    }

    #[test]
    fn io_errors_convert() {
        fn fails() -> Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))?;
            Ok(())
        }
        assert!(matches!(fails(), Err(Error::Io(_))));
    }
}
