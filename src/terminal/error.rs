use std::io;

use thiserror::Error;

/// Failures of an interactive subprocess invocation.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("cannot query terminal window size")]
    TerminalQuery(#[source] io::Error),

    #[error("cannot switch terminal to raw mode")]
    RawMode(#[source] io::Error),

    #[error("failed to start '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed waiting for '{program}'")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' exited with status {code}")]
    Subprocess { program: String, code: u32 },
}
