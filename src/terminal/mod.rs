//! Running editors and pagers on the user's terminal.
//!
//! The target program is attached to a fresh pseudo-terminal sized like the
//! real one, while the real terminal is held in raw mode and its bytes are
//! relayed in both directions. [`TerminalSession`] guarantees that raw mode
//! is switched off again however the invocation ends.

mod bridge;
mod error;
mod input;
mod pty;

use std::io::{self, IsTerminal};

use tracing::warn;

pub use bridge::{Bridge, BridgeOptions, run_interactive};
pub use error::BridgeError;
pub use input::{InputSource, StdinSource};
pub use pty::{ExitOutcome, NativePtyLauncher, PtyChannel, PtyLauncher, Subprocess};

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub rows: u16,
    pub cols: u16,
}

/// The controlling terminal, as far as the bridge needs it.
pub trait Terminal {
    fn window_size(&self) -> io::Result<WindowSize>;

    fn is_raw_mode(&self) -> io::Result<bool>;

    fn enable_raw_mode(&self) -> io::Result<()>;

    fn disable_raw_mode(&self) -> io::Result<()>;
}

/// The process's real terminal, driven through crossterm.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrosstermTerminal;

impl Terminal for CrosstermTerminal {
    fn window_size(&self) -> io::Result<WindowSize> {
        if !io::stdin().is_terminal() {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "standard input is not a terminal",
            ));
        }
        let (cols, rows) = crossterm::terminal::size()?;
        Ok(WindowSize { rows, cols })
    }

    /// Reads the line discipline of stdin rather than crossterm's own flag,
    /// so a terminal put in raw mode by someone else is seen as raw.
    fn is_raw_mode(&self) -> io::Result<bool> {
        let mut termios = std::mem::MaybeUninit::<libc::termios>::uninit();
        // SAFETY: `termios` is valid for writes of one termios struct.
        if unsafe { libc::tcgetattr(libc::STDIN_FILENO, termios.as_mut_ptr()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: tcgetattr succeeded and filled the struct.
        let termios = unsafe { termios.assume_init() };
        Ok(is_raw(&termios))
    }

    fn enable_raw_mode(&self) -> io::Result<()> {
        crossterm::terminal::enable_raw_mode()
    }

    fn disable_raw_mode(&self) -> io::Result<()> {
        crossterm::terminal::disable_raw_mode()
    }
}

fn is_raw(termios: &libc::termios) -> bool {
    termios.c_lflag & (libc::ICANON | libc::ECHO) == 0
}

/// Raw-mode hold on a terminal for the duration of one subprocess.
///
/// The window size and the previous mode are captured on acquisition; the
/// previous mode is restored on drop.
#[derive(Debug)]
pub struct TerminalSession<'a, T: Terminal> {
    terminal: &'a T,
    size: WindowSize,
    was_raw: bool,
}

impl<'a, T: Terminal> TerminalSession<'a, T> {
    pub fn acquire(terminal: &'a T) -> Result<Self, BridgeError> {
        let size = terminal.window_size().map_err(BridgeError::TerminalQuery)?;
        let was_raw = terminal.is_raw_mode().map_err(BridgeError::RawMode)?;
        if !was_raw {
            terminal.enable_raw_mode().map_err(BridgeError::RawMode)?;
        }

        Ok(Self {
            terminal,
            size,
            was_raw,
        })
    }

    pub fn size(&self) -> WindowSize {
        self.size
    }
}

impl<T: Terminal> Drop for TerminalSession<'_, T> {
    fn drop(&mut self) {
        if self.was_raw {
            return;
        }
        if let Err(err) = self.terminal.disable_raw_mode() {
            warn!(error = %err, "failed to restore terminal mode");
        }
    }
}
