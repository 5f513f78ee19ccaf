use std::{
    any::Any,
    io::{self, Read, Write},
};

use portable_pty::{CommandBuilder, PtySize, native_pty_system};

use super::WindowSize;

/// How a subprocess ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    pub success: bool,
    pub code: u32,
}

pub trait Subprocess {
    /// Blocks until the process exits.
    fn wait(&mut self) -> io::Result<ExitOutcome>;
}

/// Both ends of a pseudo-terminal as seen from the parent, plus the process
/// running on it. Dropping the channel closes the pseudo-terminal.
pub struct PtyChannel {
    pub reader: Box<dyn Read + Send>,
    pub writer: Box<dyn Write + Send>,
    pub child: Box<dyn Subprocess>,
    master: Option<Box<dyn Any + Send>>,
}

impl PtyChannel {
    pub fn new(
        reader: Box<dyn Read + Send>,
        writer: Box<dyn Write + Send>,
        child: Box<dyn Subprocess>,
    ) -> Self {
        Self {
            reader,
            writer,
            child,
            master: None,
        }
    }

    /// Keeps `master` open for as long as the channel lives.
    pub fn with_master(mut self, master: Box<dyn Any + Send>) -> Self {
        self.master = Some(master);
        self
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        Box<dyn Read + Send>,
        Box<dyn Write + Send>,
        Box<dyn Subprocess>,
        Option<Box<dyn Any + Send>>,
    ) {
        (self.reader, self.writer, self.child, self.master)
    }
}

impl std::fmt::Debug for PtyChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyChannel")
            .field("master", &self.master.is_some())
            .finish_non_exhaustive()
    }
}

/// Starts programs on pseudo-terminals.
pub trait PtyLauncher {
    /// Opens a pseudo-terminal of `size` and starts `program` on it. The size
    /// is in effect before the program runs.
    fn launch(&self, program: &str, args: &[String], size: WindowSize) -> io::Result<PtyChannel>;
}

/// The platform's native pseudo-terminals, via portable-pty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativePtyLauncher;

impl From<WindowSize> for PtySize {
    fn from(size: WindowSize) -> Self {
        PtySize {
            rows: size.rows.max(1),
            cols: size.cols.max(1),
            pixel_width: 0,
            pixel_height: 0,
        }
    }
}

impl PtyLauncher for NativePtyLauncher {
    fn launch(&self, program: &str, args: &[String], size: WindowSize) -> io::Result<PtyChannel> {
        let pair = native_pty_system()
            .openpty(size.into())
            .map_err(io::Error::other)?;

        let mut cmd = CommandBuilder::new(program);
        cmd.args(args);
        cmd.cwd(std::env::current_dir()?);

        let child = pair.slave.spawn_command(cmd).map_err(io::Error::other)?;
        // The child keeps its own handle on the slave; ours would stop the
        // reader from seeing end-of-stream after the child exits.
        drop(pair.slave);

        let reader = pair.master.try_clone_reader().map_err(io::Error::other)?;
        let writer = pair.master.take_writer().map_err(io::Error::other)?;

        Ok(
            PtyChannel::new(reader, writer, Box::new(PtyChild(child)))
                .with_master(Box::new(pair.master)),
        )
    }
}

struct PtyChild(Box<dyn portable_pty::Child + Send + Sync>);

impl Subprocess for PtyChild {
    fn wait(&mut self) -> io::Result<ExitOutcome> {
        let status = self.0.wait()?;
        Ok(ExitOutcome {
            success: status.success(),
            code: status.exit_code(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn drain(mut reader: Box<dyn Read + Send>) -> Vec<u8> {
        let mut output = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => output.extend_from_slice(&buf[..n]),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                // Linux reports EIO once the slave side is gone.
                Err(_) => break,
            }
        }
        output
    }

    #[test]
    fn test_native_pty_size_and_exit_code() {
        let size = WindowSize { rows: 17, cols: 91 };
        let args = ["-c".to_string(), "stty size; exit 3".to_string()];
        let channel = NativePtyLauncher.launch("sh", &args, size).unwrap();
        let (reader, writer, mut child, master) = channel.into_parts();

        let output = drain(reader);
        let outcome = child.wait().unwrap();
        drop(writer);
        drop(master);

        let output = String::from_utf8_lossy(&output);
        assert!(output.contains("17 91\r\n"), "unexpected output: {output:?}");
        assert_eq!(outcome, ExitOutcome { success: false, code: 3 });
    }

    #[test]
    fn test_native_pty_missing_program() {
        let size = WindowSize { rows: 24, cols: 80 };
        let result = NativePtyLauncher.launch("barb-no-such-program", &[], size);
        assert!(result.is_err());
    }
}
