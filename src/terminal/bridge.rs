use std::{
    io::{self, Read, Write},
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::{
    BridgeError, CrosstermTerminal, InputSource, NativePtyLauncher, PtyLauncher, StdinSource,
    Terminal, TerminalSession,
};

const RELAY_BUFFER_SIZE: usize = 8192;

/// Timing knobs for the byte relays.
#[derive(Debug, Clone, Copy)]
pub struct BridgeOptions {
    /// How long to wait for the relays to wind down after the subprocess
    /// exits. Relays still running after this are detached.
    pub relay_grace: Duration,
    /// Granularity at which the input relay checks for cancellation.
    pub input_poll: Duration,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            relay_grace: Duration::from_millis(500),
            input_poll: Duration::from_millis(50),
        }
    }
}

/// Runs programs interactively on a terminal through a pseudo-terminal.
#[derive(Debug)]
pub struct Bridge<T, L> {
    terminal: T,
    launcher: L,
    options: BridgeOptions,
}

impl<T: Terminal, L: PtyLauncher> Bridge<T, L> {
    pub fn new(terminal: T, launcher: L) -> Self {
        Self {
            terminal,
            launcher,
            options: BridgeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BridgeOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs `program` until it exits, relaying `input` to it and its output
    /// to `output`.
    ///
    /// The terminal is put in raw mode for the duration and restored on every
    /// path, including a failed launch.
    pub fn run<I, O>(
        &self,
        input: I,
        output: O,
        program: &str,
        args: &[String],
    ) -> Result<(), BridgeError>
    where
        I: InputSource + Send + 'static,
        O: Write + Send + 'static,
    {
        let session = TerminalSession::acquire(&self.terminal)?;
        let size = session.size();
        debug!(program, rows = size.rows, cols = size.cols, "launching on pseudo-terminal");

        let channel = self
            .launcher
            .launch(program, args, size)
            .map_err(|source| BridgeError::Spawn {
                program: program.to_string(),
                source,
            })?;
        let (reader, writer, mut child, master) = channel.into_parts();

        let cancel = CancellationToken::new();
        let (done_tx, done_rx) = mpsc::channel();
        let input_poll = self.options.input_poll;
        let relay_cancel = cancel.clone();
        spawn_relay("input", done_tx.clone(), move || {
            relay_input(input, writer, &relay_cancel, input_poll)
        });
        spawn_relay("output", done_tx, move || relay_output(reader, output));

        let status = child.wait();
        cancel.cancel();
        drop(master);
        drop(child);
        self.join_relays(&done_rx, 2);
        drop(session);

        let status = status.map_err(|source| BridgeError::Wait {
            program: program.to_string(),
            source,
        })?;
        debug!(program, code = status.code, "subprocess exited");
        if !status.success {
            return Err(BridgeError::Subprocess {
                program: program.to_string(),
                code: status.code,
            });
        }
        Ok(())
    }

    fn join_relays(&self, done: &mpsc::Receiver<&'static str>, mut pending: usize) {
        let deadline = Instant::now() + self.options.relay_grace;
        while pending > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match done.recv_timeout(remaining) {
                Ok(name) => {
                    trace!(relay = name, "relay finished");
                    pending -= 1;
                }
                Err(_) => {
                    warn!(pending, "relays still running after subprocess exit, detaching");
                    return;
                }
            }
        }
    }
}

/// Runs `program` on the process's own terminal, e.g. an editor or a pager.
pub fn run_interactive(program: &str, args: &[String]) -> Result<(), BridgeError> {
    Bridge::new(CrosstermTerminal, NativePtyLauncher).run(
        StdinSource::new(),
        io::stdout(),
        program,
        args,
    )
}

fn spawn_relay<F>(name: &'static str, done: mpsc::Sender<&'static str>, relay: F)
where
    F: FnOnce() -> io::Result<()> + Send + 'static,
{
    thread::spawn(move || {
        if let Err(err) = relay() {
            debug!(relay = name, error = %err, "relay stopped");
        }
        // The bridge may already have given up waiting.
        let _ = done.send(name);
    });
}

fn relay_input<I: InputSource>(
    mut input: I,
    mut writer: Box<dyn Write + Send>,
    cancel: &CancellationToken,
    poll: Duration,
) -> io::Result<()> {
    let mut buf = [0u8; RELAY_BUFFER_SIZE];
    while !cancel.is_cancelled() {
        match input.read_timeout(&mut buf, poll)? {
            Some(0) => break,
            Some(n) => {
                writer.write_all(&buf[..n])?;
                writer.flush()?;
            }
            None => {}
        }
    }
    Ok(())
}

fn relay_output<O: Write>(mut reader: Box<dyn Read + Send>, mut output: O) -> io::Result<()> {
    let mut buf = [0u8; RELAY_BUFFER_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            // Linux reports EIO on the master once the slave side is gone.
            Err(err) if err.raw_os_error() == Some(libc::EIO) => break,
            Err(err) => return Err(err),
        };
        output.write_all(&buf[..n])?;
        output.flush()?;
    }
    Ok(())
}
