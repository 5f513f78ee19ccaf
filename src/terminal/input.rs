use std::{
    io,
    os::fd::{AsRawFd, RawFd},
    time::Duration,
};

/// A byte source that can be read without blocking indefinitely, so a relay
/// reading from it can notice cancellation.
pub trait InputSource {
    /// Waits up to `timeout` for input. `Ok(None)` means nothing arrived,
    /// `Ok(Some(0))` means end of input.
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>>;
}

/// Standard input, read directly from its file descriptor so that no bytes
/// are held back in a userspace buffer.
#[derive(Debug)]
pub struct StdinSource {
    fd: RawFd,
}

impl StdinSource {
    pub fn new() -> Self {
        Self {
            fd: io::stdin().as_raw_fd(),
        }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for StdinSource {
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        let mut pollfd = libc::pollfd {
            fd: self.fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let millis = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);

        // SAFETY: `pollfd` is a valid, exclusively borrowed pollfd and the
        // count passed is 1.
        let ready = unsafe { libc::poll(&mut pollfd, 1, millis) };
        if ready < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(None);
            }
            return Err(err);
        }
        if ready == 0 {
            return Ok(None);
        }

        // SAFETY: `buf` is valid for writes of `buf.len()` bytes for the
        // duration of the call.
        let read = unsafe { libc::read(self.fd, buf.as_mut_ptr().cast(), buf.len()) };
        if read < 0 {
            let err = io::Error::last_os_error();
            return match err.kind() {
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock => Ok(None),
                _ => Err(err),
            };
        }
        Ok(Some(read as usize))
    }
}
