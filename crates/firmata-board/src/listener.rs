//! Background decode loop.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use firmata_codec::CodecError;
use tracing::{debug, info, warn};

use crate::board::Board;
use crate::error::{BoardError, Result};

/// Pause after a transport I/O failure before reading again.
const IO_ERROR_BACKOFF: Duration = Duration::from_millis(10);

impl Board {
    /// Starts a thread that calls [`Board::iterate`] until [`Board::stop`].
    ///
    /// Read timeouts are ignored; any other per-iteration error is logged,
    /// counted in [`Board::error_count`] and the loop keeps going. After a
    /// transport I/O error the loop pauses briefly before the next read. The loop
    /// ends on its own when the transport reaches end of stream or the
    /// board is dropped. Calling this while already listening does nothing.
    pub fn start_listening(self: &Arc<Self>) -> Result<()> {
        if self.listening.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let weak = Arc::downgrade(self);
        let spawned = thread::Builder::new()
            .name(format!("firmata-{}", self.name()))
            .spawn(move || listen(weak));

        match spawned {
            Ok(handle) => {
                info!(board = %self.name(), "listening");
                *self.listener.lock() = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.listening.store(false, Ordering::Release);
                Err(err.into())
            }
        }
    }

    /// Stops the listener before its next iteration.
    ///
    /// A read already in progress is not interrupted; it ends when data
    /// arrives or the transport's read timeout elapses.
    pub fn stop(&self) {
        if self.listening.swap(false, Ordering::AcqRel) {
            info!(board = %self.name(), "stopped listening");
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Acquire)
    }

    /// Waits for the listener thread to exit.
    ///
    /// Call [`Board::stop`] first, or this blocks until the transport
    /// closes.
    pub fn join_listener(&self) {
        let handle = self.listener.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                warn!(board = %self.name(), "listener thread panicked");
            }
        }
    }
}

fn listen(weak: Weak<Board>) {
    loop {
        let Some(board) = weak.upgrade() else {
            debug!("board dropped, listener exiting");
            return;
        };
        if !board.is_listening() {
            return;
        }

        match board.iterate() {
            Ok(()) => {}
            Err(err) if err.is_timeout() => {}
            Err(err) if err.is_closed() => {
                info!(board = %board.name(), "transport closed, listener exiting");
                board.listening.store(false, Ordering::Release);
                return;
            }
            Err(err) => {
                board.error_count.fetch_add(1, Ordering::Relaxed);
                warn!(board = %board.name(), error = %err, "iteration failed");
                if matches!(err, BoardError::Codec(CodecError::Io(_))) {
                    drop(board);
                    thread::sleep(IO_ERROR_BACKOFF);
                }
            }
        }
    }
}
