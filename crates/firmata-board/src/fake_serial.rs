//! In-memory serial device for tests.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::board::{Board, BoardConfig};
use crate::board_type::BoardType;

/// Both ends of a fake device: bytes pushed here are read by the board,
/// bytes the board writes are collected for inspection.
#[derive(Clone, Default)]
pub(crate) struct FakeSerial {
    inbound: Arc<Mutex<VecDeque<u8>>>,
    written: Arc<Mutex<Vec<u8>>>,
    unplugged: Arc<AtomicBool>,
}

impl FakeSerial {
    /// Queues bytes as if the device had sent them.
    pub(crate) fn push(&self, bytes: &[u8]) {
        self.inbound.lock().extend(bytes);
    }

    /// Drains everything the board has written so far.
    pub(crate) fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut *self.written.lock())
    }

    /// Makes every following write fail as a pulled cable would.
    pub(crate) fn set_unplugged(&self, unplugged: bool) {
        self.unplugged.store(unplugged, Ordering::SeqCst);
    }

    fn reader(&self) -> FakeReader {
        FakeReader {
            inbound: Arc::clone(&self.inbound),
        }
    }

    fn writer(&self) -> FakeWriter {
        FakeWriter {
            written: Arc::clone(&self.written),
            unplugged: Arc::clone(&self.unplugged),
        }
    }
}

struct FakeReader {
    inbound: Arc<Mutex<VecDeque<u8>>>,
}

/// Reports end of stream once the queue is empty.
impl Read for FakeReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut inbound = self.inbound.lock();
        let n = buf.len().min(inbound.len());
        for (slot, byte) in buf.iter_mut().zip(inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

struct FakeWriter {
    written: Arc<Mutex<Vec<u8>>>,
    unplugged: Arc<AtomicBool>,
}

impl Write for FakeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.unplugged.load(Ordering::SeqCst) {
            return Err(std::io::ErrorKind::BrokenPipe.into());
        }
        self.written.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub(crate) fn fake_board() -> (Arc<Board>, FakeSerial) {
    fake_board_with(BoardType::arduino())
}

pub(crate) fn fake_board_with(board_type: BoardType) -> (Arc<Board>, FakeSerial) {
    let serial = FakeSerial::default();
    let config = BoardConfig::new("fake")
        .with_board_type(board_type)
        .with_startup_delay(Duration::ZERO);
    let board = Board::from_parts(config, serial.reader(), serial.writer())
        .expect("fake board should build");
    (Arc::new(board), serial)
}
