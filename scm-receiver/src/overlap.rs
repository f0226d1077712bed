//! Optional I/O/compute overlap: a helper thread reads blocks from the
//! sample source and feeds them through a bounded channel, so the next
//! block's I/O can proceed while the pipeline is still processing the
//! previous one. Exactly one consumer, no shared mutable state beyond
//! the channel itself.

use std::io::Read;
use std::sync::mpsc::{sync_channel, Receiver};
use std::thread;

use scm_core::demod::RAW_BLOCK_BYTES;
use scm_core::types::{Error, Result};

/// Something `ReceiverLoop` can pull fixed-size raw blocks from.
pub trait BlockSource {
    fn next_block(&mut self) -> Result<Vec<u8>>;
}

/// Any plain `Read` is a synchronous block source — used directly by
/// tests against an in-memory `Cursor`.
impl<R: Read> BlockSource for R {
    fn next_block(&mut self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; RAW_BLOCK_BYTES];
        read_exact_tracking(self, &mut buf)?;
        Ok(buf)
    }
}

/// Reads exactly `buf.len()` bytes, retrying on `Interrupted`, reporting
/// the number of bytes actually obtained before a short read.
pub fn read_exact_tracking(source: &mut impl Read, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(Error::SourceExhausted {
                    expected: buf.len(),
                    actual: filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::SourceProtocol(e.to_string())),
        }
    }
    Ok(())
}

/// A block source backed by a background reader thread feeding a
/// bounded queue of two blocks.
pub struct OverlappedSource {
    rx: Receiver<Result<Vec<u8>>>,
}

impl OverlappedSource {
    /// Spawn the reader thread over `source` and return the consumer
    /// end. The thread exits after sending its first error.
    pub fn spawn<R: Read + Send + 'static>(mut source: R) -> Self {
        let (tx, rx) = sync_channel(2);
        thread::spawn(move || loop {
            let mut buf = vec![0u8; RAW_BLOCK_BYTES];
            let result = read_exact_tracking(&mut source, &mut buf).map(|_| buf);
            let is_err = result.is_err();
            if tx.send(result).is_err() || is_err {
                return;
            }
        });
        OverlappedSource { rx }
    }
}

impl BlockSource for OverlappedSource {
    fn next_block(&mut self) -> Result<Vec<u8>> {
        self.rx
            .recv()
            .unwrap_or_else(|_| Err(Error::SourceProtocol("reader thread exited".to_string())))
    }
}
