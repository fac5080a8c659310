use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, StdinLock};

/// A sequential, blocking byte supplier that a [`BlockStream`](crate::BlockStream)
/// reads frames from.
///
/// Reading comes from [`std::io::Read`]; `read` returning `Ok(0)` for a
/// non-empty buffer means the source is exhausted.
pub trait ByteSource: Read {
    /// Bytes that can be read without blocking. `0` means "unknown", not
    /// end-of-stream.
    fn available_estimate(&self) -> usize {
        0
    }

    /// Release the source. Called at most once by the owning stream.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ByteSource for &[u8] {
    fn available_estimate(&self) -> usize {
        self.len()
    }
}

impl<T: AsRef<[u8]>> ByteSource for Cursor<T> {
    fn available_estimate(&self) -> usize {
        let len = self.get_ref().as_ref().len() as u64;
        len.saturating_sub(self.position()) as usize
    }
}

impl ByteSource for File {}

impl ByteSource for StdinLock<'_> {}

impl<R: ByteSource> ByteSource for BufReader<R> {
    fn available_estimate(&self) -> usize {
        self.buffer().len() + self.get_ref().available_estimate()
    }

    fn close(&mut self) -> io::Result<()> {
        self.get_mut().close()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn available_estimate(&self) -> usize {
        (**self).available_estimate()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn available_estimate(&self) -> usize {
        (**self).available_estimate()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}
