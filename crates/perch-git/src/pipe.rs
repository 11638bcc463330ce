use std::sync::mpsc;

/// Returned by `send` once the reading side has been dropped.
#[derive(Debug, PartialEq, Eq)]
pub struct PipeClosed;

pub struct PipeWriter<T> {
    tx: mpsc::SyncSender<T>,
}

pub struct PipeReader<T> {
    rx: mpsc::Receiver<T>,
}

/// Bounded pipe between the raw-diff producer and its consumer. The writer
/// blocks once `capacity` items are in flight, and a dropped reader fails the
/// next send so the producer stops instead of blocking forever.
pub fn bounded<T>(capacity: usize) -> (PipeWriter<T>, PipeReader<T>) {
    let (tx, rx) = mpsc::sync_channel(capacity);
    (PipeWriter { tx }, PipeReader { rx })
}

impl<T> PipeWriter<T> {
    pub fn send(&self, item: T) -> Result<(), PipeClosed> {
        self.tx.send(item).map_err(|_| PipeClosed)
    }
}

impl<T> Iterator for PipeReader<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.rx.recv().ok()
    }
}
