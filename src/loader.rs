use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;

use crate::{
    assets::{ImageSource, Texture, decode_texture},
    error::CinedriftResult,
};

/// Identifies one scene initialization. Outcomes carrying a generation that
/// no longer matches the live one are dropped, which makes an in-flight
/// load race-free against teardown and reinitialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Generation(pub u64);

#[derive(Debug)]
pub struct LoadOutcome {
    pub generation: Generation,
    pub result: CinedriftResult<Texture>,
}

/// Off-thread image decoding, drained cooperatively by the frame tick.
///
/// Decoding is the only asynchronous operation in the engine; everything
/// else runs inside the single driving tick.
pub struct ImageLoader {
    tx: Sender<LoadOutcome>,
    rx: Receiver<LoadOutcome>,
}

impl ImageLoader {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self { tx, rx }
    }

    /// Starts decoding `source` on a worker thread. The outcome arrives via
    /// `try_recv` tagged with `generation`.
    pub fn request(&self, generation: Generation, source: ImageSource) {
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = decode_texture(&source);
            if let Err(err) = &result {
                tracing::debug!(%err, ?generation, "image decode failed");
            }
            // The receiver may already be gone if the engine was disposed.
            let _ = tx.send(LoadOutcome { generation, result });
        });
    }

    /// Non-blocking drain of one completed outcome.
    pub fn try_recv(&self) -> Option<LoadOutcome> {
        self.rx.try_recv().ok()
    }

    /// Blocks until one outcome arrives; test helper for deterministic
    /// sequencing.
    pub fn recv_blocking(&self) -> Option<LoadOutcome> {
        self.rx.recv().ok()
    }
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new()
    }
}
