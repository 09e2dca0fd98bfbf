//! Channels between the reactor and the layers around it.
//!
//! Every message carries the tracing span that was current when it was sent,
//! so a request can be traced back to the event that caused it.

use tokio::sync::mpsc::error::SendError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{Span, debug};

pub mod broadcast;
pub mod reactor;

pub struct Sender<T>(UnboundedSender<(Span, T)>);
pub type Receiver<T> = UnboundedReceiver<(Span, T)>;

pub fn channel<T>() -> (Sender<T>, Receiver<T>) {
    let (tx, rx) = unbounded_channel();
    (Sender(tx), rx)
}

impl<T> Sender<T> {
    /// Sends without caring whether anyone still listens. A closed channel
    /// only means the consumer is shutting down.
    pub fn send(&self, msg: T) {
        if self.try_send(msg).is_err() {
            debug!("receiver closed, dropping message");
        }
    }

    pub fn try_send(&self, msg: T) -> Result<(), SendError<(Span, T)>> {
        self.0.send((Span::current(), msg))
    }

    pub fn is_closed(&self) -> bool { self.0.is_closed() }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

/// Everything currently queued on `rx`, without waiting.
pub fn drain<T>(rx: &mut Receiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    while let Ok((_, msg)) = rx.try_recv() {
        out.push(msg);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_queued_messages_in_order() {
        let (tx, mut rx) = channel();
        tx.send(1);
        tx.send(2);
        assert_eq!(drain(&mut rx), vec![1, 2]);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn send_after_close_is_silent() {
        let (tx, rx) = channel::<u8>();
        drop(rx);
        assert!(tx.is_closed());
        tx.send(7);
        assert!(tx.try_send(7).is_err());
    }
}
