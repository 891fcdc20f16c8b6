use std::io;

use async_trait::async_trait;

/// Write side of a TU's network connection.
///
/// `core-server`'s service loop owns the read side of a connection; every
/// write to the client goes through this trait so `core-tu` stays free of
/// any concrete transport, the way the source's `send_to_client` is the
/// only function in `tu.c` that touches the socket directly.
#[async_trait]
pub trait ClientSink: Send + Sync {
    async fn send_line(&mut self, line: &str) -> io::Result<()>;
}

#[cfg(any(test, feature = "test-util"))]
pub mod mock {
    use super::*;
    use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

    /// A `ClientSink` that records every line sent to it instead of
    /// writing to a socket, for use in `core-tu`'s and `core-pbx`'s unit
    /// tests.
    pub struct MockSink {
        tx: UnboundedSender<String>,
    }

    impl MockSink {
        pub fn channel() -> (Self, UnboundedReceiver<String>) {
            let (tx, rx) = mpsc::unbounded_channel();
            (MockSink { tx }, rx)
        }
    }

    #[async_trait]
    impl ClientSink for MockSink {
        async fn send_line(&mut self, line: &str) -> io::Result<()> {
            // A closed receiver models a dead client: the spec treats a
            // failed write as discardable, never a PBX-level error.
            let _ = self.tx.send(line.to_string());
            Ok(())
        }
    }
}
