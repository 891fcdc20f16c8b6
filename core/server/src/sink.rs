use std::io;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;

use core_tu::ClientSink;

/// The real `ClientSink`: a TU's write half of its TCP connection.
pub struct TcpSink {
    write_half: OwnedWriteHalf,
}

impl TcpSink {
    pub fn new(write_half: OwnedWriteHalf) -> Self {
        TcpSink { write_half }
    }
}

#[async_trait]
impl ClientSink for TcpSink {
    async fn send_line(&mut self, line: &str) -> io::Result<()> {
        self.write_half.write_all(line.as_bytes()).await
    }
}
