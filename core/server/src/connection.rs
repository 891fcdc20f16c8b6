use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;

use core_pbx::Pbx;
use core_tu::Tu;

use crate::command::{parse_line, Command};
use crate::extension::ExtensionAllocator;
use crate::sink::TcpSink;

/// Service one accepted connection end to end: register, read and dispatch
/// one command per line, unregister on exit.
pub async fn serve_connection(pbx: Arc<Pbx>, allocator: Arc<ExtensionAllocator>, stream: TcpStream) {
    let (read_half, write_half) = stream.into_split();
    let tu = Tu::new(Box::new(TcpSink::new(write_half)));

    let ext = allocator.next();
    if let Err(e) = pbx.register(Arc::clone(&tu), ext).await {
        log::warn!("server: registration of extension {} failed: {}", ext, e);
        return;
    }

    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    loop {
        line.clear();
        let read = tokio::select! {
            result = reader.read_line(&mut line) => result,
            _ = pbx.wait_for_close() => break,
        };

        let bytes_read = match read {
            Ok(n) => n,
            Err(e) => {
                log::debug!("extension {}: read error: {}", ext, e);
                break;
            }
        };
        if bytes_read == 0 {
            break; // EOF
        }

        let stripped = line.trim_end_matches(|c| c == '\n' || c == '\r');
        dispatch(&tu, &pbx, stripped).await;
    }

    if let Err(e) = pbx.unregister(&tu).await {
        log::debug!("extension {}: unregister failed: {}", ext, e);
    }
}

async fn dispatch(tu: &Arc<Tu>, pbx: &Arc<Pbx>, line: &str) {
    match parse_line(line) {
        Some(Command::Pickup) => core_tu::pickup(tu).await,
        Some(Command::Hangup) => core_tu::hangup(tu).await,
        Some(Command::Dial(Some(target_ext))) => {
            pbx.dial(tu, target_ext).await;
        }
        Some(Command::Dial(None)) => {
            core_tu::dial(tu, None).await;
        }
        Some(Command::Chat(msg)) => {
            core_tu::chat(tu, &msg).await;
        }
        None => {} // unrecognized command: no state change
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_tu::MockSink;

    async fn register(pbx: &Arc<Pbx>, ext: u32) -> (Arc<Tu>, tokio::sync::mpsc::UnboundedReceiver<String>) {
        let (sink, rx) = MockSink::channel();
        let tu = Tu::new(Box::new(sink));
        pbx.register(Arc::clone(&tu), ext).await.unwrap();
        (tu, rx)
    }

    #[tokio::test]
    async fn unrecognized_command_leaves_state_unchanged() {
        let pbx = Pbx::with_capacity(4);
        let (tu, mut rx) = register(&pbx, 4).await;
        let _ = rx.recv().await; // ON HOOK 4 from registration

        dispatch(&tu, &pbx, "quit").await;
        assert_eq!(tu.state().await, pbx_protocol::TuState::OnHook);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dial_with_valid_extension_goes_through_the_registry() {
        let pbx = Pbx::with_capacity(4);
        let (a, mut a_rx) = register(&pbx, 4).await;
        let (b, mut b_rx) = register(&pbx, 5).await;
        let _ = a_rx.recv().await;
        let _ = b_rx.recv().await;

        dispatch(&a, &pbx, "pickup").await;
        assert_eq!(a_rx.recv().await.unwrap(), "DIAL TONE\n");

        dispatch(&a, &pbx, "dial 5").await;
        assert_eq!(a.state().await, pbx_protocol::TuState::RingBack);
        assert_eq!(b.state().await, pbx_protocol::TuState::Ringing);
    }

    #[tokio::test]
    async fn dial_with_non_numeric_argument_errors() {
        let pbx = Pbx::with_capacity(4);
        let (a, mut a_rx) = register(&pbx, 4).await;
        let _ = a_rx.recv().await;

        dispatch(&a, &pbx, "pickup").await;
        let _ = a_rx.recv().await;
        dispatch(&a, &pbx, "dial abc").await;
        assert_eq!(a.state().await, pbx_protocol::TuState::Error);
    }
}
