use std::sync::Arc;

use tokio::net::TcpListener;

use core_pbx::Pbx;

use crate::connection::serve_connection;
use crate::extension::ExtensionAllocator;

/// Accept connections until the PBX starts shutting down, spawning one
/// task per connection.
pub async fn run(pbx: Arc<Pbx>, listener: TcpListener) {
    let allocator = Arc::new(ExtensionAllocator::new());

    loop {
        let accepted = tokio::select! {
            result = listener.accept() => result,
            _ = pbx.wait_for_close() => break,
        };

        let (stream, addr) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                log::warn!("server: accept failed: {}", e);
                continue;
            }
        };
        log::debug!("server: accepted connection from {}", addr);

        let pbx = Arc::clone(&pbx);
        let allocator = Arc::clone(&allocator);
        tokio::spawn(async move {
            serve_connection(pbx, allocator, stream).await;
        });
    }

    log::info!("server: accept loop stopped");
}
