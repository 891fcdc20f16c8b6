use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use pbx_protocol::notify::{format_chat, format_notification};
use pbx_protocol::{Extension, TuState};

use crate::sink::ClientSink;

/// A telephone unit: the per-connection state machine.
///
/// `extension` is set exactly once, by [`set_extension`], and is read
/// without locking thereafter -- it never changes again while the TU is
/// registered, which is the only time any two-TU operation can reach it.
/// Everything else that can change lives behind `inner`, a single
/// `tokio::sync::Mutex` so that a state read and the notification it
/// produces can be held across the `.await` of a network write, so a
/// state change and its notification are never interleaved with another
/// one on the same TU.
pub struct Tu {
    extension: AtomicU32,
    inner: Mutex<TuInner>,
}

struct TuInner {
    state: TuState,
    peer: Option<Arc<Tu>>,
    ref_count: usize,
    client: Box<dyn ClientSink>,
}

impl Tu {
    /// Create a new TU in the `ON_HOOK` state, not yet registered with any
    /// PBX (its extension is unset until [`set_extension`] is called).
    pub fn new(client: Box<dyn ClientSink>) -> Arc<Tu> {
        Arc::new(Tu {
            extension: AtomicU32::new(0),
            inner: Mutex::new(TuInner {
                state: TuState::OnHook,
                peer: None,
                ref_count: 0,
                client,
            }),
        })
    }

    /// The TU's extension, or `None` before registration has assigned one.
    pub fn extension(&self) -> Option<Extension> {
        match self.extension.load(Ordering::Acquire) {
            0 => None,
            ext => Some(ext),
        }
    }

    /// The raw extension value, `0` before registration. Only used for
    /// lock-ordering and for notification formatting, where a not-yet-
    /// registered TU cannot appear (every two-TU operation requires both
    /// sides to already be registered).
    fn extension_or_zero(&self) -> Extension {
        self.extension.load(Ordering::Acquire)
    }

    /// The TU's current state, for tests and diagnostics.
    pub async fn state(&self) -> TuState {
        self.inner.lock().await.state
    }

    /// The TU's current reference count, for tests and diagnostics.
    pub async fn ref_count(&self) -> usize {
        self.inner.lock().await.ref_count
    }

    /// The extension of the TU's current peer, if any.
    pub async fn peer_extension(&self) -> Option<Extension> {
        let inner = self.inner.lock().await;
        inner.peer.as_ref().map(|p| p.extension_or_zero())
    }
}

/// Acquire both TUs' locks in ascending-extension order, then release in
/// reverse. Returns the guards in `(tu, peer)` position regardless of
/// which one was locked first.
///
/// Locking in a fixed global order regardless of call direction is what
/// avoids deadlock: without it, two concurrent operations on the same
/// pair taken from opposite sides could each hold one lock and wait on
/// the other.
async fn lock_pair<'a>(
    tu: &'a Arc<Tu>,
    peer: &'a Arc<Tu>,
) -> (MutexGuard<'a, TuInner>, MutexGuard<'a, TuInner>) {
    if tu.extension_or_zero() <= peer.extension_or_zero() {
        let a = tu.inner.lock().await;
        let b = peer.inner.lock().await;
        (a, b)
    } else {
        let b = peer.inner.lock().await;
        let a = tu.inner.lock().await;
        (a, b)
    }
}

/// Send a notification of `inner`'s current state to its own client.
/// `own_ext` is the TU's own extension; for `CONNECTED`, the notification
/// instead carries the peer's extension, read off the peer's stable,
/// lock-free extension field.
async fn send_state(inner: &mut TuInner, own_ext: Extension) {
    let ext = match inner.state {
        TuState::Connected => inner
            .peer
            .as_ref()
            .map(|p| p.extension_or_zero())
            .unwrap_or(own_ext),
        _ => own_ext,
    };
    let line = format_notification(inner.state, ext);
    // A write failure means a dead client; the service loop will observe
    // EOF on its next read and unregister. Nothing to report here.
    let _ = inner.client.send_line(&line).await;
    check_invariants(inner);
}

fn check_invariants(inner: &TuInner) {
    debug_assert_eq!(
        inner.peer.is_some(),
        inner.state.requires_peer(),
        "peer presence must match state: {:?}",
        inner.state
    );
}

/// Take a TU off-hook.
pub async fn pickup(tu: &Arc<Tu>) {
    let own_ext = tu.extension_or_zero();
    log::debug!("tu {}: pickup", own_ext);

    // `tu.peer` only ever changes under `tu`'s own lock (every mutator of
    // it, one- or two-party, holds this TU's lock as part of its lock
    // set), so this peek sees a consistent snapshot. It can still be
    // stale by the time we take the full lock pair below if the peer side
    // hangs up concurrently -- re-validated there.
    let peer = {
        let me = tu.inner.lock().await;
        if me.state == TuState::Ringing {
            me.peer.clone()
        } else {
            None
        }
    };

    match peer {
        None => {
            let mut me = tu.inner.lock().await;
            if me.state == TuState::OnHook {
                me.state = TuState::DialTone;
            }
            send_state(&mut me, own_ext).await;
        }
        Some(peer_tu) => {
            let (mut me, mut peer_guard) = lock_pair(tu, &peer_tu).await;
            if me.state == TuState::Ringing {
                me.state = TuState::Connected;
                peer_guard.state = TuState::Connected;
                send_state(&mut peer_guard, peer_tu.extension_or_zero()).await;
            }
            send_state(&mut me, own_ext).await;
        }
    }
}

/// Hang up a TU, dropping any call in progress.
pub async fn hangup(tu: &Arc<Tu>) {
    let own_ext = tu.extension_or_zero();
    log::debug!("tu {}: hangup", own_ext);

    let peer = {
        let me = tu.inner.lock().await;
        if matches!(
            me.state,
            TuState::Connected | TuState::Ringing | TuState::RingBack
        ) {
            me.peer.clone()
        } else {
            None
        }
    };

    match peer {
        None => {
            let mut me = tu.inner.lock().await;
            me.state = TuState::OnHook;
            send_state(&mut me, own_ext).await;
        }
        Some(peer_tu) => {
            let (mut me, mut peer_guard) = lock_pair(tu, &peer_tu).await;
            // Re-validate: the peer side may have already hung up between
            // the peek above and taking both locks here.
            if matches!(
                me.state,
                TuState::Connected | TuState::Ringing | TuState::RingBack
            ) {
                peer_guard.state = if me.state == TuState::RingBack {
                    TuState::OnHook
                } else {
                    TuState::DialTone
                };
                peer_guard.peer = None;
                peer_guard.ref_count = peer_guard.ref_count.saturating_sub(1);
                me.peer = None;
                me.ref_count = me.ref_count.saturating_sub(1);
                send_state(&mut peer_guard, peer_tu.extension_or_zero()).await;
            }
            me.state = TuState::OnHook;
            send_state(&mut me, own_ext).await;
        }
    }
}

/// Initiate a call from `tu` to `target`, or `None` if the caller couldn't
/// resolve a target extension. Returns `false` only along the "no target"
/// path that can drive `tu` to `ERROR`; every other path is considered
/// successful even when it results in `BUSY_SIGNAL`.
pub async fn dial(tu: &Arc<Tu>, target: Option<Arc<Tu>>) -> bool {
    let own_ext = tu.extension_or_zero();
    log::debug!(
        "tu {}: dial {:?}",
        own_ext,
        target.as_ref().and_then(|t| t.extension())
    );

    match target {
        None => {
            let mut me = tu.inner.lock().await;
            if me.state == TuState::DialTone {
                me.state = TuState::Error;
            }
            send_state(&mut me, own_ext).await;
            false
        }
        Some(ref target_tu) if Arc::ptr_eq(target_tu, tu) => {
            let mut me = tu.inner.lock().await;
            me.state = TuState::BusySignal;
            send_state(&mut me, own_ext).await;
            true
        }
        Some(target_tu) => {
            let (mut me, mut target_guard) = lock_pair(tu, &target_tu).await;
            if me.state != TuState::DialTone {
                // not off-hook and dialing: no effect, just report current state
            } else if target_guard.ref_count > 1 || target_guard.state != TuState::OnHook {
                me.state = TuState::BusySignal;
            } else {
                log::debug!("tu {}: ringing {}", own_ext, target_tu.extension_or_zero());
                me.peer = Some(Arc::clone(&target_tu));
                target_guard.peer = Some(Arc::clone(tu));
                me.ref_count += 1;
                target_guard.ref_count += 1;
                me.state = TuState::RingBack;
                target_guard.state = TuState::Ringing;
                send_state(&mut target_guard, target_tu.extension_or_zero()).await;
            }
            send_state(&mut me, own_ext).await;
            true
        }
    }
}

/// Relay a chat message to `tu`'s peer, if any.
pub async fn chat(tu: &Arc<Tu>, msg: &str) -> bool {
    let own_ext = tu.extension_or_zero();

    let peer = {
        let me = tu.inner.lock().await;
        if me.state == TuState::Connected {
            me.peer.clone()
        } else {
            None
        }
    };

    match peer {
        None => {
            let mut me = tu.inner.lock().await;
            send_state(&mut me, own_ext).await;
            false
        }
        Some(peer_tu) => {
            let (mut me, mut peer_guard) = lock_pair(tu, &peer_tu).await;
            let connected = me.state == TuState::Connected && me.peer.is_some();
            if connected {
                let line = format_chat(msg);
                let _ = peer_guard.client.send_line(&line).await;
            }
            send_state(&mut me, own_ext).await;
            connected
        }
    }
}

/// Called exactly once by the PBX at registration time.
pub async fn set_extension(tu: &Arc<Tu>, ext: Extension) {
    tu.extension.store(ext, Ordering::Release);
    let mut me = tu.inner.lock().await;
    send_state(&mut me, ext).await;
}

/// Increment the reference count, as when the PBX or a peer retains `tu`.
pub async fn inc_ref(tu: &Arc<Tu>) {
    let mut me = tu.inner.lock().await;
    me.ref_count += 1;
}

/// Decrement the reference count and return the new value. The caller is
/// responsible for also dropping its `Arc<Tu>` clone when this reaches
/// zero -- Rust's allocator frees the TU once the last `Arc` is dropped,
/// playing the role of the source's explicit `free` in `tu_unref`.
pub async fn dec_ref(tu: &Arc<Tu>) -> usize {
    let mut me = tu.inner.lock().await;
    me.ref_count = me.ref_count.saturating_sub(1);
    me.ref_count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::mock::MockSink;

    async fn make(ext: Extension) -> (Arc<Tu>, tokio::sync::mpsc::UnboundedReceiver<String>) {
        let (sink, rx) = MockSink::channel();
        let tu = Tu::new(Box::new(sink));
        set_extension(&tu, ext).await;
        // drain the registration notification
        (tu, rx)
    }

    #[tokio::test]
    async fn pickup_from_on_hook_goes_to_dial_tone() {
        let (tu, mut rx) = make(4).await;
        let _ = rx.recv().await; // ON HOOK 4 at registration
        pickup(&tu).await;
        assert_eq!(tu.state().await, TuState::DialTone);
        assert_eq!(rx.recv().await.unwrap(), "DIAL TONE\n");
    }

    #[tokio::test]
    async fn basic_call_scenario() {
        let (a, mut a_rx) = make(4).await;
        let (b, mut b_rx) = make(5).await;
        let _ = a_rx.recv().await;
        let _ = b_rx.recv().await;

        pickup(&a).await;
        assert_eq!(a_rx.recv().await.unwrap(), "DIAL TONE\n");

        assert!(dial(&a, Some(Arc::clone(&b))).await);
        assert_eq!(a.state().await, TuState::RingBack);
        assert_eq!(b.state().await, TuState::Ringing);
        assert_eq!(b_rx.recv().await.unwrap(), "RINGING\n");
        assert_eq!(a_rx.recv().await.unwrap(), "RING BACK\n");

        pickup(&b).await;
        assert_eq!(a.state().await, TuState::Connected);
        assert_eq!(b.state().await, TuState::Connected);
        assert_eq!(a_rx.recv().await.unwrap(), "CONNECTED 5\n");
        assert_eq!(b_rx.recv().await.unwrap(), "CONNECTED 4\n");

        assert!(chat(&a, "hello").await);
        assert_eq!(b_rx.recv().await.unwrap(), "CHAT hello\n");
        assert_eq!(a_rx.recv().await.unwrap(), "CONNECTED 5\n");

        hangup(&a).await;
        assert_eq!(a.state().await, TuState::OnHook);
        assert_eq!(b.state().await, TuState::DialTone);
        assert_eq!(a_rx.recv().await.unwrap(), "ON HOOK 4\n");
        assert_eq!(b_rx.recv().await.unwrap(), "DIAL TONE\n");
    }

    #[tokio::test]
    async fn self_dial_is_busy() {
        let (a, mut a_rx) = make(4).await;
        let _ = a_rx.recv().await;
        pickup(&a).await;
        let _ = a_rx.recv().await;
        assert!(dial(&a, Some(Arc::clone(&a))).await);
        assert_eq!(a.state().await, TuState::BusySignal);
        assert_eq!(a_rx.recv().await.unwrap(), "BUSY SIGNAL\n");
    }

    #[tokio::test]
    async fn null_target_from_dial_tone_errors() {
        let (a, mut a_rx) = make(4).await;
        let _ = a_rx.recv().await;
        pickup(&a).await;
        let _ = a_rx.recv().await;
        assert!(!dial(&a, None).await);
        assert_eq!(a.state().await, TuState::Error);
        assert_eq!(a_rx.recv().await.unwrap(), "ERROR\n");
        hangup(&a).await;
        assert_eq!(a.state().await, TuState::OnHook);
    }

    #[tokio::test]
    async fn busy_target_rejects_dial() {
        let (a, mut a_rx) = make(4).await;
        let (b, mut b_rx) = make(5).await;
        let (c, mut c_rx) = make(6).await;
        let _ = a_rx.recv().await;
        let _ = b_rx.recv().await;
        let _ = c_rx.recv().await;

        pickup(&a).await;
        let _ = a_rx.recv().await;
        dial(&a, Some(Arc::clone(&b))).await;
        let _ = a_rx.recv().await;
        let _ = b_rx.recv().await;
        pickup(&b).await;
        let _ = a_rx.recv().await;
        let _ = b_rx.recv().await;

        pickup(&c).await;
        let _ = c_rx.recv().await;
        dial(&c, Some(Arc::clone(&b))).await;
        assert_eq!(c.state().await, TuState::BusySignal);
        assert_eq!(c_rx.recv().await.unwrap(), "BUSY SIGNAL\n");
        assert_eq!(a.state().await, TuState::Connected);
        assert_eq!(b.state().await, TuState::Connected);
    }

    #[tokio::test]
    async fn dial_from_on_hook_against_busy_target_is_a_no_op() {
        let (a, mut a_rx) = make(4).await;
        let (b, mut b_rx) = make(5).await;
        let (c, mut c_rx) = make(6).await;
        let _ = a_rx.recv().await;
        let _ = b_rx.recv().await;
        let _ = c_rx.recv().await;

        pickup(&a).await;
        let _ = a_rx.recv().await;
        dial(&a, Some(Arc::clone(&b))).await;
        let _ = a_rx.recv().await;
        let _ = b_rx.recv().await;
        pickup(&b).await;
        let _ = a_rx.recv().await;
        let _ = b_rx.recv().await;

        // C never picked up, so it's still ON_HOOK: dialing a busy
        // extension from here must leave C's state untouched.
        assert_eq!(c.state().await, TuState::OnHook);
        dial(&c, Some(Arc::clone(&b))).await;
        assert_eq!(c.state().await, TuState::OnHook);
        assert_eq!(c_rx.recv().await.unwrap(), "ON HOOK 6\n");
        assert_eq!(a.state().await, TuState::Connected);
        assert_eq!(b.state().await, TuState::Connected);
    }
}
