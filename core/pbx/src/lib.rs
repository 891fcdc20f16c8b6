//! The PBX registry.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

use core_tu::Tu;
use pbx_protocol::{Extension, PbxError, PbxResult, DEFAULT_MAX_EXTENSIONS};

/// The PBX extension registry. A single instance is created at process
/// start and torn down at shutdown.
pub struct Pbx {
    slots: Mutex<Vec<Option<Arc<Tu>>>>,
    tu_count: AtomicUsize,

    /// Set once shutdown begins; every service loop's read select checks
    /// this before blocking. Generalizes the source's
    /// `shutdown(fd, SHUT_RDWR)`, which unblocks a thread's blocking
    /// `read` from another thread -- the async equivalent is a
    /// cooperative cancellation signal the read loop selects against.
    closing: AtomicBool,
    close_signal: Notify,

    /// The shutdown barrier: held down while any TU is registered,
    /// signaled once `tu_count` returns to zero.
    all_unregistered: Notify,
}

impl Pbx {
    /// Create a new PBX with the default extension capacity.
    pub fn init() -> Arc<Pbx> {
        Self::with_capacity(DEFAULT_MAX_EXTENSIONS)
    }

    /// Create a new PBX with a specific extension capacity.
    pub fn with_capacity(capacity: usize) -> Arc<Pbx> {
        Arc::new(Pbx {
            slots: Mutex::new((0..capacity).map(|_| None).collect()),
            tu_count: AtomicUsize::new(0),
            closing: AtomicBool::new(false),
            close_signal: Notify::new(),
            all_unregistered: Notify::new(),
        })
    }

    /// Number of currently registered TUs.
    pub fn tu_count(&self) -> usize {
        self.tu_count.load(Ordering::Acquire)
    }

    /// Whether `shutdown` has been called. The accept loop stops taking
    /// new connections once this is true.
    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Resolves once the PBX starts shutting down. Every service loop
    /// selects this alongside its next socket read so that shutdown can
    /// unblock an in-flight read without the PBX needing a handle to the
    /// socket itself.
    pub async fn wait_for_close(&self) {
        if self.is_closing() {
            return;
        }
        self.close_signal.notified().await;
    }

    fn find_first_available(slots: &[Option<Arc<Tu>>]) -> Option<usize> {
        slots.iter().position(|slot| slot.is_none())
    }

    fn find_by_extension(slots: &[Option<Arc<Tu>>], ext: Extension) -> Option<usize> {
        slots
            .iter()
            .position(|slot| matches!(slot, Some(tu) if tu.extension() == Some(ext)))
    }

    /// Register `tu` at extension `ext`.
    pub async fn register(&self, tu: Arc<Tu>, ext: Extension) -> PbxResult<()> {
        {
            let mut slots = self.slots.lock().await;
            let index = Self::find_first_available(&slots).ok_or(PbxError::RegistryFull)?;
            slots[index] = Some(Arc::clone(&tu));
        }

        // The slot bookkeeping above is enough that no other task can find
        // this TU by a stale lookup racing registration, so the TU-level
        // operations below run without the registry lock held.
        core_tu::set_extension(&tu, ext).await;
        core_tu::inc_ref(&tu).await;

        self.tu_count.fetch_add(1, Ordering::AcqRel);
        log::debug!("pbx: registered extension {} ({} total)", ext, self.tu_count());
        Ok(())
    }

    /// Unregister `tu`, dropping any call in progress first.
    pub async fn unregister(&self, tu: &Arc<Tu>) -> PbxResult<()> {
        let ext = tu.extension().ok_or(PbxError::UnknownExtension(0))?;

        let mut slots = self.slots.lock().await;
        let index = Self::find_by_extension(&slots, ext).ok_or(PbxError::UnknownExtension(ext))?;

        // Held across these TU-level calls: this is the one place the
        // registry lock and a TU lock nest, which is safe because
        // unregister never waits on anything that could in turn wait on
        // the registry lock.
        core_tu::hangup(tu).await;
        core_tu::dec_ref(tu).await;
        slots[index] = None;
        drop(slots);

        if self.tu_count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.all_unregistered.notify_one();
        }
        log::debug!("pbx: unregistered extension {} ({} total)", ext, self.tu_count());
        Ok(())
    }

    /// Look up `ext` and initiate a call from `tu`. Returns `false` only
    /// along the null-target `ERROR` path, matching `core_tu::dial`.
    pub async fn dial(&self, tu: &Arc<Tu>, ext: Extension) -> bool {
        let target = {
            let slots = self.slots.lock().await;
            Self::find_by_extension(&slots, ext).and_then(|i| slots[i].clone())
        };
        core_tu::dial(tu, target).await
    }

    /// Close every registered TU's connection and block until the last one
    /// has unregistered, then return.
    ///
    /// Must not hold the registry lock while waiting on the shutdown
    /// barrier: service loops need it to run `unregister` as they exit.
    pub async fn shutdown(&self) {
        log::info!("pbx: shutdown starting ({} registered)", self.tu_count());
        self.closing.store(true, Ordering::Release);
        self.close_signal.notify_waiters();

        while self.tu_count.load(Ordering::Acquire) != 0 {
            self.all_unregistered.notified().await;
        }
        log::info!("pbx: shutdown complete");
    }
}
