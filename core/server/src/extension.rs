use std::sync::atomic::{AtomicU32, Ordering};

use pbx_protocol::Extension;

/// Hands out extension numbers at registration time.
///
/// The original program assigns a TU's extension equal to its connection's
/// file descriptor; fds for client connections there typically start at 4
/// (after stdin, stdout, stderr, and the listening socket). Only
/// uniqueness is actually required, so this allocator keeps that starting
/// number but produces it with a plain monotonic counter instead of
/// reading back a file descriptor.
pub struct ExtensionAllocator {
    next: AtomicU32,
}

impl ExtensionAllocator {
    pub fn new() -> Self {
        ExtensionAllocator {
            next: AtomicU32::new(4),
        }
    }

    pub fn next(&self) -> Extension {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for ExtensionAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_ascending_unique_extensions() {
        let allocator = ExtensionAllocator::new();
        assert_eq!(allocator.next(), 4);
        assert_eq!(allocator.next(), 5);
        assert_eq!(allocator.next(), 6);
    }
}
