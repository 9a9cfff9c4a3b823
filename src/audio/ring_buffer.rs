/// `audio/ring_buffer.rs` — fixed-capacity telemetry ring shared between the
/// audio thread (single writer) and the control thread (reader).
///
/// Writes never block and never allocate. When the ring is full the oldest
/// element is evicted before the new one is stored. Reads are snapshots: they
/// copy every stored element out, oldest first, without consuming anything.
///
/// Storage is published through a sequence counter (seqlock). The writer
/// makes the counter odd while it mutates the slots and even again when it is
/// done; a reader copies the slots out and keeps the copy only if the counter
/// was even and unchanged across the copy. The writer therefore never waits
/// on the reader, and the reader only ever sees fully written state.
///
/// Clearing is two-phase: `clear()` only raises a flag. Reads return nothing
/// while the flag is up, and the writer performs the physical reset at the
/// start of its next `add()`.

use std::{
    cell::UnsafeCell,
    mem::MaybeUninit,
    ptr,
    sync::atomic::{fence, AtomicBool, AtomicUsize, Ordering},
};

#[derive(Clone, Copy)]
struct Slots<T: Copy, const N: usize> {
    items: [T; N],
    /// Index of the oldest stored element.
    read: usize,
    len: usize,
}

pub struct RingBuffer<T: Copy + Default, const N: usize> {
    seq: AtomicUsize,
    clear_flag: AtomicBool,
    slots: UnsafeCell<Slots<T, N>>,
}

// SAFETY: every access to `slots` is published through `seq`. Writers take
// exclusive ownership by moving `seq` to an odd value with a CAS, readers
// only ever copy the bytes out and discard the copy unless `seq` was stable.
unsafe impl<T: Copy + Default + Send, const N: usize> Sync for RingBuffer<T, N> {}

impl<T: Copy + Default, const N: usize> RingBuffer<T, N> {
    pub fn new() -> Self {
        assert!(N > 0, "RingBuffer capacity must be non-zero");
        Self {
            seq: AtomicUsize::new(0),
            clear_flag: AtomicBool::new(false),
            slots: UnsafeCell::new(Slots {
                items: [T::default(); N],
                read: 0,
                len: 0,
            }),
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Append `value`, evicting the oldest element if the ring is full.
    ///
    /// Must only be called from the writer thread. A second writer racing
    /// the first has its value dropped instead of corrupting the ring.
    pub fn add(&self, value: T) {
        let start = self.seq.load(Ordering::Relaxed);
        if start & 1 == 1
            || self
                .seq
                .compare_exchange(start, start.wrapping_add(1), Ordering::Acquire, Ordering::Relaxed)
                .is_err()
        {
            debug_assert!(false, "RingBuffer::add called from two writers at once");
            return;
        }
        fence(Ordering::Release);

        let slots = self.slots.get();
        // SAFETY: the odd sequence value above makes this the only thread
        // mutating `slots`. Concurrent readers copy through a raw pointer
        // and throw the copy away because the sequence changes under them;
        // see `read` for the caveat about that overlapping copy.
        unsafe {
            if self.clear_flag.swap(false, Ordering::AcqRel) {
                (*slots).items = [T::default(); N];
                (*slots).read = 0;
                (*slots).len = 0;
            }

            if (*slots).len == N {
                (*slots).read = ((*slots).read + 1) % N;
                (*slots).len -= 1;
            }

            let write = ((*slots).read + (*slots).len) % N;
            (*slots).items[write] = value;
            (*slots).len += 1;
        }

        self.seq.store(start.wrapping_add(2), Ordering::Release);
    }

    /// Snapshot of every stored element, oldest first.
    ///
    /// Returns an empty vector while a clear request is pending.
    pub fn read(&self) -> Vec<T> {
        let mut spins = 0u32;
        loop {
            if self.clear_flag.load(Ordering::Acquire) {
                return Vec::new();
            }

            let before = self.seq.load(Ordering::Acquire);
            if before & 1 == 0 {
                // SAFETY: the copy is made into `MaybeUninit` so a torn read is
                // never interpreted; it is only assumed valid after the
                // sequence check below proves no write overlapped it.
                // Caveat: this volatile read can overlap the writer's plain
                // stores, which the Rust memory model formally calls a data
                // race. It is the standard seqlock trade-off (as in
                // crossbeam's `AtomicCell` fallback); `T: Copy` with no drop
                // glue and the discarded torn copy keep it from being observed.
                let copy = unsafe {
                    ptr::read_volatile(self.slots.get() as *const MaybeUninit<Slots<T, N>>)
                };
                fence(Ordering::Acquire);
                if self.seq.load(Ordering::Relaxed) == before {
                    let slots = unsafe { copy.assume_init() };
                    return (0..slots.len)
                        .map(|i| slots.items[(slots.read + i) % N])
                        .collect();
                }
            }

            spins += 1;
            if spins < 64 {
                std::hint::spin_loop();
            } else {
                std::thread::yield_now();
            }
        }
    }

    /// Request a reset. Takes effect on the writer's next `add()`.
    pub fn clear(&self) {
        self.clear_flag.store(true, Ordering::Release);
    }

    pub fn is_clear_pending(&self) -> bool {
        self.clear_flag.load(Ordering::Acquire)
    }
}

impl<T: Copy + Default, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
