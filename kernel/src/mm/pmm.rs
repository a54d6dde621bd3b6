// Physical Memory Manager - Bitmap Frame Allocator
// BSD 3-Clause License
//
// Frames are arena slots addressed by index handle. A frame is either free
// (bit clear) or referenced by exactly one page-table entry; the bitmap is
// the authority for that invariant and double frees are detected here.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::error::Error;

/// Fixed physical page size.
pub const PAGE_SIZE: usize = 4096;

/// Index handle for one physical frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Frame(pub usize);

/// A contiguous run of physical frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    pub start: usize,
    pub count: usize,
}

impl FrameRange {
    pub fn frames(&self) -> impl Iterator<Item = Frame> + '_ {
        (self.start..self.start + self.count).map(Frame)
    }
}

static ZERO_PAGE: [u8; PAGE_SIZE] = [0; PAGE_SIZE];

/// Bitmap frame allocator with a rotating next-fit hint, so the common
/// single-frame path taken by the page-fault handler does not rescan the
/// whole map. Frame contents live in the same arena; they persist across
/// free/reallocate so that lazy zeroing stays an observable contract of
/// the fault path, not an accident of allocation.
pub struct FrameAllocator {
    bitmap: Vec<u64>,
    contents: Vec<Option<Box<[u8; PAGE_SIZE]>>>,
    next: usize,
    total: usize,
    free: usize,
}

impl FrameAllocator {
    #[must_use]
    pub fn new(total_frames: usize) -> Self {
        let words = total_frames.div_ceil(64);
        Self {
            bitmap: alloc::vec![0; words],
            contents: (0..total_frames).map(|_| None).collect(),
            next: 0,
            total: total_frames,
            free: total_frames,
        }
    }

    #[must_use]
    pub fn total_frames(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn free_frames(&self) -> usize {
        self.free
    }

    #[must_use]
    pub fn used_frames(&self) -> usize {
        self.total - self.free
    }

    #[inline]
    fn is_free(&self, frame: usize) -> bool {
        self.bitmap[frame / 64] & (1 << (frame % 64)) == 0
    }

    #[inline]
    fn mark_used(&mut self, frame: usize) {
        self.bitmap[frame / 64] |= 1 << (frame % 64);
    }

    #[inline]
    fn mark_free(&mut self, frame: usize) {
        self.bitmap[frame / 64] &= !(1 << (frame % 64));
    }

    /// Allocate one frame. Returns `None` when physical memory is
    /// exhausted; the caller propagates that condition, never panics.
    pub fn allocate_one(&mut self) -> Option<Frame> {
        self.allocate(1).map(|r| Frame(r.start))
    }

    /// Allocate `count` contiguous frames, scanning from the next-fit
    /// hint and wrapping once.
    pub fn allocate(&mut self, count: usize) -> Option<FrameRange> {
        if count == 0 || count > self.free {
            return None;
        }
        if let Some(start) = self.scan(self.next, self.total, count) {
            return Some(self.take(start, count));
        }
        // A run straddling the hint is only visible from the start.
        if let Some(start) = self.scan(0, self.total, count) {
            return Some(self.take(start, count));
        }
        None
    }

    fn scan(&self, from: usize, to: usize, count: usize) -> Option<usize> {
        let mut run = 0;
        for i in from..to {
            if self.is_free(i) {
                run += 1;
                if run == count {
                    return Some(i + 1 - count);
                }
            } else {
                run = 0;
            }
        }
        None
    }

    fn take(&mut self, start: usize, count: usize) -> FrameRange {
        for i in start..start + count {
            self.mark_used(i);
        }
        self.free -= count;
        self.next = (start + count) % self.total.max(1);
        FrameRange { start, count }
    }

    /// Return one frame to the free set.
    pub fn free_one(&mut self, frame: Frame) -> Result<(), Error> {
        self.free(FrameRange { start: frame.0, count: 1 })
    }

    /// Return a frame range to the free set. Freeing a frame that is not
    /// allocated is a programming-error-class condition: it is reported
    /// and nothing is mutated.
    pub fn free(&mut self, range: FrameRange) -> Result<(), Error> {
        let end = range.start.checked_add(range.count).ok_or(Error::InvalidArgument)?;
        if range.count == 0 || end > self.total {
            return Err(Error::InvalidArgument);
        }
        for i in range.start..end {
            if self.is_free(i) {
                log::error!("pmm: double free of frame {i}");
                return Err(Error::FrameNotAllocated);
            }
        }
        for i in range.start..end {
            self.mark_free(i);
        }
        self.free += range.count;
        Ok(())
    }

    /// Contents of an allocated frame. Frames never written read as zero.
    #[must_use]
    pub fn frame_data(&self, frame: Frame) -> &[u8; PAGE_SIZE] {
        self.contents[frame.0].as_deref().unwrap_or(&ZERO_PAGE)
    }

    /// Writable contents of an allocated frame.
    pub fn frame_data_mut(&mut self, frame: Frame) -> &mut [u8; PAGE_SIZE] {
        debug_assert!(!self.is_free(frame.0), "write to a free frame");
        self.contents[frame.0].get_or_insert_with(|| Box::new([0; PAGE_SIZE]))
    }

    /// Copy the contents of one frame into another (fork support).
    pub fn copy_frame(&mut self, src: Frame, dst: Frame) {
        let buf = *self.frame_data(src);
        *self.frame_data_mut(dst) = buf;
    }
}
