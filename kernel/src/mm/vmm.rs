// Virtual Memory Manager - per-process address spaces with demand paging.
// BSD 3-Clause License
//
// An address space is a sorted list of regions (the promises) plus a map of
// pages that actually hold a frame (the fulfilled subset). mmap only makes
// promises; frames appear one page at a time in the fault handler.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;

use bitflags::bitflags;

use super::pmm::{Frame, FrameAllocator, PAGE_SIZE};
use crate::error::Error;

/// Lowest user page kept unmapped so null dereferences always fault.
const NULL_GUARD_PAGES: usize = 1;

/// One page past the top of the user address span (x86-64 lower half).
const USER_SPAN_PAGES: usize = 0x0000_8000_0000_0000 / PAGE_SIZE;

/// First page probed when mmap is given no usable address hint.
const MMAP_BASE_PAGE: usize = 0x2000_0000 / PAGE_SIZE;

bitflags! {
    /// Page protection bits, combinable.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Prot: u32 {
        const READ  = 1 << 0;
        const WRITE = 1 << 1;
        const EXEC  = 1 << 2;
    }
}

bitflags! {
    /// mmap placement flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MapFlags: u32 {
        const PRIVATE   = 1 << 0;
        const ANONYMOUS = 1 << 1;
        const FIXED     = 1 << 2;
    }
}

/// What kind of memory access took the fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    Execute,
}

/// Why a fault could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultError {
    /// The address lies in no region: a stray pointer.
    NoRegion,
    /// The region exists but forbids this access kind.
    Protection,
    /// The promise was valid but no frame could be found to keep it.
    OutOfMemory,
}

/// Where a page's initial contents come from when it is first faulted in.
#[derive(Clone)]
pub enum Backing {
    /// Zero-filled on first touch.
    Anonymous,
    /// Bytes copied from a file image at `offset` plus the page's distance
    /// into the region; the tail past the image reads as zero.
    Bytes { data: Arc<[u8]>, offset: usize },
}

/// A contiguous span of promised pages with uniform protection.
#[derive(Clone)]
pub struct Region {
    start: usize,
    pages: usize,
    prot: Prot,
    backing: Backing,
}

impl Region {
    #[inline]
    fn end(&self) -> usize {
        self.start + self.pages
    }

    #[inline]
    fn contains(&self, page: usize) -> bool {
        page >= self.start && page < self.end()
    }

    /// Backing for a suffix of this region starting `skip` pages in.
    fn backing_from(&self, skip: usize) -> Backing {
        match &self.backing {
            Backing::Anonymous => Backing::Anonymous,
            Backing::Bytes { data, offset } => Backing::Bytes {
                data: data.clone(),
                offset: offset + skip * PAGE_SIZE,
            },
        }
    }

    #[must_use]
    pub fn start_addr(&self) -> usize {
        self.start * PAGE_SIZE
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages
    }

    #[must_use]
    pub fn prot(&self) -> Prot {
        self.prot
    }
}

/// One process's virtual address space.
pub struct AddressSpace {
    /// Regions sorted by start page, non-overlapping.
    regions: Vec<Region>,
    /// Pages that hold a frame. Always a subset of the region set.
    mapped: BTreeMap<usize, Frame>,
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressSpace {
    #[must_use]
    pub fn new() -> Self {
        Self { regions: Vec::new(), mapped: BTreeMap::new() }
    }

    // ==== Mapping ====

    /// Establish a new region. No frames are allocated here; success means
    /// only that the span is reserved and faults inside it will be honored.
    /// Returns the chosen base address.
    pub fn map_region(
        &mut self,
        addr: usize,
        length: usize,
        prot: Prot,
        flags: MapFlags,
        backing: Backing,
    ) -> Result<usize, Error> {
        if length == 0 {
            return Err(Error::InvalidArgument);
        }
        let pages = length.div_ceil(PAGE_SIZE);
        let start = if flags.contains(MapFlags::FIXED) {
            if addr % PAGE_SIZE != 0 {
                return Err(Error::InvalidArgument);
            }
            let page = addr / PAGE_SIZE;
            if !self.range_is_free(page, pages) {
                return Err(Error::InvalidArgument);
            }
            page
        } else {
            let hinted = addr / PAGE_SIZE;
            if addr != 0 && self.range_is_free(hinted, pages) {
                hinted
            } else {
                self.find_gap(pages).ok_or(Error::OutOfMemory)?
            }
        };
        let idx = self.regions.partition_point(|r| r.start < start);
        self.regions.insert(idx, Region { start, pages, prot, backing });
        Ok(start * PAGE_SIZE)
    }

    fn range_is_free(&self, page: usize, pages: usize) -> bool {
        let Some(end) = page.checked_add(pages) else { return false };
        if page < NULL_GUARD_PAGES || end > USER_SPAN_PAGES {
            return false;
        }
        self.regions.iter().all(|r| end <= r.start || page >= r.end())
    }

    fn find_gap(&self, pages: usize) -> Option<usize> {
        let mut candidate = MMAP_BASE_PAGE;
        for r in &self.regions {
            if r.end() <= candidate {
                continue;
            }
            if r.start >= candidate + pages {
                break;
            }
            candidate = r.end();
        }
        (candidate + pages <= USER_SPAN_PAGES).then_some(candidate)
    }

    /// Drop the promise for `[addr, addr+length)` and release any frames
    /// already faulted into it. Regions straddling an edge are split; spans
    /// with nothing mapped unmap successfully as a no-op.
    pub fn unmap(
        &mut self,
        frames: &mut FrameAllocator,
        addr: usize,
        length: usize,
    ) -> Result<(), Error> {
        let (first, last) = span_pages(addr, length)?;

        let doomed: Vec<usize> = self.mapped.range(first..last).map(|(&p, _)| p).collect();
        for page in doomed {
            if let Some(frame) = self.mapped.remove(&page) {
                frames.free_one(frame)?;
            }
        }

        let mut rebuilt = Vec::with_capacity(self.regions.len() + 1);
        for r in self.regions.drain(..) {
            if r.end() <= first || r.start >= last {
                rebuilt.push(r);
                continue;
            }
            if r.start < first {
                rebuilt.push(Region {
                    start: r.start,
                    pages: first - r.start,
                    prot: r.prot,
                    backing: r.backing_from(0),
                });
            }
            if r.end() > last {
                rebuilt.push(Region {
                    start: last,
                    pages: r.end() - last,
                    prot: r.prot,
                    backing: r.backing_from(last - r.start),
                });
            }
        }
        self.regions = rebuilt;
        Ok(())
    }

    /// Change protection on `[addr, addr+length)`. The whole span must be
    /// covered by existing regions. Frames are untouched, so re-applying
    /// the current protection is a no-op and tightening never unmaps.
    pub fn protect(&mut self, addr: usize, length: usize, prot: Prot) -> Result<(), Error> {
        let (first, last) = span_pages(addr, length)?;
        if !self.range_is_covered(first, last) {
            return Err(Error::OutOfMemory);
        }

        let mut rebuilt = Vec::with_capacity(self.regions.len() + 2);
        for r in self.regions.drain(..) {
            if r.end() <= first || r.start >= last {
                rebuilt.push(r);
                continue;
            }
            let mid_start = r.start.max(first);
            let mid_end = r.end().min(last);
            if r.start < mid_start {
                rebuilt.push(Region {
                    start: r.start,
                    pages: mid_start - r.start,
                    prot: r.prot,
                    backing: r.backing_from(0),
                });
            }
            rebuilt.push(Region {
                start: mid_start,
                pages: mid_end - mid_start,
                prot,
                backing: r.backing_from(mid_start - r.start),
            });
            if mid_end < r.end() {
                rebuilt.push(Region {
                    start: mid_end,
                    pages: r.end() - mid_end,
                    prot: r.prot,
                    backing: r.backing_from(mid_end - r.start),
                });
            }
        }
        self.regions = rebuilt;
        Ok(())
    }

    fn range_is_covered(&self, first: usize, last: usize) -> bool {
        let mut cursor = first;
        for r in &self.regions {
            if r.end() <= cursor {
                continue;
            }
            if r.start > cursor {
                return false;
            }
            cursor = r.end();
            if cursor >= last {
                return true;
            }
        }
        cursor >= last
    }

    // ==== Faulting ====

    /// Resolve a page fault at `addr`. On success the page holds a frame
    /// and the instruction can be retried; protection is checked before
    /// presence, so a write into a read-only promise is fatal even when
    /// the page was never faulted in.
    pub fn resolve_fault(
        &mut self,
        frames: &mut FrameAllocator,
        addr: usize,
        access: Access,
    ) -> Result<(), FaultError> {
        let page = addr / PAGE_SIZE;
        let region = self
            .regions
            .iter()
            .find(|r| r.contains(page))
            .ok_or(FaultError::NoRegion)?;

        let needed = match access {
            Access::Read => Prot::READ,
            Access::Write => Prot::WRITE,
            Access::Execute => Prot::EXEC,
        };
        if !region.prot.contains(needed) {
            return Err(FaultError::Protection);
        }

        if self.mapped.contains_key(&page) {
            // Spurious: raced with an earlier resolution. Just retry.
            return Ok(());
        }

        let frame = frames.allocate_one().ok_or(FaultError::OutOfMemory)?;
        let buf = frames.frame_data_mut(frame);
        match &region.backing {
            Backing::Anonymous => buf.fill(0),
            Backing::Bytes { data, offset } => {
                // A page entirely past the backing tail is pure zero fill.
                let from = (offset + (page - region.start) * PAGE_SIZE).min(data.len());
                let avail = (data.len() - from).min(PAGE_SIZE);
                buf[..avail].copy_from_slice(&data[from..from + avail]);
                buf[avail..].fill(0);
            }
        }
        self.mapped.insert(page, frame);
        log::trace!("vmm: faulted page {page:#x} ({access:?})");
        Ok(())
    }

    // ==== Lifecycle ====

    /// Duplicate this space for fork: same promises, private copies of
    /// every fulfilled page. On frame exhaustion everything allocated so
    /// far is handed back and `None` is returned, leaving the parent and
    /// the allocator exactly as they were.
    pub fn clone_into(&self, frames: &mut FrameAllocator) -> Option<AddressSpace> {
        let mut mapped = BTreeMap::new();
        for (&page, &src) in &self.mapped {
            let Some(dst) = frames.allocate_one() else {
                for frame in mapped.into_values() {
                    let _ = frames.free_one(frame);
                }
                return None;
            };
            frames.copy_frame(src, dst);
            mapped.insert(page, dst);
        }
        Some(AddressSpace { regions: self.regions.clone(), mapped })
    }

    /// Release every frame and forget all regions (exit and exec paths).
    pub fn release_all(&mut self, frames: &mut FrameAllocator) {
        while let Some((page, frame)) = self.mapped.pop_first() {
            if frames.free_one(frame).is_err() {
                log::error!("vmm: page {page:#x} held an unallocated frame");
            }
        }
        self.regions.clear();
    }

    // ==== Kernel-side access ====

    /// Copy bytes out of fulfilled pages. Touching a page that has no
    /// frame yet is a kernel-side fault, not an implicit fill.
    pub fn read(
        &self,
        frames: &FrameAllocator,
        addr: usize,
        buf: &mut [u8],
    ) -> Result<(), Error> {
        let mut at = addr;
        for b in buf.iter_mut() {
            let frame = *self.mapped.get(&(at / PAGE_SIZE)).ok_or(Error::BadAddress)?;
            *b = frames.frame_data(frame)[at % PAGE_SIZE];
            at += 1;
        }
        Ok(())
    }

    /// Copy bytes into fulfilled pages.
    pub fn write(
        &self,
        frames: &mut FrameAllocator,
        addr: usize,
        bytes: &[u8],
    ) -> Result<(), Error> {
        let mut at = addr;
        for &b in bytes {
            let frame = *self.mapped.get(&(at / PAGE_SIZE)).ok_or(Error::BadAddress)?;
            frames.frame_data_mut(frame)[at % PAGE_SIZE] = b;
            at += 1;
        }
        Ok(())
    }

    #[must_use]
    pub fn is_mapped(&self, addr: usize) -> bool {
        self.mapped.contains_key(&(addr / PAGE_SIZE))
    }

    #[must_use]
    pub fn mapped_pages(&self) -> usize {
        self.mapped.len()
    }

    /// Protection of the region containing `addr`, if any.
    #[must_use]
    pub fn prot_at(&self, addr: usize) -> Option<Prot> {
        let page = addr / PAGE_SIZE;
        self.regions.iter().find(|r| r.contains(page)).map(|r| r.prot)
    }

    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }
}

fn span_pages(addr: usize, length: usize) -> Result<(usize, usize), Error> {
    if addr % PAGE_SIZE != 0 || length == 0 {
        return Err(Error::InvalidArgument);
    }
    let first = addr / PAGE_SIZE;
    let last = first
        .checked_add(length.div_ceil(PAGE_SIZE))
        .filter(|&l| l <= USER_SPAN_PAGES)
        .ok_or(Error::InvalidArgument)?;
    Ok((first, last))
}
