// Virtual memory end to end: demand paging, protection, fork isolation,
// frame conservation across whole lifecycles.
// BSD 3-Clause License

mod util;

use larch_abi::errno::{EINVAL, ENOMEM};
use larch_abi::syscall_numbers::*;
use larch_abi::wait_status::*;
use larch_kernel::mm::{Access, MapFlags, Prot, PAGE_SIZE};
use larch_kernel::signal::types::{SIGKILL, SIGSEGV};
use larch_kernel::{FaultOutcome, Kernel};
use larch_kernel::process::Pid;

use util::{boot, fork, ptr_of, sys, sys_as};

const ANON: usize = (MapFlags::PRIVATE.bits() | MapFlags::ANONYMOUS.bits()) as usize;
const RW: usize = (Prot::READ.bits() | Prot::WRITE.bits()) as usize;
const RO: usize = Prot::READ.bits() as usize;

fn mmap(k: &mut Kernel, pid: Pid, len: usize, prot: usize) -> usize {
    let base = sys_as(k, pid, SYS_MMAP, [0, len, prot, ANON]);
    assert!(base > 0, "mmap failed: {base}");
    base as usize
}

#[test]
fn pages_appear_one_at_a_time_and_read_zero() {
    let (mut k, init) = boot(32, 4);
    let base = mmap(&mut k, init, 8 * PAGE_SIZE, RW);
    assert_eq!(k.pmm().used_frames(), 0);
    assert_eq!(k.handle_page_fault(init, base + 5 * PAGE_SIZE, Access::Write), FaultOutcome::Resumed);
    assert_eq!(k.pmm().used_frames(), 1);
    let mut buf = [0xFFu8; 16];
    k.read_user(init, base + 5 * PAGE_SIZE + 100, &mut buf).unwrap();
    assert_eq!(buf, [0u8; 16]);
    // Untouched sibling pages still have no frame.
    assert!(!k.process(init).unwrap().aspace.is_mapped(base));
}

#[test]
fn region_boundary_is_exact() {
    let (mut k, init) = boot(32, 4);
    let base = mmap(&mut k, init, 2 * PAGE_SIZE, RW);
    // Last byte of the promise works...
    assert_eq!(
        k.handle_page_fault(init, base + 2 * PAGE_SIZE - 1, Access::Write),
        FaultOutcome::Resumed
    );
    // ...one byte past it is fatal.
    assert_eq!(
        k.handle_page_fault(init, base + 2 * PAGE_SIZE, Access::Write),
        FaultOutcome::Killed
    );
    let status = k.process(init).unwrap().exit_status.unwrap();
    assert!(w_ifsignaled(status));
    assert_eq!(w_termsig(status), SIGSEGV);
}

#[test]
fn write_to_read_only_mapping_kills_with_sigsegv() {
    let (mut k, init) = boot(32, 8);
    let child = fork(&mut k);
    let base = mmap(&mut k, child, PAGE_SIZE, RO);
    // Never faulted in: the protection check still comes first.
    assert_eq!(k.handle_page_fault(child, base, Access::Write), FaultOutcome::Killed);
    let mut status = -1;
    let got = sys_as(&mut k, init, SYS_WAITPID, [child as usize, ptr_of(&mut status), 0, 0]);
    assert_eq!(got, child as isize);
    assert!(w_ifsignaled(status));
    assert_eq!(w_termsig(status), SIGSEGV);
}

#[test]
fn mprotect_is_idempotent_and_split_is_exact() {
    let (mut k, init) = boot(32, 4);
    let base = mmap(&mut k, init, 3 * PAGE_SIZE, RW);
    k.handle_page_fault(init, base + PAGE_SIZE, Access::Write);
    assert_eq!(sys(&mut k, SYS_MPROTECT, [base + PAGE_SIZE, PAGE_SIZE, RO, 0]), 0);
    assert_eq!(sys(&mut k, SYS_MPROTECT, [base + PAGE_SIZE, PAGE_SIZE, RO, 0]), 0);
    // Frame survived both calls; reads fine, writes fatal only there.
    assert_eq!(k.pmm().used_frames(), 1);
    assert_eq!(k.handle_page_fault(init, base, Access::Write), FaultOutcome::Resumed);
    assert_eq!(k.handle_page_fault(init, base + 2 * PAGE_SIZE, Access::Write), FaultOutcome::Resumed);
    assert_eq!(k.handle_page_fault(init, base + PAGE_SIZE, Access::Write), FaultOutcome::Killed);
}

#[test]
fn mprotect_rejects_holes_and_bad_args() {
    let (mut k, init) = boot(32, 4);
    let base = mmap(&mut k, init, 2 * PAGE_SIZE, RW);
    assert_eq!(sys(&mut k, SYS_MUNMAP, [base + PAGE_SIZE, PAGE_SIZE, 0, 0]), 0);
    assert_eq!(sys(&mut k, SYS_MPROTECT, [base, 2 * PAGE_SIZE, RO, 0]), -ENOMEM);
    assert_eq!(sys(&mut k, SYS_MPROTECT, [base + 1, PAGE_SIZE, RO, 0]), -EINVAL);
    assert_eq!(sys(&mut k, SYS_MPROTECT, [base, 0, RO, 0]), -EINVAL);
}

#[test]
fn munmap_middle_leaves_usable_edges() {
    let (mut k, init) = boot(32, 4);
    let base = mmap(&mut k, init, 3 * PAGE_SIZE, RW);
    for i in 0..3 {
        k.handle_page_fault(init, base + i * PAGE_SIZE, Access::Write);
    }
    assert_eq!(sys(&mut k, SYS_MUNMAP, [base + PAGE_SIZE, PAGE_SIZE, 0, 0]), 0);
    assert_eq!(k.pmm().used_frames(), 2);
    assert_eq!(k.handle_page_fault(init, base, Access::Write), FaultOutcome::Resumed);
    assert_eq!(k.handle_page_fault(init, base + 2 * PAGE_SIZE, Access::Write), FaultOutcome::Resumed);
    assert_eq!(k.handle_page_fault(init, base + PAGE_SIZE, Access::Read), FaultOutcome::Killed);
}

#[test]
fn fork_gives_the_child_private_copies() {
    let (mut k, init) = boot(32, 8);
    let base = mmap(&mut k, init, PAGE_SIZE, RW);
    k.handle_page_fault(init, base, Access::Write);
    k.write_user(init, base, b"parent").unwrap();

    let child = fork(&mut k);
    assert_eq!(k.pmm().used_frames(), 2);
    let mut buf = [0u8; 6];
    k.read_user(child, base, &mut buf).unwrap();
    assert_eq!(&buf, b"parent");

    k.write_user(child, base, b"child!").unwrap();
    k.read_user(init, base, &mut buf).unwrap();
    assert_eq!(&buf, b"parent");
}

#[test]
fn fork_fails_cleanly_when_frames_run_out() {
    let (mut k, init) = boot(4, 8);
    let base = mmap(&mut k, init, 3 * PAGE_SIZE, RW);
    for i in 0..3 {
        k.handle_page_fault(init, base + i * PAGE_SIZE, Access::Write);
    }
    // One frame left; the clone needs three.
    assert_eq!(sys_as(&mut k, init, SYS_FORK, [0; 4]), -ENOMEM);
    assert_eq!(k.pmm().used_frames(), 3);
    assert!(!k.process(init).unwrap().is_zombie());
}

#[test]
fn oom_on_a_promised_page_is_a_kill_not_a_hang() {
    let (mut k, init) = boot(2, 8);
    let child = fork(&mut k);
    let base = mmap(&mut k, child, 4 * PAGE_SIZE, RW);
    assert_eq!(k.handle_page_fault(child, base, Access::Write), FaultOutcome::Resumed);
    assert_eq!(k.handle_page_fault(child, base + PAGE_SIZE, Access::Write), FaultOutcome::Resumed);
    // Third fault finds an empty allocator.
    assert_eq!(k.handle_page_fault(child, base + 2 * PAGE_SIZE, Access::Write), FaultOutcome::Killed);
    let mut status = -1;
    sys_as(&mut k, init, SYS_WAITPID, [child as usize, ptr_of(&mut status), 0, 0]);
    assert!(w_ifsignaled(status));
    assert_eq!(w_termsig(status), SIGKILL);
    // Its frames came back.
    assert_eq!(k.pmm().used_frames(), 0);
}

#[test]
fn whole_lifecycle_conserves_frames() {
    let (mut k, init) = boot(16, 8);
    let total = k.pmm().free_frames();
    for round in 0..3 {
        let child = fork(&mut k);
        let base = mmap(&mut k, child, 2 * PAGE_SIZE, RW);
        k.handle_page_fault(child, base, Access::Write);
        k.handle_page_fault(child, base + PAGE_SIZE, Access::Write);
        sys_as(&mut k, child, SYS_EXIT, [round, 0, 0, 0]);
        assert!(sys_as(&mut k, init, SYS_WAIT, [0; 4]) > 0);
        assert_eq!(k.pmm().free_frames(), total);
    }
}
