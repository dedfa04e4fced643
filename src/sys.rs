use libc::{c_int, c_long, syscall, time_t, timespec, SYS_futex};
use std::sync::atomic::AtomicU32;
use std::time::Duration;
use std::{io, ptr};

const FUTEX_WAIT: c_int = 0;
const FUTEX_WAKE: c_int = 1;
const FUTEX_PRIVATE_FLAG: c_int = 128;

#[inline(always)]
unsafe fn do_futex(uaddr: *mut u32, futex_op: c_int, val: u32, timeout: *const timespec) -> c_long {
    syscall(SYS_futex, uaddr, futex_op | FUTEX_PRIVATE_FLAG, val, timeout, ptr::null_mut::<u32>(), 0)
}

/// Sleeps while `futex` still holds `val`.
///
/// `timeout` is relative. Callers must treat every return as a possible
/// spurious wakeup: `WouldBlock`, `Interrupted` and `TimedOut` all come back
/// as errors.
#[inline(never)]
pub fn futex_wait(futex: &AtomicU32, val: u32, timeout: Option<Duration>) -> io::Result<()> {
    let ts = timeout.map(|d| timespec {
        tv_sec: d.as_secs().min(time_t::MAX as u64) as time_t,
        tv_nsec: d.subsec_nanos() as c_long,
    });
    let ts_ptr = ts.as_ref().map_or(ptr::null(), |ts| ts as *const timespec);
    let ret = unsafe { do_futex(futex.as_ptr(), FUTEX_WAIT, val, ts_ptr) };
    match ret {
        0 => Ok(()),
        -1 => Err(io::Error::last_os_error()),
        _ => unreachable!(),
    }
}

/// Wakes up to `count` threads sleeping on `futex`, returning how many woke.
#[inline(never)]
pub fn futex_wake(futex: &AtomicU32, count: i32) -> io::Result<i32> {
    let ret = unsafe { do_futex(futex.as_ptr(), FUTEX_WAKE, count as u32, ptr::null()) };
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret as i32)
    }
}
