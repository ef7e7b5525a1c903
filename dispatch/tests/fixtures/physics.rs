//! Physics wrappers exported with the `<routine>_cap` calling convention.
//!
//! Built into a shared library by the crate's build script and loaded by the
//! native dispatch tests.

use std::ffi::{c_char, c_int};

const ERRMSG_LEN: usize = 128;

unsafe fn report(errmsg: *mut c_char, errflg: *mut c_int, flag: c_int, message: &str) {
    let len = message.len().min(ERRMSG_LEN);
    unsafe {
        std::ptr::copy_nonoverlapping(message.as_ptr(), errmsg.cast::<u8>(), len);
        *errflg = flag;
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn warm_init_cap(_errmsg: *mut c_char, errflg: *mut c_int) {
    unsafe { *errflg = 0 };
}

/// Adds one kelvin to each of the `im` temperatures.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn warm_run_cap(
    im: *const i64,
    t: *mut f64,
    errmsg: *mut c_char,
    errflg: *mut c_int,
) {
    unsafe {
        if *im < 0 {
            report(errmsg, errflg, 1, "negative column count");
            return;
        }
        let t = std::slice::from_raw_parts_mut(t, *im as usize);
        for value in t {
            *value += 1.0;
        }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn warm_finalize_cap(errmsg: *mut c_char, errflg: *mut c_int) {
    unsafe { report(errmsg, errflg, 3, "  state already released") };
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wide_init_cap(_errmsg: *mut c_char, _errflg: *mut c_int) {}

/// Weighted sum `1*a1 + 2*a2 + ... + 6*a6`, so a misordered argument shows up.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wide_run_cap(
    a1: *const i64,
    a2: *const i64,
    a3: *const i64,
    a4: *const i64,
    a5: *const i64,
    a6: *const i64,
    total: *mut i64,
    _errmsg: *mut c_char,
    errflg: *mut c_int,
) {
    unsafe {
        *total = *a1 + 2 * *a2 + 3 * *a3 + 4 * *a4 + 5 * *a5 + 6 * *a6;
        *errflg = 0;
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wide_finalize_cap(_errmsg: *mut c_char, _errflg: *mut c_int) {}
