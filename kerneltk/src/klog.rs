//! Feature-gated diagnostic logging, mirroring the teacher's `klog-itm` /
//! `klog-semihosting` discipline: a macro that expands to real output when a
//! logging feature is enabled, and to nothing at all otherwise, so the
//! instrumentation never costs anything in a production image that doesn't
//! ask for it.

#[cfg(feature = "klog-host")]
macro_rules! klog {
    ($s:expr) => {
        std::eprintln!(concat!("kerneltk: ", $s));
    };
    ($s:expr, $($tt:tt)*) => {
        std::eprintln!(concat!("kerneltk: ", $s), $($tt)*);
    };
}

#[cfg(not(feature = "klog-host"))]
macro_rules! klog {
    ($s:expr) => {};
    ($s:expr, $($tt:tt)*) => {};
}
