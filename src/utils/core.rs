//! Picking and pinning the CPU core of a control loop thread.
pub use core_affinity::CoreId;

/// Returns the cores the current process may run on. Empty if the platform does not report them.
pub fn available_cores() -> Vec<CoreId> {
    core_affinity::get_core_ids().unwrap_or_default()
}

/// Returns the core suggested for a control loop: the last reported one.
/// Core 0 usually serves most interrupts, so the last core sees the least jitter.
pub fn control_core() -> Option<CoreId> {
    available_cores().pop()
}

/// Pins the current thread to `core`. Returns `false` if the OS refused.
pub fn pin_current(core: CoreId) -> bool {
    core_affinity::set_for_current(core)
}
