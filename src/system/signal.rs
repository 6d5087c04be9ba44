//! Process signal handling: SIGINT/SIGTERM request a runtime stop.
//!
//! The handler only touches a static atomic flag, which keeps it
//! async-signal-safe; every shard polls the flag once per tick.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, Ordering};

// Layer 2: Third-party crate imports
// (none here; nix is used in the unix-only block below)

// Layer 3: Internal module imports
use super::errors::SystemError;

static SIGNAL_STOP: AtomicBool = AtomicBool::new(false);

/// True once a stop-requesting signal has been received.
pub(crate) fn stop_requested() -> bool {
    SIGNAL_STOP.load(Ordering::Relaxed)
}

/// Clear a stale flag before a fresh start.
pub(crate) fn reset() {
    SIGNAL_STOP.store(false, Ordering::Relaxed);
}

#[cfg(unix)]
pub(crate) fn install() -> Result<(), SystemError> {
    use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

    extern "C" fn on_signal(_sig: i32) {
        SIGNAL_STOP.store(true, Ordering::Relaxed);
    }

    let action = SigAction::new(
        SigHandler::Handler(on_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for sig in [Signal::SIGINT, Signal::SIGTERM] {
        unsafe { signal::sigaction(sig, &action) }
            .map_err(|e| SystemError::SignalInstall(e.to_string()))?;
    }
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn install() -> Result<(), SystemError> {
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_reset() {
        SIGNAL_STOP.store(true, Ordering::Relaxed);
        assert!(stop_requested());
        reset();
        assert!(!stop_requested());
    }
}
