//! Forwards a terminating signal to the currently running subprocess
//! (spec.md §5, "Cancellation and timeouts"). The child is placed in its
//! own process group so it does not receive the terminal's SIGINT directly;
//! instead this process catches the signal and relays it to the child,
//! giving the child a chance to exit cleanly before `Command::wait` returns.

#[cfg(unix)]
mod unix {
    use std::process::Child;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    /// Registers SIGINT/SIGTERM handlers that set a shared flag, then polls
    /// that flag for the lifetime of `child` and forwards whichever signal
    /// arrived first. Returns the child's exit status once it terminates.
    pub fn wait_with_forwarding(mut child: Child) -> std::io::Result<std::process::ExitStatus> {
        let interrupted = Arc::new(AtomicBool::new(false));
        let terminated = Arc::new(AtomicBool::new(false));

        // signal_hook::flag::register only fails if the signal number is
        // invalid or a handler is already installed for it; neither can
        // happen here, so a failed registration just means signals are not
        // forwarded rather than aborting the run.
        let _ = signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&interrupted));
        let _ = signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&terminated));

        let pid = Pid::from_raw(child.id() as i32);
        let mut forwarded = false;

        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if !forwarded && (interrupted.load(Ordering::Relaxed) || terminated.load(Ordering::Relaxed)) {
                let sig = if interrupted.load(Ordering::Relaxed) {
                    Signal::SIGINT
                } else {
                    Signal::SIGTERM
                };
                let _ = signal::kill(pid, sig);
                forwarded = true;
            }
            std::thread::sleep(std::time::Duration::from_millis(25));
        }
    }

    /// Puts the spawned child in its own process group so a SIGINT sent to
    /// the foreground process group (e.g. Ctrl-C in the controlling
    /// terminal) does not also reach it directly; this process forwards the
    /// signal explicitly via [`wait_with_forwarding`] instead.
    pub fn isolate_process_group(cmd: &mut std::process::Command) {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
}

#[cfg(unix)]
pub use unix::{isolate_process_group, wait_with_forwarding};

#[cfg(not(unix))]
mod fallback {
    pub fn isolate_process_group(_cmd: &mut std::process::Command) {}

    pub fn wait_with_forwarding(mut child: std::process::Child) -> std::io::Result<std::process::ExitStatus> {
        child.wait()
    }
}

#[cfg(not(unix))]
pub use fallback::{isolate_process_group, wait_with_forwarding};
