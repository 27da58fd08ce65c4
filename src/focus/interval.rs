//! Timer-driven autofocus.

use super::AutoFocusController;
use crate::device::FocusDriver;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

struct Worker {
    stop: Arc<(Mutex<bool>, Condvar)>,
    handle: JoinHandle<()>,
}

/// Triggers a focus cycle immediately and then once per interval on a
/// background thread until stopped.
pub struct IntervalAutoFocus {
    driver: Arc<dyn FocusDriver>,
    interval: Duration,
    worker: Option<Worker>,
}

impl IntervalAutoFocus {
    /// Creates a stopped controller.
    pub fn new(driver: Arc<dyn FocusDriver>, interval: Duration) -> Self {
        Self {
            driver,
            interval,
            worker: None,
        }
    }

    /// Whether the worker thread is alive.
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

impl AutoFocusController for IntervalAutoFocus {
    fn start(&mut self) {
        if self.worker.is_some() {
            return;
        }
        let stop = Arc::new((Mutex::new(false), Condvar::new()));
        let driver = Arc::clone(&self.driver);
        let interval = self.interval;
        let signal = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            let (flag, condvar) = &*signal;
            loop {
                if let Err(e) = driver.trigger_focus() {
                    tracing::warn!(error = %e, "Unexpected exception while focusing");
                }
                let stopped = flag.lock().unwrap_or_else(PoisonError::into_inner);
                let (stopped, _) = condvar
                    .wait_timeout_while(stopped, interval, |stopped| !*stopped)
                    .unwrap_or_else(PoisonError::into_inner);
                if *stopped {
                    break;
                }
            }
            tracing::trace!("Auto-focus worker exited");
        });

        self.worker = Some(Worker { stop, handle });
        tracing::debug!(interval_ms = self.interval.as_millis() as u64, "Auto-focus started");
    }

    fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        {
            let (flag, condvar) = &*worker.stop;
            *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
            condvar.notify_all();
        }
        if worker.handle.join().is_err() {
            tracing::warn!("Auto-focus worker panicked");
        }
        tracing::debug!("Auto-focus stopped");
    }
}

impl Drop for IntervalAutoFocus {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingDriver {
        triggers: AtomicU32,
    }

    impl FocusDriver for CountingDriver {
        fn trigger_focus(&self) -> Result<(), DeviceError> {
            self.triggers.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_triggers_until_stopped() {
        let driver = Arc::new(CountingDriver::default());
        let mut focus = IntervalAutoFocus::new(driver.clone(), Duration::from_millis(5));

        focus.start();
        assert!(focus.is_running());
        thread::sleep(Duration::from_millis(50));
        focus.stop();
        assert!(!focus.is_running());

        let after_stop = driver.triggers.load(Ordering::SeqCst);
        assert!(after_stop >= 1);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(driver.triggers.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_stop_wakes_long_interval() {
        let driver = Arc::new(CountingDriver::default());
        let mut focus = IntervalAutoFocus::new(driver.clone(), Duration::from_secs(3600));
        focus.start();
        // Returns promptly despite the hour-long interval.
        focus.stop();
        focus.stop();
        assert!(driver.triggers.load(Ordering::SeqCst) <= 1);
    }
}
