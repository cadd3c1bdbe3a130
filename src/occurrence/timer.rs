// Dedicated expiry timer thread for occurrence tracking
//
// Each OccurrenceMonitor owns one of these. Arming replaces whatever deadline
// was pending, so at most one expiry is outstanding at any time. The thread
// reports an expiry by invoking the callback with the generation token the
// deadline was armed with.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Callback run on the timer thread when an armed deadline passes
pub type ExpiryCallback = Box<dyn Fn(u64) + Send + 'static>;

/// Commands sent to the timer thread
pub enum TimerCommand {
    /// Schedule an expiry, replacing any pending one
    Arm { generation: u64, deadline: Instant },
    /// Stop the timer thread without firing
    Shutdown,
}

/// Errors from timer thread operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimerError {
    /// The timer thread could not be started
    #[error("Failed to spawn expiry timer thread: {0}")]
    SpawnFailed(String),
    /// The timer thread has exited
    #[error("Expiry timer thread disconnected")]
    ThreadDisconnected,
}

/// Handle to the expiry timer thread
///
/// Commands are sent via channel to the dedicated thread.
/// When dropped, the thread is shut down and joined.
pub struct ExpiryTimerHandle {
    sender: Sender<TimerCommand>,
    thread: Option<JoinHandle<()>>,
}

impl ExpiryTimerHandle {
    /// Spawn a new timer thread that reports expiries to `on_expire`
    pub fn spawn(on_expire: ExpiryCallback) -> Result<Self, TimerError> {
        let (sender, receiver) = mpsc::channel();

        let thread = thread::Builder::new()
            .name("occurrence-timer".to_string())
            .spawn(move || {
                timer_thread_main(receiver, on_expire);
            })
            .map_err(|e| TimerError::SpawnFailed(e.to_string()))?;

        Ok(Self {
            sender,
            thread: Some(thread),
        })
    }

    /// Arm the timer, superseding any pending deadline
    #[must_use = "this returns a Result that should be handled"]
    pub fn arm(&self, generation: u64, deadline: Instant) -> Result<(), TimerError> {
        self.sender
            .send(TimerCommand::Arm {
                generation,
                deadline,
            })
            .map_err(|_| TimerError::ThreadDisconnected)
    }
}

impl Drop for ExpiryTimerHandle {
    fn drop(&mut self) {
        // Ignore errors if the thread already exited
        let _ = self.sender.send(TimerCommand::Shutdown);

        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Main loop for the timer thread
///
/// Blocks on the channel while idle. With a deadline pending it waits only
/// until that deadline, then fires. Early wakeups are re-checked against the
/// clock so an expiry never fires before its deadline.
fn timer_thread_main(receiver: Receiver<TimerCommand>, on_expire: ExpiryCallback) {
    crate::trace!("[occurrence] Timer thread started");
    let mut pending: Option<(u64, Instant)> = None;

    loop {
        let command = match pending {
            Some((generation, deadline)) => {
                let now = Instant::now();
                if now >= deadline {
                    pending = None;
                    on_expire(generation);
                    continue;
                }
                match receiver.recv_timeout(deadline - now) {
                    Ok(cmd) => cmd,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match receiver.recv() {
                Ok(cmd) => cmd,
                Err(_) => break,
            },
        };

        match command {
            TimerCommand::Arm {
                generation,
                deadline,
            } => {
                pending = Some((generation, deadline));
            }
            TimerCommand::Shutdown => break,
        }
    }
    crate::trace!("[occurrence] Timer thread exiting");
}

#[cfg(test)]
#[path = "timer_test.rs"]
mod tests;
