use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

/// Wake-up posted by an armed timer. Only the tick carrying the current
/// arm token can settle the debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceTick(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum DebounceState<T> {
    Idle,
    Pending { value: T, deadline: Instant },
}

/// Trailing-edge debouncer with a sliding deadline.
///
/// Every `notify` pushes the deadline to `now + window`. The timer does not
/// call back into the debouncer: it posts a [`DebounceTick`] on `wake`, and
/// the owner hands that tick to [`RangeDebouncer::fire`], which yields the
/// settled value. This keeps all state on the owning task.
pub struct RangeDebouncer<T, M> {
    window: Duration,
    state: DebounceState<T>,
    token: u64,
    timer: Option<JoinHandle<()>>,
    wake: UnboundedSender<M>,
}

impl<T, M> RangeDebouncer<T, M>
where
    M: From<DebounceTick> + Send + 'static,
{
    pub fn new(window: Duration, wake: UnboundedSender<M>) -> Self {
        Self {
            window,
            state: DebounceState::Idle,
            token: 0,
            timer: None,
            wake,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn state(&self) -> &DebounceState<T> {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, DebounceState::Pending { .. })
    }

    /// Records `value` as the latest signal and re-arms the timer.
    /// Must be called from within a tokio runtime.
    pub fn notify(&mut self, value: T) {
        let deadline = Instant::now() + self.window;
        self.state = DebounceState::Pending { value, deadline };
        self.arm(deadline);
    }

    /// Drops any pending value without emitting it.
    pub fn cancel(&mut self) {
        self.disarm();
        self.state = DebounceState::Idle;
    }

    /// Emits the pending value now instead of waiting out the window.
    pub fn flush(&mut self) -> Option<T> {
        self.disarm();
        match std::mem::replace(&mut self.state, DebounceState::Idle) {
            DebounceState::Pending { value, .. } => Some(value),
            DebounceState::Idle => None,
        }
    }

    /// Settles the debouncer if `tick` belongs to the current arm and the
    /// deadline has passed. Ticks from superseded arms return `None`.
    pub fn fire(&mut self, tick: DebounceTick) -> Option<T> {
        if tick.0 != self.token {
            return None;
        }
        match &self.state {
            DebounceState::Pending { deadline, .. } if Instant::now() >= *deadline => {}
            _ => return None,
        }
        self.timer = None;
        match std::mem::replace(&mut self.state, DebounceState::Idle) {
            DebounceState::Pending { value, .. } => Some(value),
            DebounceState::Idle => None,
        }
    }

    fn arm(&mut self, deadline: Instant) {
        self.disarm();
        let token = self.token;
        let wake = self.wake.clone();
        self.timer = Some(tokio::spawn(async move {
            sleep_until(deadline).await;
            let _ = wake.send(DebounceTick(token).into());
        }));
    }

    fn disarm(&mut self) {
        // bump first so a tick already queued by the old timer is ignored
        self.token = self.token.wrapping_add(1);
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl<T, M> Drop for RangeDebouncer<T, M> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
