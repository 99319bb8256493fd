//! Coalescing of render requests to at most one per animation frame.

/// Frame throttle over owned call arguments.
///
/// [`request`](Self::request) schedules a frame with its arguments if none
/// is pending; later requests within the same frame are dropped. The host
/// pumps frames with [`take_frame`](Self::take_frame). In trailing mode a request that arrives
/// while a frame is pending is guaranteed a frame of its own, so the last
/// state is always painted.
#[derive(Debug, Clone)]
pub struct FrameThrottle<T> {
    trailing: bool,
    scheduled: Option<T>,
    trailing_args: Option<T>,
    last_args: Option<T>,
}

impl<T: Clone> FrameThrottle<T> {
    pub fn new(trailing: bool) -> Self {
        Self {
            trailing,
            scheduled: None,
            trailing_args: None,
            last_args: None,
        }
    }

    pub fn request(&mut self, args: T) {
        self.last_args = Some(args.clone());
        if self.scheduled.is_none() {
            self.scheduled = Some(args);
        } else if self.trailing {
            self.trailing_args = Some(args);
        }
    }

    /// Run the pending frame: returns the arguments to render with, if any.
    /// A trailing request is rescheduled for the next frame.
    pub fn take_frame(&mut self) -> Option<T> {
        let args = self.scheduled.take()?;
        self.last_args = None;
        if let Some(next) = self.trailing_args.take() {
            self.last_args = Some(next.clone());
            self.scheduled = Some(next);
        }
        Some(args)
    }

    /// Cancel the pending frame and return the latest arguments to run now.
    pub fn flush(&mut self) -> Option<T> {
        self.scheduled = None;
        let last = self.last_args.take()?;
        Some(self.trailing_args.take().unwrap_or(last))
    }

    /// Drop all pending work.
    pub fn cancel(&mut self) {
        self.scheduled = None;
        self.trailing_args = None;
        self.last_args = None;
    }

    pub fn is_pending(&self) -> bool {
        self.scheduled.is_some()
    }
}
