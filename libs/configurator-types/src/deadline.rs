//! The ambient deadline/cancellation carrier threaded through every operation.

use std::time::{Duration, Instant};

use crate::error::{ConfiguratorError, ErrorKind};

/// An optional point in time after which an in-flight operation must stop and report
/// [`ErrorKind::DeadlineExceeded`].
///
/// Carried by value into [`StartTransaction`](crate) and checked by the backend before each
/// suspension point; it is not a timer that fires on its own, only a value a callee consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// No deadline: the operation may run for as long as the backend allows.
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    /// A deadline `timeout` from now.
    #[must_use]
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now().checked_add(timeout))
    }

    #[must_use]
    pub const fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.0.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Returns [`ErrorKind::DeadlineExceeded`] if the deadline has already passed.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::DeadlineExceeded`] if `self.is_expired()`.
    pub fn check(&self) -> Result<(), ConfiguratorError> {
        if self.is_expired() {
            Err(ConfiguratorError::new(ErrorKind::DeadlineExceeded))
        } else {
            Ok(())
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_deadline_never_expires() {
        assert!(!Deadline::none().is_expired());
    }

    #[test]
    fn past_deadline_is_expired() {
        let deadline = Deadline::after(Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert!(deadline.is_expired());
        assert_eq!(
            deadline.check().unwrap_err().kind(),
            ErrorKind::DeadlineExceeded
        );
    }

    #[test]
    fn future_deadline_is_not_expired() {
        let deadline = Deadline::after(Duration::from_secs(60));
        assert!(deadline.check().is_ok());
    }
}
