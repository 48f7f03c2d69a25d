//! Debounced background saves.
//!
//! [`AutoSave`] is a restartable deadline: each edit reschedules it, and the
//! host loop polls it with the current instant. Only one save is ever
//! pending. Rescheduling supersedes the pending save; a save that already
//! started is not interrupted.

use crate::model::PostPatch;
use std::time::{Duration, Instant};

pub const DEFAULT_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq)]
pub struct PendingSave {
    pub post_id: String,
    pub patch: PostPatch,
    pub due: Instant,
}

#[derive(Debug, Clone)]
pub struct AutoSave {
    delay: Duration,
    pending: Option<PendingSave>,
}

impl Default for AutoSave {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

impl AutoSave {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Restart the timer for an edit of `post_id`.
    ///
    /// Edits of the same post fold into the pending patch. An edit of a
    /// different post displaces the pending save, which is returned so the
    /// caller can run it before it is lost.
    pub fn schedule(
        &mut self,
        post_id: &str,
        patch: PostPatch,
        now: Instant,
    ) -> Option<PendingSave> {
        let due = now + self.delay;
        match self.pending.take() {
            Some(mut pending) if pending.post_id == post_id => {
                pending.patch.merge(patch);
                pending.due = due;
                self.pending = Some(pending);
                None
            }
            displaced => {
                self.pending = Some(PendingSave {
                    post_id: post_id.to_string(),
                    patch,
                    due,
                });
                displaced
            }
        }
    }

    /// Takes the pending save if its deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<PendingSave> {
        match &self.pending {
            Some(pending) if pending.due <= now => self.pending.take(),
            _ => None,
        }
    }

    /// Takes the pending save regardless of its deadline.
    pub fn take(&mut self) -> Option<PendingSave> {
        self.pending.take()
    }

    /// Drops the pending save. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Drops the pending save if it targets `post_id`.
    pub fn cancel_for(&mut self, post_id: &str) -> bool {
        if self.pending_for() == Some(post_id) {
            self.pending = None;
            return true;
        }
        false
    }

    pub fn due_at(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due)
    }

    pub fn pending_for(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.post_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_only_after_delay() {
        let mut timer = AutoSave::new(Duration::from_secs(3));
        let t0 = Instant::now();
        timer.schedule("a", PostPatch::default().content("x"), t0);

        assert!(timer.take_due(t0 + Duration::from_secs(2)).is_none());
        let due = timer.take_due(t0 + Duration::from_secs(3)).unwrap();
        assert_eq!(due.post_id, "a");
        assert!(timer.take_due(t0 + Duration::from_secs(10)).is_none());
    }

    #[test]
    fn later_edit_pushes_deadline_and_merges() {
        let mut timer = AutoSave::new(Duration::from_secs(3));
        let t0 = Instant::now();
        timer.schedule("a", PostPatch::default().title("T"), t0);
        timer.schedule(
            "a",
            PostPatch::default().content("v2"),
            t0 + Duration::from_secs(2),
        );

        assert!(timer.take_due(t0 + Duration::from_secs(4)).is_none());
        let due = timer.take_due(t0 + Duration::from_secs(5)).unwrap();
        assert_eq!(due.patch.title.as_deref(), Some("T"));
        assert_eq!(due.patch.content.as_deref(), Some("v2"));
    }

    #[test]
    fn edit_of_other_post_returns_displaced_save() {
        let mut timer = AutoSave::default();
        let t0 = Instant::now();
        timer.schedule("a", PostPatch::default().content("x"), t0);
        let displaced = timer
            .schedule("b", PostPatch::default().content("y"), t0)
            .unwrap();
        assert_eq!(displaced.post_id, "a");
        assert_eq!(timer.pending_for(), Some("b"));
    }

    #[test]
    fn cancel_clears_pending() {
        let mut timer = AutoSave::default();
        timer.schedule("a", PostPatch::default(), Instant::now());
        assert!(!timer.cancel_for("b"));
        assert!(timer.cancel());
        assert!(!timer.cancel());
        assert!(timer.due_at().is_none());
    }
}
