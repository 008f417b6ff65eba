//! Stream-completion heuristic.
//!
//! A reply is final once its text has stopped changing for a number of
//! consecutive polls, or as soon as the session shows a completion hint.

/// Outcome of feeding one poll to a [`StabilityTracker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollVerdict {
    /// Keep polling.
    Pending,
    /// The reply is final.
    Stable(String),
}

/// Counts consecutive stable polls for one capture session.
#[derive(Debug, Clone)]
pub struct StabilityTracker {
    threshold: u32,
    previous: Option<String>,
    stable_count: u32,
}

impl StabilityTracker {
    /// Creates a tracker that concludes after `threshold` stable polls.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            previous: None,
            stable_count: 0,
        }
    }

    /// Current run of stable polls.
    pub fn stable_count(&self) -> u32 {
        self.stable_count
    }

    /// Feeds one poll: the extracted text and whether a completion hint showed.
    ///
    /// A poll is stable when the text is non-empty and either equals the
    /// previous poll or comes with a completion hint. Any other poll resets
    /// the count.
    pub fn observe(&mut self, text: Option<&str>, completion_hint: bool) -> PollVerdict {
        let text = text.filter(|t| !t.is_empty());

        let verdict = match text {
            Some(current) if completion_hint => PollVerdict::Stable(current.to_string()),
            Some(current) if self.previous.as_deref() == Some(current) => {
                self.stable_count += 1;
                if self.stable_count >= self.threshold {
                    PollVerdict::Stable(current.to_string())
                } else {
                    PollVerdict::Pending
                }
            }
            _ => {
                self.stable_count = 0;
                PollVerdict::Pending
            }
        };

        self.previous = text.map(str::to_string);
        verdict
    }

    /// Starts counting again from the next poll.
    pub fn reset(&mut self) {
        self.stable_count = 0;
    }
}
