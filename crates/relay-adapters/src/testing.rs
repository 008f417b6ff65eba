//! Scripted in-memory adapter for tests.
//!
//! `ScriptedAdapter` replays a queue of extraction results and delivery
//! results so capture and dispatch behaviour can be exercised without a
//! real session.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use relay_models::AgentId;

use crate::error::{AdapterError, Result};
use crate::traits::{AdapterInfo, AgentAdapter};

/// Adapter whose behaviour is scripted up front.
///
/// Extraction pops from a queue of replies; once the queue is drained the
/// last popped value repeats. Submissions pop from a queue of results and
/// succeed once that queue is empty.
pub struct ScriptedAdapter {
    info: AdapterInfo,
    ready: AtomicBool,
    input_present: AtomicBool,
    submit_present: AtomicBool,
    replies: Mutex<VecDeque<Option<String>>>,
    last_reply: Mutex<Option<String>>,
    hints: Mutex<VecDeque<bool>>,
    submit_results: Mutex<VecDeque<Result<()>>>,
    pending_text: Mutex<Option<String>>,
    delivered: Mutex<Vec<String>>,
    submit_calls: AtomicU32,
    extract_calls: AtomicU32,
}

impl ScriptedAdapter {
    /// Creates a ready adapter with no scripted replies.
    pub fn new(agent_id: impl Into<AgentId>) -> Self {
        let agent_id = agent_id.into();
        Self {
            info: AdapterInfo {
                location: format!("scripted://{}", agent_id),
                agent_id,
                kind: "scripted".to_string(),
            },
            ready: AtomicBool::new(true),
            input_present: AtomicBool::new(true),
            submit_present: AtomicBool::new(true),
            replies: Mutex::new(VecDeque::new()),
            last_reply: Mutex::new(None),
            hints: Mutex::new(VecDeque::new()),
            submit_results: Mutex::new(VecDeque::new()),
            pending_text: Mutex::new(None),
            delivered: Mutex::new(Vec::new()),
            submit_calls: AtomicU32::new(0),
            extract_calls: AtomicU32::new(0),
        }
    }

    /// Queues extraction results, one per poll.
    pub fn with_replies<I, S>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_replies(replies);
        self
    }

    /// Appends extraction results to the queue.
    pub fn push_replies<I, S>(&self, replies: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut queue = self.replies.lock().unwrap();
        queue.extend(replies.into_iter().map(|r| Some(r.into())));
    }

    /// Appends an empty extraction (no reply rendered).
    pub fn push_empty(&self) {
        self.replies.lock().unwrap().push_back(None);
    }

    /// Queues completion hints, one per poll.
    pub fn push_hints(&self, hints: impl IntoIterator<Item = bool>) {
        self.hints.lock().unwrap().extend(hints);
    }

    /// Queues submission results, consumed one per submit.
    pub fn push_submit_results(&self, results: impl IntoIterator<Item = Result<()>>) {
        self.submit_results.lock().unwrap().extend(results);
    }

    /// Sets readiness.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Sets whether the input control can be located.
    pub fn set_input_present(&self, present: bool) {
        self.input_present.store(present, Ordering::SeqCst);
    }

    /// Sets whether the submit control can be located.
    pub fn set_submit_present(&self, present: bool) {
        self.submit_present.store(present, Ordering::SeqCst);
    }

    /// Texts that were successfully submitted, in order.
    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }

    /// Number of submit activations attempted.
    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    /// Number of extraction polls served.
    pub fn extract_calls(&self) -> u32 {
        self.extract_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentAdapter for ScriptedAdapter {
    fn info(&self) -> &AdapterInfo {
        &self.info
    }

    async fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn locate_input(&self) -> Result<()> {
        if self.input_present.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AdapterError::InputNotFound)
        }
    }

    async fn inject_text(&self, text: &str) -> Result<()> {
        *self.pending_text.lock().unwrap() = Some(text.to_string());
        Ok(())
    }

    async fn locate_submit(&self) -> Result<()> {
        if self.submit_present.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AdapterError::SubmitNotFound)
        }
    }

    async fn wait_until_enabled(&self) -> Result<()> {
        Ok(())
    }

    async fn activate_submit(&self) -> Result<()> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);

        let scripted = self.submit_results.lock().unwrap().pop_front();
        scripted.unwrap_or(Ok(()))?;

        if let Some(text) = self.pending_text.lock().unwrap().take() {
            self.delivered.lock().unwrap().push(text);
        }
        Ok(())
    }

    async fn extract_latest_reply(&self) -> Option<String> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);

        let mut last = self.last_reply.lock().unwrap();
        if let Some(next) = self.replies.lock().unwrap().pop_front() {
            *last = next;
        }
        last.clone()
    }

    async fn detect_completion_hint(&self) -> bool {
        self.hints.lock().unwrap().pop_front().unwrap_or(false)
    }
}
