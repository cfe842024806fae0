use crate::llm::{Message, MessageRole};
use std::collections::VecDeque;
use tracing::trace;

/// Sliding window over the turns of one session.
///
/// Holds at most `max_length` turns. Overflow evicts from the front, and a
/// turn of tool results never outlives the turn that requested those tools.
#[derive(Debug)]
pub struct ConversationHistory {
    turns: VecDeque<Message>,
    max_length: usize,
}

impl ConversationHistory {
    pub fn new(max_length: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            max_length: max_length.max(1),
        }
    }

    pub fn push(&mut self, message: Message) {
        self.turns.push_back(message);
        self.evict();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> impl Iterator<Item = &Message> {
        self.turns.iter()
    }

    pub fn last(&self) -> Option<&Message> {
        self.turns.back()
    }

    /// Turns to send with the next request.
    ///
    /// The window may begin mid-exchange after eviction. The request starts
    /// at the first plain user turn so the conversation opens with the user.
    /// A window without one (tiny limits during a tool loop) is sent whole.
    pub fn request_messages(&self) -> Vec<Message> {
        let start = self
            .turns
            .iter()
            .position(|turn| turn.role == MessageRole::User && turn.tool_result_ids().is_empty())
            .unwrap_or(0);
        self.turns.iter().skip(start).cloned().collect()
    }

    fn evict(&mut self) {
        while self.turns.len() > self.max_length {
            if let Some(turn) = self.turns.pop_front() {
                trace!("Evicted {:?} turn from history", turn.role);
            }
        }

        // The tool_use turn a result answers always precedes it, so results at
        // the front have lost their invocation.
        while self.turns.len() > 1
            && self
                .turns
                .front()
                .is_some_and(|turn| !turn.tool_result_ids().is_empty())
        {
            self.turns.pop_front();
            trace!("Evicted orphaned tool results from history");
        }
    }
}
