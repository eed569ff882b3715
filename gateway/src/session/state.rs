//! Session state machine (§4.7) — one coarse lifecycle state plus a set
//! of orthogonal flags that track concurrent concerns the coarse state
//! alone can't express (a caller can barge in while a tool call is still
//! in flight, for instance).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Connecting,
    Speaking,
    Listening,
    Terminating,
    Closed,
}

/// Flags that can each be true independently of the coarse state above.
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionFlags {
    pub agent_speaking: bool,
    pub tool_call_in_progress: bool,
    pub was_interrupted: bool,
    pub order_in_progress: bool,
    pub transfer_triggered: bool,
}

impl SessionFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// A `toolCall` answered while the caller's most recent barge-in has
    /// not yet been closed out by a `turnComplete` must not get a
    /// `sendToolResponse` reply — the model has already moved on and an
    /// unsolicited reply would desync its turn state.
    pub fn suppresses_tool_response(&self) -> bool {
        self.was_interrupted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_default_to_false() {
        let flags = SessionFlags::new();
        assert!(!flags.agent_speaking);
        assert!(!flags.tool_call_in_progress);
        assert!(!flags.was_interrupted);
        assert!(!flags.order_in_progress);
        assert!(!flags.transfer_triggered);
    }

    #[test]
    fn tool_response_suppressed_only_after_unresolved_interruption() {
        let mut flags = SessionFlags::new();
        assert!(!flags.suppresses_tool_response());

        flags.was_interrupted = true;
        assert!(flags.suppresses_tool_response());

        // A turnComplete closes out the interruption.
        flags.was_interrupted = false;
        assert!(!flags.suppresses_tool_response());
    }
}
