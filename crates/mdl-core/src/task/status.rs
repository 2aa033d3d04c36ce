//! Task state machine.

use std::fmt;

/// `pending → preparing → downloading → (merging) → completed | error | cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Pending,
    Preparing,
    Downloading,
    /// Segmented transfers only: concatenating segment files.
    Merging,
    Completed,
    Error,
    Cancelled,
}

impl TaskStatus {
    fn rank(self) -> u8 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::Preparing => 1,
            TaskStatus::Downloading => 2,
            TaskStatus::Merging => 3,
            TaskStatus::Completed | TaskStatus::Error | TaskStatus::Cancelled => 4,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Error | TaskStatus::Cancelled
        )
    }

    /// States the throughput sampler reports on.
    pub fn is_active(self) -> bool {
        matches!(self, TaskStatus::Downloading | TaskStatus::Merging)
    }

    /// Only strictly later states are reachable, and nothing leaves a terminal state.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Preparing => "preparing",
            TaskStatus::Downloading => "downloading",
            TaskStatus::Merging => "merging",
            TaskStatus::Completed => "completed",
            TaskStatus::Error => "error",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TaskStatus; 7] = [
        TaskStatus::Pending,
        TaskStatus::Preparing,
        TaskStatus::Downloading,
        TaskStatus::Merging,
        TaskStatus::Completed,
        TaskStatus::Error,
        TaskStatus::Cancelled,
    ];

    #[test]
    fn forward_path_is_allowed() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Preparing));
        assert!(TaskStatus::Preparing.can_transition_to(TaskStatus::Downloading));
        assert!(TaskStatus::Downloading.can_transition_to(TaskStatus::Merging));
        assert!(TaskStatus::Merging.can_transition_to(TaskStatus::Completed));
        assert!(TaskStatus::Downloading.can_transition_to(TaskStatus::Completed));
    }

    #[test]
    fn error_and_cancel_reachable_from_any_non_terminal() {
        for s in ALL.iter().filter(|s| !s.is_terminal()) {
            assert!(s.can_transition_to(TaskStatus::Error), "{s} -> error");
            assert!(s.can_transition_to(TaskStatus::Cancelled), "{s} -> cancelled");
        }
    }

    #[test]
    fn no_backward_or_self_transitions() {
        assert!(!TaskStatus::Downloading.can_transition_to(TaskStatus::Preparing));
        assert!(!TaskStatus::Merging.can_transition_to(TaskStatus::Downloading));
        assert!(!TaskStatus::Preparing.can_transition_to(TaskStatus::Preparing));
    }

    #[test]
    fn terminal_states_are_final() {
        for from in ALL.iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn display_is_lowercase_name() {
        assert_eq!(TaskStatus::Merging.to_string(), "merging");
        assert_eq!(TaskStatus::Cancelled.to_string(), "cancelled");
    }
}
