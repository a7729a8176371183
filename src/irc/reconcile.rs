//! Channel membership reconciliation.

use std::collections::BTreeSet;

use trompet_proto::Message;

/// Joins and parts that turn one channel set into another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelDelta {
    pub to_join: BTreeSet<String>,
    pub to_leave: BTreeSet<String>,
}

impl ChannelDelta {
    /// `to_join = desired - current`, `to_leave = current - desired`.
    pub fn compute(current: &BTreeSet<String>, desired: &BTreeSet<String>) -> Self {
        Self {
            to_join: desired.difference(current).cloned().collect(),
            to_leave: current.difference(desired).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_join.is_empty() && self.to_leave.is_empty()
    }

    /// `PART`s first, then `JOIN`s.
    pub fn commands(&self) -> Vec<Message> {
        self.to_leave
            .iter()
            .map(Message::part)
            .chain(self.to_join.iter().map(Message::join))
            .collect()
    }
}
