use serde::Serialize;
use std::collections::BTreeMap;

use smeshmon_types::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Success,
    Pending,
    Failed,
}

/// One-line summary of what an identity is doing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub kind: MessageKind,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct MessageBoard {
    messages: BTreeMap<Identity, StatusMessage>,
}

impl MessageBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the identity's message; with `only_if_empty` an existing one is kept
    pub fn set(&mut self, id: Identity, kind: MessageKind, text: impl Into<String>, only_if_empty: bool) {
        if only_if_empty && self.messages.contains_key(&id) {
            return;
        }
        self.messages.insert(
            id,
            StatusMessage {
                kind,
                text: text.into(),
            },
        );
    }

    pub fn get(&self, id: &Identity) -> Option<&StatusMessage> {
        self.messages.get(id)
    }

    pub fn all(&self) -> &BTreeMap<Identity, StatusMessage> {
        &self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smeshmon_types::IDENTITY_LEN;

    #[test]
    fn test_only_if_empty() {
        let id = Identity::from_bytes([1; IDENTITY_LEN]);
        let mut board = MessageBoard::new();

        board.set(id, MessageKind::Pending, "Waiting for PoET round end...", true);
        assert_eq!(board.get(&id).unwrap().text, "Waiting for PoET round end...");

        board.set(id, MessageKind::Success, "Generating PoST proof...", false);
        board.set(id, MessageKind::Pending, "Waiting for PoET round end...", true);
        let message = board.get(&id).unwrap();
        assert_eq!(message.kind, MessageKind::Success);
        assert_eq!(message.text, "Generating PoST proof...");
    }
}
