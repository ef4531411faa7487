//! Operation kinds derived from raw `notify` events.

use notify::EventKind;
use notify::event::{ModifyKind, RenameMode};

/// Normalized filesystem operation, used as part of the debounce key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeOp {
    Create,
    Write,
    Remove,
    Rename,
    /// Permission or other metadata change; never a content change.
    Chmod,
}

impl ChangeOp {
    /// Map a `notify` event kind. Access notifications (open, read, close)
    /// and unknown kinds are not changes and map to `None`.
    pub fn from_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(ChangeOp::Create),
            EventKind::Modify(ModifyKind::Metadata(_)) => Some(ChangeOp::Chmod),
            EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeOp::Rename),
            EventKind::Modify(_) => Some(ChangeOp::Write),
            EventKind::Remove(_) => Some(ChangeOp::Remove),
            EventKind::Any => Some(ChangeOp::Write),
            EventKind::Access(_) | EventKind::Other => None,
        }
    }

    /// Whether this event can bring a new entry into a directory.
    ///
    /// Moving a directory into the tree counts as creating it.
    pub fn adds_entry(kind: &EventKind) -> bool {
        matches!(
            kind,
            EventKind::Create(_)
                | EventKind::Modify(ModifyKind::Name(
                    RenameMode::To | RenameMode::Both | RenameMode::Any
                ))
        )
    }
}
