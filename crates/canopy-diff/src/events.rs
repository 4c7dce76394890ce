//! Streaming sink: forward comparator events over a channel.

use canopy_store::FileType;
use tokio::sync::mpsc;

use crate::context::DiffCallback;
use crate::error::DiffError;
use crate::status::ChangeKind;

/// One difference reported by the comparator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffEvent {
    Added { path: String, kind: FileType },
    Removed { path: String, kind: FileType },
    Modified { path: String, old: FileType, new: FileType },
    Ignored { path: String, kind: FileType },
    Error { path: String, message: String },
}

impl DiffEvent {
    pub fn path(&self) -> &str {
        match self {
            Self::Added { path, .. }
            | Self::Removed { path, .. }
            | Self::Modified { path, .. }
            | Self::Ignored { path, .. }
            | Self::Error { path, .. } => path,
        }
    }

    /// The change this event records, if it is one.
    pub fn change_kind(&self) -> Option<ChangeKind> {
        match self {
            Self::Added { .. } => Some(ChangeKind::Added),
            Self::Removed { .. } => Some(ChangeKind::Removed),
            Self::Modified { .. } => Some(ChangeKind::Modified),
            Self::Ignored { .. } | Self::Error { .. } => None,
        }
    }
}

/// [`DiffCallback`] that sends every event down an unbounded channel.
///
/// Lets a consumer process differences while the diff is still running.
/// The channel closes once the diff's context (the last sender) is dropped.
#[derive(Clone, Debug)]
pub struct ChannelCallback {
    sender: mpsc::UnboundedSender<DiffEvent>,
}

impl ChannelCallback {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DiffEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, event: DiffEvent) {
        // Receiver gone: nobody is listening, drop the event.
        let _ = self.sender.send(event);
    }
}

impl DiffCallback for ChannelCallback {
    fn added(&self, path: &str, kind: FileType) {
        self.send(DiffEvent::Added {
            path: path.to_owned(),
            kind,
        });
    }

    fn removed(&self, path: &str, kind: FileType) {
        self.send(DiffEvent::Removed {
            path: path.to_owned(),
            kind,
        });
    }

    fn modified(&self, path: &str, old: FileType, new: FileType) {
        self.send(DiffEvent::Modified {
            path: path.to_owned(),
            old,
            new,
        });
    }

    fn ignored(&self, path: &str, kind: FileType) {
        self.send(DiffEvent::Ignored {
            path: path.to_owned(),
            kind,
        });
    }

    fn error(&self, path: &str, error: &DiffError) {
        self.send(DiffEvent::Error {
            path: path.to_owned(),
            message: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_arrive_in_send_order() {
        let (callback, mut rx) = ChannelCallback::new();
        callback.added("a", FileType::Regular);
        callback.modified("b", FileType::Regular, FileType::Executable);
        callback.error("c", &DiffError::Cancelled);
        drop(callback);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].change_kind(), Some(ChangeKind::Added));
        assert_eq!(
            events[1],
            DiffEvent::Modified {
                path: "b".into(),
                old: FileType::Regular,
                new: FileType::Executable,
            }
        );
        assert_eq!(events[2].path(), "c");
        assert_eq!(events[2].change_kind(), None);
    }

    #[test]
    fn sending_after_receiver_drop_is_harmless() {
        let (callback, rx) = ChannelCallback::new();
        drop(rx);
        callback.removed("gone", FileType::Symlink);
    }
}
