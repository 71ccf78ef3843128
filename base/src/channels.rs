use crossbeam_channel::{Receiver, Sender};
use std::fmt;
use std::fmt::{Debug, Formatter};

/// Messages beyond this count are refused because the UI context obviously stopped draining.
const MAX_PENDING_UI_MESSAGES: usize = 1_000_000;

/// Creates the "dispatch to UI context" port.
///
/// The sender may be cloned and moved to engine threads. The inbox stays in the UI context and is
/// drained there, so that everything downstream of it runs single-threaded.
pub fn ui_dispatch_channel<T>(channel_name: &'static str) -> (UiDispatcher<T>, UiInbox<T>) {
    // Unbounded because sender and receiver may live on the same thread. A bounded channel
    // could deadlock in that case.
    let (sender, receiver) = crossbeam_channel::unbounded();
    (
        UiDispatcher {
            channel_name,
            sender,
        },
        UiInbox {
            channel_name,
            receiver,
        },
    )
}

pub struct UiDispatcher<T> {
    channel_name: &'static str,
    sender: Sender<T>,
}

impl<T> UiDispatcher<T> {
    /// Returns `false` if the UI context is gone or doesn't keep up.
    pub fn dispatch(&self, msg: T) -> bool {
        let msg_count = self.sender.len();
        if msg_count > MAX_PENDING_UI_MESSAGES {
            tracing::warn!(
                msg = "UI dispatch channel is extremely full, dropping message",
                %self.channel_name,
                msg_count
            );
            return false;
        }
        // Unbounded, so this only fails if the inbox is gone.
        self.sender.send(msg).is_ok()
    }
}

impl<T> Clone for UiDispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            channel_name: self.channel_name,
            sender: self.sender.clone(),
        }
    }
}

impl<T> Debug for UiDispatcher<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiDispatcher")
            .field("channel_name", &self.channel_name)
            .field("pending", &self.sender.len())
            .finish()
    }
}

pub struct UiInbox<T> {
    channel_name: &'static str,
    receiver: Receiver<T>,
}

impl<T> UiInbox<T> {
    /// Takes all messages which are currently in the channel without blocking.
    pub fn drain(&self) -> impl Iterator<Item = T> + '_ {
        self.receiver.try_iter()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl<T> Debug for UiInbox<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiInbox")
            .field("channel_name", &self.channel_name)
            .field("pending", &self.receiver.len())
            .finish()
    }
}
