use std::hash::{DefaultHasher, Hash, Hasher};
use std::io;

use crossterm::event::{Event, EventStream};
use futures::{StreamExt, stream::BoxStream};

use super::{SubscriptionId, SubscriptionSource};

/// Keyboard, resize and focus events from the controlling terminal.
///
/// Focus events only arrive when the terminal has been switched into focus
/// reporting with `crossterm::event::EnableFocusChange`; the binary does this
/// at startup so focus changes can drive refetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TerminalEvents;

impl TerminalEvents {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SubscriptionSource for TerminalEvents {
    type Output = io::Result<Event>;

    fn stream(&self) -> BoxStream<'static, Self::Output> {
        EventStream::new().boxed()
    }

    fn id(&self) -> SubscriptionId {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        SubscriptionId::of::<Self>(hasher.finish())
    }
}
