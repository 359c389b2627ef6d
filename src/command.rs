use futures::{
    FutureExt, Stream, StreamExt,
    stream::{self, BoxStream, select_all},
};

/// What a command asks the runtime to do.
pub enum Action<Msg> {
    /// Feed a message back into [`Application::update`](crate::application::Application::update).
    Message(Msg),

    /// Stop the event loop and tear down every running subscription.
    Quit,
}

impl<Msg> Action<Msg> {
    fn map<N>(self, f: impl FnOnce(Msg) -> N) -> Action<N> {
        match self {
            Self::Message(msg) => Action::Message(f(msg)),
            Self::Quit => Action::Quit,
        }
    }
}

/// A side effect returned from `new` or `update`.
///
/// A command is a lazy stream of [`Action`]s. The runtime spawns it on the
/// tokio runtime and feeds every action it yields back into the event loop,
/// so a command may produce zero, one or many messages.
///
/// Mutations are the main source of commands in this crate:
///
/// ```rust,ignore
/// Message::Submit => self
///     .roster
///     .add_team_member()
///     .trigger(self.form.input())
///     .map(Message::Saved),
/// ```
pub struct Command<Msg: Send + 'static> {
    pub(crate) stream: Option<BoxStream<'static, Action<Msg>>>,
}

impl<Msg: Send + 'static> Command<Msg> {
    /// A command with no effect.
    ///
    /// ```
    /// use roster::command::Command;
    ///
    /// let cmd: Command<()> = Command::none();
    /// assert!(cmd.is_none());
    /// ```
    #[must_use]
    pub fn none() -> Self {
        Self { stream: None }
    }

    /// Returns `true` if this command does nothing.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.stream.is_none()
    }

    /// Runs `future` and turns its output into a message with `f`.
    ///
    /// ```
    /// use roster::command::Command;
    ///
    /// enum Message {
    ///     Loaded(usize),
    /// }
    ///
    /// let cmd = Command::perform(async { 3 }, Message::Loaded);
    /// assert!(!cmd.is_none());
    /// ```
    pub fn perform<A>(
        future: impl Future<Output = A> + Send + 'static,
        f: impl FnOnce(A) -> Msg + Send + 'static,
    ) -> Self {
        Self::future(future.map(f))
    }

    /// Runs a future whose output already is a message.
    pub fn future(future: impl Future<Output = Msg> + Send + 'static) -> Self {
        Self {
            stream: Some(future.into_stream().map(Action::Message).boxed()),
        }
    }

    /// Delivers `msg` on the next turn of the event loop.
    pub fn message(msg: Msg) -> Self {
        Self::effect(Action::Message(msg))
    }

    /// Performs a single action.
    ///
    /// ```
    /// use roster::command::{Action, Command};
    ///
    /// let quit: Command<()> = Command::effect(Action::Quit);
    /// assert!(!quit.is_none());
    /// ```
    pub fn effect(action: Action<Msg>) -> Self {
        Self {
            stream: Some(stream::once(async move { action }).boxed()),
        }
    }

    /// Runs several commands concurrently.
    ///
    /// Messages arrive in completion order. `Command::none()` entries are
    /// dropped, and a batch of nothing is itself `Command::none()`.
    pub fn batch(commands: impl IntoIterator<Item = Self>) -> Self {
        let streams: Vec<_> = commands.into_iter().filter_map(|cmd| cmd.stream).collect();

        if streams.is_empty() {
            Self::none()
        } else {
            Self {
                stream: Some(select_all(streams).boxed()),
            }
        }
    }

    /// Delivers every item of `stream` as a message.
    pub fn stream(stream: impl Stream<Item = Msg> + Send + 'static) -> Self {
        Self {
            stream: Some(stream.map(Action::Message).boxed()),
        }
    }

    /// Converts the messages this command produces.
    ///
    /// `Action::Quit` passes through untouched.
    #[must_use]
    pub fn map<N: Send + 'static>(self, f: impl Fn(Msg) -> N + Send + 'static) -> Command<N> {
        Command {
            stream: self
                .stream
                .map(|stream| stream.map(move |action| action.map(&f)).boxed()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect<Msg: Send + 'static>(cmd: Command<Msg>) -> (Vec<Msg>, bool) {
        let mut messages = vec![];
        let mut quit = false;
        if let Some(mut stream) = cmd.stream {
            while let Some(action) = stream.next().await {
                match action {
                    Action::Message(msg) => messages.push(msg),
                    Action::Quit => quit = true,
                }
            }
        }
        (messages, quit)
    }

    #[tokio::test]
    async fn test_none_produces_nothing() {
        let (messages, quit) = collect(Command::<u8>::none()).await;
        assert!(messages.is_empty());
        assert!(!quit);
    }

    #[tokio::test]
    async fn test_perform_maps_output() {
        let (messages, _) = collect(Command::perform(async { 20 }, |n| n + 1)).await;
        assert_eq!(messages, vec![21]);
    }

    #[tokio::test]
    async fn test_message_is_delivered_once() {
        let (messages, _) = collect(Command::message("refresh")).await;
        assert_eq!(messages, vec!["refresh"]);
    }

    #[tokio::test]
    async fn test_batch_collects_every_message() {
        let cmd = Command::batch(vec![
            Command::future(async { 3 }),
            Command::none(),
            Command::future(async { 1 }),
            Command::future(async { 2 }),
        ]);

        let (mut messages, _) = collect(cmd).await;
        messages.sort_unstable();
        assert_eq!(messages, vec![1, 2, 3]);
    }

    #[test]
    fn test_batch_of_nothing_is_none() {
        let cmd: Command<u8> = Command::batch(vec![Command::none(), Command::none()]);
        assert!(cmd.is_none());
    }

    #[tokio::test]
    async fn test_map_keeps_quit() {
        let cmd: Command<u8> = Command::batch(vec![
            Command::message(2),
            Command::effect(Action::Quit),
        ]);

        let (messages, quit) = collect(cmd.map(|n| format!("page {n}"))).await;
        assert_eq!(messages, vec!["page 2".to_string()]);
        assert!(quit);
    }

    #[tokio::test]
    async fn test_stream_forwards_items_in_order() {
        let cmd = Command::stream(stream::iter(vec!["a", "b", "c"]));
        let (messages, _) = collect(cmd).await;
        assert_eq!(messages, vec!["a", "b", "c"]);
    }
}
