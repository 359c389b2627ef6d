use ratatui::Frame;

use crate::{command::Command, subscription::Subscription};

/// A terminal program written in the Elm architecture.
///
/// The runtime owns the value, calls [`update`](Application::update) for every
/// message, redraws with [`view`](Application::view) every frame, and after each
/// update reconciles the set of running subscriptions against
/// [`subscriptions`](Application::subscriptions).
///
/// ```
/// use ratatui::Frame;
/// use roster::{application::Application, command::Command, subscription::Subscription};
///
/// enum Message {
///     NextPage,
/// }
///
/// struct Pager {
///     page: u32,
/// }
///
/// impl Application for Pager {
///     type Message = Message;
///     type Flags = u32;
///
///     fn new(page: u32) -> (Self, Command<Message>) {
///         (Pager { page }, Command::none())
///     }
///
///     fn update(&mut self, msg: Message) -> Command<Message> {
///         match msg {
///             Message::NextPage => self.page += 1,
///         }
///         Command::none()
///     }
///
///     fn view(&self, _frame: &mut Frame<'_>) {}
///
///     fn subscriptions(&self) -> Vec<Subscription<Message>> {
///         vec![]
///     }
/// }
/// ```
pub trait Application: Sized {
    /// Everything that can happen to the model.
    type Message: Send + 'static;

    /// Startup input handed to [`new`](Application::new).
    type Flags: Send;

    /// Builds the initial model and an optional startup command.
    fn new(flags: Self::Flags) -> (Self, Command<Self::Message>);

    /// Applies one message. This is the only place the model changes.
    fn update(&mut self, msg: Self::Message) -> Command<Self::Message>;

    /// Renders the model. Must not change state.
    fn view(&self, frame: &mut Frame<'_>);

    /// The event sources the model currently wants.
    ///
    /// Subscriptions are identified by [`SubscriptionId`](crate::subscription::SubscriptionId):
    /// returning one with the same id as before keeps it running, dropping it
    /// cancels it. Query subscriptions rely on this to release their cache
    /// entries when a page is left.
    fn subscriptions(&self) -> Vec<Subscription<Self::Message>>;
}
