use std::time::Duration;

use color_eyre::eyre::Result;
use futures::StreamExt;
use ratatui::{Terminal, prelude::Backend};
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};

use crate::{
    application::Application,
    command::{Action, Command},
    subscription::SubscriptionManager,
};

/// Drives an [`Application`]: draws frames, dispatches messages, runs
/// commands and keeps subscriptions in sync.
pub struct Runtime<A: Application> {
    app: A,
    init: Option<Command<A::Message>>,
    tx: mpsc::UnboundedSender<Action<A::Message>>,
    rx: mpsc::UnboundedReceiver<Action<A::Message>>,
    subscriptions: SubscriptionManager<A::Message>,
}

impl<A: Application> Runtime<A> {
    /// Builds the application from `flags`. Its startup command runs when
    /// [`run`](Self::run) starts.
    pub fn new(flags: A::Flags) -> Self {
        let (app, init) = A::new(flags);
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriptions = SubscriptionManager::new(tx.clone());

        Self {
            app,
            init: Some(init),
            tx,
            rx,
            subscriptions,
        }
    }

    /// The application state, mostly useful in tests.
    pub const fn app(&self) -> &A {
        &self.app
    }

    /// Runs until the application emits [`Action::Quit`].
    ///
    /// A frame is drawn at most `frame_rate` times per second, and also right
    /// after a batch of messages is processed. All queued actions are drained
    /// before the next frame, so a quit never waits for a frame tick.
    ///
    /// # Errors
    ///
    /// Returns an error if drawing to the terminal fails.
    pub async fn run<B: Backend>(mut self, terminal: &mut Terminal<B>, frame_rate: u32) -> Result<()> {
        let frame = Duration::from_millis(1000 / u64::from(frame_rate.max(1)));
        let mut ticker = interval(frame);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        if let Some(init) = self.init.take() {
            self.spawn(init);
        }
        self.subscriptions.update(self.app.subscriptions());

        'frames: loop {
            terminal.draw(|frame| self.app.view(frame))?;

            tokio::select! {
                _ = ticker.tick() => {}
                action = self.rx.recv() => {
                    let Some(action) = action else { break };
                    if !self.dispatch(action) {
                        break;
                    }
                    while let Ok(action) = self.rx.try_recv() {
                        if !self.dispatch(action) {
                            break 'frames;
                        }
                    }
                }
            }
        }

        self.subscriptions.shutdown().await;
        Ok(())
    }

    /// Applies one action. Returns `false` when the loop should stop.
    fn dispatch(&mut self, action: Action<A::Message>) -> bool {
        match action {
            Action::Quit => false,
            Action::Message(msg) => {
                let cmd = self.app.update(msg);
                self.spawn(cmd);
                self.subscriptions.update(self.app.subscriptions());
                true
            }
        }
    }

    fn spawn(&self, cmd: Command<A::Message>) {
        let Some(mut stream) = cmd.stream else {
            return;
        };
        let tx = self.tx.clone();
        tokio::spawn(async move {
            while let Some(action) = stream.next().await {
                if tx.send(action).is_err() {
                    break;
                }
            }
        });
    }
}
