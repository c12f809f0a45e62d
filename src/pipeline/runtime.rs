//! Event-loop host for a poll loop
//!
//! [`Runner`] drives one [`PollLoop`] on a single task. It waits for either
//! the earliest timer deadline or a [`LoopCommand`], and never runs two
//! polls at once. Build it on a current-thread tokio runtime:
//!
//! ```ignore
//! let (runner, commands) = Runner::channel(poll_loop, clock, 16);
//! commands.send(LoopCommand::StartDemo).await?;
//! let poll_loop = runtime.block_on(runner.run());
//! ```

use super::poll_loop::{PollLoop, Stages};
use super::scheduler::TimerQueue;
use crate::backend::Endpoint;
use crate::clock::Clock;
use crate::error::ConnectError;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};

/// Reply channel for a connect request
pub type ConnectReply = oneshot::Sender<Result<(), ConnectError>>;

/// Requests accepted by a [`Runner`]
#[derive(Debug)]
pub enum LoopCommand {
    /// Bind the live backend and start polling
    Connect {
        endpoint: Endpoint,
        reply: Option<ConnectReply>,
    },
    /// Start polling the synthetic source
    StartDemo,
    /// Stop polling and release the backend
    Disconnect,
    /// Stop polling and return from [`Runner::run`]
    Shutdown,
}

impl LoopCommand {
    /// Connect without waiting for the result
    pub fn connect(endpoint: Endpoint) -> Self {
        LoopCommand::Connect {
            endpoint,
            reply: None,
        }
    }
}

/// Drives a poll loop from timers and commands
pub struct Runner<T: Stages> {
    poll_loop: PollLoop<T>,
    timers: TimerQueue,
    clock: Arc<dyn Clock>,
    commands: mpsc::Receiver<LoopCommand>,
}

impl<T: Stages> Runner<T> {
    pub fn new(
        poll_loop: PollLoop<T>,
        clock: Arc<dyn Clock>,
        commands: mpsc::Receiver<LoopCommand>,
    ) -> Self {
        Self {
            poll_loop,
            timers: TimerQueue::new(clock.clone()),
            clock,
            commands,
        }
    }

    /// Create a runner together with its command sender
    pub fn channel(
        poll_loop: PollLoop<T>,
        clock: Arc<dyn Clock>,
        buffer: usize,
    ) -> (Self, mpsc::Sender<LoopCommand>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self::new(poll_loop, clock, rx), tx)
    }

    /// Run until [`LoopCommand::Shutdown`] or until every sender is dropped
    ///
    /// Returns the poll loop, idle, for inspection.
    pub async fn run(mut self) -> PollLoop<T> {
        loop {
            let deadline = self.timers.next_deadline();
            tokio::select! {
                _ = sleep_until(deadline) => self.fire_due(),
                command = self.commands.recv() => match command {
                    Some(LoopCommand::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
            }
        }
        tracing::debug!("Runner shutting down");
        self.poll_loop.disconnect(&mut self.timers);
        self.poll_loop
    }

    fn fire_due(&mut self) {
        let now = self.clock.now();
        while let Some(id) = self.timers.pop_due(now) {
            self.poll_loop.on_timer(id, &mut self.timers);
        }
    }

    fn handle(&mut self, command: LoopCommand) {
        match command {
            LoopCommand::Connect { endpoint, reply } => {
                let result = self.poll_loop.connect(&endpoint, &mut self.timers);
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            LoopCommand::StartDemo => self.poll_loop.start_demo(&mut self.timers),
            LoopCommand::Disconnect => self.poll_loop.disconnect(&mut self.timers),
            LoopCommand::Shutdown => {}
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await
        }
        None => std::future::pending().await,
    }
}
