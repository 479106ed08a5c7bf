//! Application builder and main event loop.
//!
//! The loop is single-threaded and cooperative: it takes one input at a
//! time (terminal event or worker message), hands it to the [`Program`],
//! schedules the returned command and redraws. Workers never touch program
//! state; they only enqueue messages onto the bus.

use std::collections::VecDeque;

use crossterm::event::EventStream;
use futures::StreamExt;
use ratatui::Frame;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::bus::{MessageBus, DEFAULT_CHANNEL_SIZE};
use crate::command::Command;
use crate::event::{Event, Input};
use crate::scheduler::Scheduler;
use crate::terminal::{install_panic_hook, Terminal, TerminalConfig, TerminalError};

/// Error type for application operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// Terminal error.
    #[error("terminal error: {0}")]
    Terminal(#[from] TerminalError),
    /// Build error.
    #[error("build error: {0}")]
    Build(#[from] BuildError),
    /// IO error reading terminal events.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error type for building an application.
#[derive(Debug, Error)]
pub enum BuildError {
    /// No program was provided.
    #[error("no program provided")]
    NoProgram,
}

/// The state machine driven by the event loop.
///
/// `update` is the only place program state changes. It is called once per
/// input, never concurrently.
pub trait Program: Send {
    /// Message type produced by commands.
    type Message: Send + 'static;

    /// Startup work, scheduled after the first resize has been delivered.
    fn init(&mut self) -> Command<Self::Message>;

    /// Process one input.
    fn update(&mut self, input: Input<Self::Message>) -> Command<Self::Message>;

    /// Draw the current state.
    fn draw(&self, frame: &mut Frame);

    /// Whether the loop should stop after the current input.
    fn should_quit(&self) -> bool;
}

/// Builder for constructing the application.
///
/// # Example
///
/// ```ignore
/// let app = AppBuilder::new()
///     .program(Panel::new(settings, services))
///     .mouse_capture(true)
///     .build()?;
///
/// app.run().await?;
/// ```
pub struct AppBuilder<P: Program> {
    program: Option<P>,
    mouse_capture: bool,
    channel_size: usize,
}

impl<P: Program> AppBuilder<P> {
    /// Create a new application builder.
    pub fn new() -> Self {
        Self {
            program: None,
            mouse_capture: true,
            channel_size: DEFAULT_CHANNEL_SIZE,
        }
    }

    /// Set the program. Required.
    pub fn program(mut self, program: P) -> Self {
        self.program = Some(program);
        self
    }

    /// Enable or disable mouse capture.
    pub fn mouse_capture(mut self, enabled: bool) -> Self {
        self.mouse_capture = enabled;
        self
    }

    /// Capacity of the worker message bus.
    pub fn channel_size(mut self, size: usize) -> Self {
        self.channel_size = size;
        self
    }

    /// Build the application.
    pub fn build(self) -> Result<App<P>, BuildError> {
        let program = self.program.ok_or(BuildError::NoProgram)?;
        Ok(App {
            program,
            bus: MessageBus::with_capacity(self.channel_size),
            terminal_config: TerminalConfig {
                mouse_capture: self.mouse_capture,
            },
        })
    }
}

impl<P: Program> Default for AppBuilder<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// A configured application ready to run.
pub struct App<P: Program> {
    program: P,
    bus: MessageBus<P::Message>,
    terminal_config: TerminalConfig,
}

impl<P: Program> App<P> {
    /// Run until the program asks to quit.
    ///
    /// Takes over the terminal for the duration and restores it afterwards,
    /// also when the loop fails.
    pub async fn run(mut self) -> Result<(), AppError> {
        install_panic_hook();

        let mut terminal = Terminal::with_config(self.terminal_config.clone())?;
        let mut message_rx = self
            .bus
            .take_receiver()
            .ok_or(AppError::Io(std::io::Error::other("message receiver already taken")))?;
        let mut scheduler = Scheduler::new(self.bus.sender());

        let result = self
            .run_event_loop(&mut terminal, &mut scheduler, &mut message_rx)
            .await;

        terminal.restore()?;
        tracing::info!(
            in_flight = scheduler.in_flight(),
            "event loop finished"
        );
        result
    }

    async fn run_event_loop(
        &mut self,
        terminal: &mut Terminal,
        scheduler: &mut Scheduler<P::Message>,
        message_rx: &mut mpsc::Receiver<P::Message>,
    ) -> Result<(), AppError> {
        let mut event_stream = EventStream::new();

        // The program learns its size before anything else.
        let (width, height) = terminal.size()?;
        self.process(Input::Terminal(Event::Resize { width, height }), scheduler);
        let init = self.program.init();
        self.schedule(init, scheduler);
        self.draw(terminal)?;

        loop {
            let input = tokio::select! {
                biased;

                event = event_stream.next() => match event {
                    Some(Ok(event)) => Input::Terminal(Event::from(event)),
                    Some(Err(e)) => return Err(AppError::Io(e)),
                    None => break,
                },

                // The scheduler holds a sender, so this never yields None
                // while the loop runs.
                message = message_rx.recv() => match message {
                    Some(message) => Input::Message(message),
                    None => break,
                },
            };

            self.process(input, scheduler);
            if self.program.should_quit() {
                break;
            }
            self.draw(terminal)?;
        }

        Ok(())
    }

    /// Feed one input and drain the synchronous messages it produced.
    fn process(&mut self, input: Input<P::Message>, scheduler: &mut Scheduler<P::Message>) {
        let command = self.program.update(input);
        self.schedule(command, scheduler);
    }

    fn schedule(&mut self, command: Command<P::Message>, scheduler: &mut Scheduler<P::Message>) {
        let mut immediate = VecDeque::new();
        scheduler.schedule(command, &mut immediate);
        while let Some(message) = immediate.pop_front() {
            let command = self.program.update(Input::Message(message));
            scheduler.schedule(command, &mut immediate);
        }
    }

    fn draw(&mut self, terminal: &mut Terminal) -> Result<(), AppError> {
        let program = &self.program;
        terminal.draw(|frame| program.draw(frame))?;
        Ok(())
    }
}

/// Feed inputs to a program the way the event loop does, without a
/// terminal: synchronous messages are drained in order and asynchronous
/// work is handed back for the caller to run or inspect.
///
/// Returns the commands that still need a worker.
pub fn drive<P: Program>(program: &mut P, input: Input<P::Message>) -> Vec<Command<P::Message>> {
    let mut pending = Vec::new();
    let mut queue = VecDeque::from([input]);
    while let Some(input) = queue.pop_front() {
        match program.update(input) {
            Command::None => {}
            command => split(command, &mut queue, &mut pending),
        }
    }
    pending
}

fn split<M>(
    command: Command<M>,
    queue: &mut VecDeque<Input<M>>,
    pending: &mut Vec<Command<M>>,
) {
    match command {
        Command::None => {}
        Command::Message(message) => queue.push_back(Input::Message(message)),
        Command::Batch(commands) => {
            for command in commands {
                split(command, queue, pending);
            }
        }
        other => pending.push(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Tag;

    /// Counts inputs and echoes numeric messages through commands.
    #[derive(Default)]
    struct Echo {
        seen: Vec<u32>,
        quit: bool,
    }

    impl Program for Echo {
        type Message = u32;

        fn init(&mut self) -> Command<u32> {
            Command::none()
        }

        fn update(&mut self, input: Input<u32>) -> Command<u32> {
            match input {
                Input::Message(n) => {
                    self.seen.push(n);
                    match n {
                        1 => Command::batch([Command::message(2), Command::message(3)]),
                        3 => Command::tracked(Tag::new("work", "x"), async { 4 }),
                        _ => Command::none(),
                    }
                }
                Input::Terminal(event) => {
                    self.quit = event.is_key(crate::event::KeyCode::Char('q'));
                    Command::none()
                }
            }
        }

        fn draw(&self, _frame: &mut Frame) {}

        fn should_quit(&self) -> bool {
            self.quit
        }
    }

    #[test]
    fn test_drive_drains_messages_fifo() {
        let mut echo = Echo::default();
        let pending = drive(&mut echo, Input::Message(1));
        assert_eq!(echo.seen, [1, 2, 3]);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].tags(), vec![&Tag::new("work", "x")]);
    }

    #[test]
    fn test_builder_requires_program() {
        assert!(matches!(
            AppBuilder::<Echo>::new().build(),
            Err(BuildError::NoProgram)
        ));
        assert!(AppBuilder::new().program(Echo::default()).build().is_ok());
    }
}
