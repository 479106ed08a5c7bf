//! # coop-tui-fwk
//!
//! The reactive core of the coop control panel, built on ratatui and tokio.
//!
//! ## Pieces
//!
//! - **Layout**: [`Geometry::compute`] maps a terminal size to breakpoints and
//!   regions. Drawing and mouse hit-testing share the same value.
//! - **Focus**: [`FocusMode`] is the per-tab Sidebar/Form/Modal state
//!   machine; [`FocusRing`] orders the fields of a form.
//! - **Viewlets**: [`Viewlet`] is the contract every tab implements;
//!   [`TabSet`] keeps exactly one of them active.
//! - **Commands**: handlers return a [`Command`] describing deferred work;
//!   the [`Scheduler`] runs it on tokio tasks and results come back through
//!   the [`MessageBus`] as ordinary inputs.
//! - **Runtime**: [`App`] owns the terminal and feeds a [`Program`] one
//!   [`Input`] at a time.
//!
//! ## Quick Start
//!
//! ```ignore
//! use coop_tui_fwk::{AppBuilder, Command, Input, KeyCode, Program};
//! use ratatui::{widgets::Paragraph, Frame};
//!
//! struct Hello { quit: bool }
//!
//! impl Program for Hello {
//!     type Message = ();
//!     fn init(&mut self) -> Command<()> { Command::none() }
//!     fn update(&mut self, input: Input<()>) -> Command<()> {
//!         if let Input::Terminal(event) = input {
//!             self.quit = event.is_key(KeyCode::Char('q'));
//!         }
//!         Command::none()
//!     }
//!     fn draw(&self, frame: &mut Frame) {
//!         frame.render_widget(Paragraph::new("Hello!"), frame.area());
//!     }
//!     fn should_quit(&self) -> bool { self.quit }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     AppBuilder::new().program(Hello { quit: false }).build()?.run().await?;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod bus;
pub mod command;
pub mod event;
pub mod focus;
pub mod layout;
pub mod scheduler;
pub mod tabs;
pub mod terminal;
pub mod viewlet;

// Re-export main types at crate root for convenience
pub use app::{drive, App, AppBuilder, AppError, BuildError, Program};
pub use bus::{BusSender, MessageBus, SendError};
pub use command::{Command, Tag};
pub use event::{
    printable, Event, Input, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton,
    MouseEvent, MouseEventKind,
};
pub use focus::{EventResult, FocusMode, FocusRing, FocusTarget};
pub use layout::{is_viable, Breakpoint, Geometry};
pub use scheduler::Scheduler;
pub use tabs::{HeaderCell, HeaderTarget, TabSet, EXIT_LABEL};
pub use terminal::{install_panic_hook, Terminal, TerminalConfig, TerminalError};
pub use viewlet::{BoxedViewlet, Hit, Shortcut, Shortcuts, Viewlet};

// Re-export ratatui types that users commonly need
pub use ratatui::{layout::Rect, Frame};
