//! # coop-tui-panel
//!
//! A terminal control panel for a small fleet of virtual machines, built on
//! `coop-tui-fwk`.
//!
//! [`Panel`] is the program: it owns the [`state::AppState`], routes every
//! input through [`dispatch`] and draws the [`chrome`] around the active
//! tab. Backend work goes through the collaborator traits in [`provider`];
//! [`provider::demo`] ships an in-memory fleet so the binary runs anywhere.

pub mod chrome;
pub mod commands;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod message;
pub mod provider;
pub mod settings;
pub mod state;
pub mod theme;
pub mod viewlets;
pub mod widgets;

pub use dispatch::Panel;
pub use error::PanelError;
pub use message::Msg;
pub use settings::Settings;
