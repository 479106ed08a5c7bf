//! Terminal takeover.
//!
//! Raw mode, the alternate screen, bracketed paste and mouse capture are
//! entered together and left together: on drop, on explicit restore and
//! from the panic hook.

use std::io::{self, Stdout};

use crossterm::{
    event::{
        DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal as RatatuiTerminal};
use thiserror::Error;

/// Error type for terminal operations
#[derive(Debug, Error)]
pub enum TerminalError {
    /// IO error from crossterm or ratatui
    #[error("terminal IO error: {0}")]
    Io(#[from] io::Error),
}

/// Configuration for terminal initialization.
#[derive(Debug, Clone)]
pub struct TerminalConfig {
    /// Whether to enable mouse capture. Default: `true`.
    pub mouse_capture: bool,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            mouse_capture: true,
        }
    }
}

/// Terminal wrapper owning raw mode and the alternate screen.
pub struct Terminal {
    terminal: RatatuiTerminal<CrosstermBackend<Stdout>>,
    mouse_capture_enabled: bool,
    restored: bool,
}

impl Terminal {
    /// Take over the terminal.
    pub fn with_config(config: TerminalConfig) -> Result<Self, TerminalError> {
        enable_raw_mode()?;

        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
        if config.mouse_capture {
            execute!(stdout, EnableMouseCapture)?;
        }

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = RatatuiTerminal::new(backend)?;
        terminal.clear()?;

        Ok(Self {
            terminal,
            mouse_capture_enabled: config.mouse_capture,
            restored: false,
        })
    }

    /// Current size as `(width, height)`.
    #[inline]
    pub fn size(&self) -> Result<(u16, u16), TerminalError> {
        let size = self.terminal.size()?;
        Ok((size.width, size.height))
    }

    /// Draw to the terminal using the provided closure.
    #[inline]
    pub fn draw<F>(&mut self, f: F) -> Result<(), TerminalError>
    where
        F: FnOnce(&mut ratatui::Frame),
    {
        self.terminal.draw(f)?;
        Ok(())
    }

    /// Check if mouse capture is currently enabled.
    #[inline]
    pub fn mouse_capture_enabled(&self) -> bool {
        self.mouse_capture_enabled
    }

    /// Restore the terminal to its original state. Safe to call twice.
    pub fn restore(&mut self) -> Result<(), TerminalError> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        disable_raw_mode()?;
        if self.mouse_capture_enabled {
            execute!(self.terminal.backend_mut(), DisableMouseCapture)?;
        }
        execute!(
            self.terminal.backend_mut(),
            DisableBracketedPaste,
            LeaveAlternateScreen
        )?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            tracing::warn!(%err, "failed to restore terminal");
        }
    }
}

/// Install a panic hook that restores the terminal before the panic message
/// is printed.
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(
            io::stdout(),
            DisableMouseCapture,
            DisableBracketedPaste,
            LeaveAlternateScreen
        );

        original_hook(panic_info);
    }));
}
