//! Opens SSH sessions and VNC viewers in external programs.

use std::env;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use super::{Launcher, VmSummary};
use crate::error::PanelError;
use crate::settings::LaunchSettings;

/// Tried in order when no terminal is configured.
const TERMINALS: &[&str] = &[
    "x-terminal-emulator",
    "gnome-terminal",
    "konsole",
    "alacritty",
    "kitty",
    "wezterm",
    "xterm",
];

/// Tried in order when no VNC viewer is configured.
const VNC_VIEWERS: &[&str] = &["vncviewer", "remmina", "gvncviewer", "vinagre"];

const HOST: &str = "127.0.0.1";

/// [`Launcher`] spawning detached processes on the local machine.
///
/// Commands come from the [`LaunchSettings`] passed with each call, so an
/// edited setting applies to the next launch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl SystemLauncher {
    /// Configured terminal prefix, or the first terminal found on `PATH`.
    fn terminal_command(settings: &LaunchSettings) -> Option<Vec<String>> {
        let configured = split_command(&settings.terminal);
        if !configured.is_empty() {
            return Some(configured);
        }
        let program = TERMINALS.iter().find(|name| find_in_path(name).is_some())?;
        let flag = match *program {
            "gnome-terminal" => "--",
            "wezterm" => "start",
            _ => "-e",
        };
        Some(vec![program.to_string(), flag.to_string()])
    }

    fn vnc_command(settings: &LaunchSettings) -> Option<Vec<String>> {
        let configured = split_command(&settings.vnc_viewer);
        if !configured.is_empty() {
            return Some(configured);
        }
        VNC_VIEWERS
            .iter()
            .find(|name| find_in_path(name).is_some())
            .map(|name| vec![name.to_string()])
    }
}

impl Launcher for SystemLauncher {
    fn open_ssh(&self, vm: &VmSummary, settings: &LaunchSettings) -> Result<(), PanelError> {
        let port = vm
            .ssh_port
            .ok_or_else(|| PanelError::ResourceUnavailable(format!("{} has no SSH port", vm.name)))?;
        let mut argv = Self::terminal_command(settings)
            .ok_or_else(|| PanelError::ResourceUnavailable("no terminal emulator found".into()))?;
        argv.extend(ssh_args(vm, port));
        spawn_detached(&argv)
    }

    fn open_vnc(&self, vm: &VmSummary, settings: &LaunchSettings) -> Result<(), PanelError> {
        let port = vm
            .vnc_port
            .ok_or_else(|| PanelError::ResourceUnavailable(format!("{} has no VNC port", vm.name)))?;
        let mut argv = Self::vnc_command(settings)
            .ok_or_else(|| PanelError::ResourceUnavailable("no VNC viewer found".into()))?;
        argv.push(format!("{HOST}::{port}"));
        spawn_detached(&argv)
    }
}

fn ssh_args(vm: &VmSummary, port: u16) -> Vec<String> {
    vec![
        "ssh".to_string(),
        "-p".to_string(),
        port.to_string(),
        format!("{}@{HOST}", vm.ssh_user),
    ]
}

fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

fn find_in_path(program: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

fn spawn_detached(argv: &[String]) -> Result<(), PanelError> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| PanelError::ResourceUnavailable("empty command".into()))?;
    tracing::info!(%program, ?args, "launching");
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_child| ())
        .map_err(|err| PanelError::ResourceUnavailable(format!("{program}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::VmState;

    fn vm(ssh_port: Option<u16>) -> VmSummary {
        VmSummary {
            name: "alpha".to_string(),
            state: VmState::Running,
            pid: Some(1),
            ssh_port,
            vnc_port: None,
            ssh_user: "ops".to_string(),
        }
    }

    #[test]
    fn test_ssh_args() {
        assert_eq!(
            ssh_args(&vm(Some(2222)), 2222),
            ["ssh", "-p", "2222", "ops@127.0.0.1"]
        );
    }

    #[test]
    fn test_missing_ports_are_unavailable() {
        let settings = LaunchSettings::default();
        assert!(matches!(
            SystemLauncher.open_ssh(&vm(None), &settings),
            Err(PanelError::ResourceUnavailable(_))
        ));
        assert!(matches!(
            SystemLauncher.open_vnc(&vm(Some(2222)), &settings),
            Err(PanelError::ResourceUnavailable(_))
        ));
    }

    #[test]
    fn test_configured_command_wins() {
        let settings = LaunchSettings {
            terminal: "foot -e".to_string(),
            vnc_viewer: "  remmina  ".to_string(),
        };
        assert_eq!(
            SystemLauncher::terminal_command(&settings),
            Some(vec!["foot".into(), "-e".into()])
        );
        assert_eq!(SystemLauncher::vnc_command(&settings), Some(vec!["remmina".into()]));
    }
}
