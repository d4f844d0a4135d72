//! Run a command in a new OS terminal window

use std::process::Command;

use log::info;

#[derive(thiserror::Error, Debug)]
#[error("Unable to open an external terminal with `{launcher}`: {source}")]
pub struct LaunchError {
    launcher: String,
    source: std::io::Error,
}

/// Build the platform launcher for `command`, keeping the window open afterwards
#[must_use]
pub fn terminal_command(command: &str) -> Command {
    if cfg!(windows) {
        let mut launcher = Command::new("cmd");
        launcher.args(["/C", "start", "cmd", "/K", command]);
        launcher
    } else if cfg!(target_os = "macos") {
        let script = format!(
            "tell application \"Terminal\" to do script \"{}\"",
            command.replace('\\', "\\\\").replace('"', "\\\"")
        );
        let mut launcher = Command::new("osascript");
        launcher.args(["-e", &script]);
        launcher
    } else {
        let mut launcher = Command::new("x-terminal-emulator");
        launcher.args(["-e", "bash", "-c", &format!("{command}; exec bash")]);
        launcher
    }
}

/// Spawn `command` in an external terminal without waiting for it.
///
/// # Errors
///
/// Returns `LaunchError` if the terminal launcher cannot be started.
pub fn launch(command: &str) -> Result<(), LaunchError> {
    let mut launcher = terminal_command(command);
    launcher.spawn().map_err(|source| LaunchError {
        launcher: launcher.get_program().to_string_lossy().into_owned(),
        source,
    })?;
    info!("Launched '{command}' in an external terminal");
    Ok(())
}
