use std::collections::HashMap;
use std::io::{IsTerminal, Write};
use std::process::ExitCode;
use std::time::Duration;

use clap::Args;
use log::debug;

use tooldeck::commands::catalog::Catalog;
use tooldeck::commands::template::{ParamKind, render};
use tooldeck::pty::messages::{format_failure_message, format_start_message, format_success_message};
use tooldeck::pty::{SessionState, ShellProgram, ShellSession, TerminalSize};

/// How often the session is polled for output and exit
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Command path as `category/tool/command`
    path: String,

    /// Parameter value as `name=value` (repeatable)
    #[arg(short = 'p', long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.to_string()))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| format!("expected name=value, got `{raw}`"))
}

/// Ask for every parameter not given on the command line
fn collect_values(
    parameters: Vec<(String, ParamKind)>,
    given: &[(String, String)],
) -> Result<HashMap<String, String>, Box<dyn std::error::Error>> {
    let mut values: HashMap<String, String> = given.iter().cloned().collect();
    let interactive = std::io::stdin().is_terminal();
    for (name, kind) in parameters {
        if values.contains_key(&name) {
            continue;
        }
        if !interactive {
            return Err(format!("missing value for parameter `{name}` (pass -p {name}=...)").into());
        }
        let help = match kind {
            ParamKind::String => "text",
            ParamKind::File => "path to a file",
            ParamKind::FileOrString => "path to a file, or plain text",
        };
        let value = inquire::Text::new(&format!("{name}:"))
            .with_help_message(help)
            .prompt()?;
        values.insert(name, value);
    }
    Ok(values)
}

/// Run one catalog command in a fresh shell and mirror its output.
///
/// The shell is told to exit after the command, so the process exit code is
/// the command's.
///
/// # Errors
///
/// Returns an error if the path does not resolve, a parameter is missing, or the
/// shell cannot be started.
pub async fn run(args: &RunArgs, catalog: &Catalog) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let command = catalog.resolve_path(&args.path)?;
    let values = collect_values(command.parameters(), &args.params)?;
    let line = render(&command.template, &values);

    let size = crossterm::terminal::size()
        .map_or_else(|_| TerminalSize::default(), |(cols, rows)| TerminalSize::new(cols, rows));
    let mut session = ShellSession::new(ShellProgram::platform_default(), size);
    let output = session.subscribe();

    eprint!("{}", format_start_message(&line));
    session.start()?;
    session.write(&line)?;
    session.write("exit")?;

    let mut tick = tokio::time::interval(POLL_INTERVAL);
    let mut stdout = std::io::stdout();
    loop {
        tokio::select! {
            _ = tick.tick() => {
                session.pump();
                for event in output.try_iter() {
                    stdout.write_all(event.text.as_bytes())?;
                }
                stdout.flush()?;
                if session.refresh_state() == SessionState::Exited && !session.output_open() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("Received Ctrl+C, stopping shell");
                session.terminate()?;
                break;
            }
        }
    }

    let code = session.exit_code().unwrap_or(1);
    if code == 0 {
        eprint!("{}", format_success_message());
        Ok(ExitCode::SUCCESS)
    } else {
        eprint!("{}", format_failure_message(code));
        Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("host=example.org"),
            Ok(("host".to_string(), "example.org".to_string()))
        );
        assert_eq!(
            parse_param("q=a=b"),
            Ok(("q".to_string(), "a=b".to_string()))
        );
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=x").is_err());
    }

    #[test]
    fn test_given_values_skip_prompts() {
        let values = collect_values(
            vec![("host".to_string(), ParamKind::String)],
            &[("host".to_string(), "localhost".to_string())],
        )
        .unwrap();
        assert_eq!(values["host"], "localhost");
    }
}
