use crate::theme;
use anstyle::{AnsiColor, Reset, RgbColor, Style};

const PRIMARY_COLOR: Style = Style::new().fg_color(Some(anstyle::Color::Rgb(RgbColor(
    theme::ACCENT_RGB.0,
    theme::ACCENT_RGB.1,
    theme::ACCENT_RGB.2,
))));
const SUCCESS_COLOR: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Green)));
const ERROR_COLOR: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Red)));

/// Prefix of the echo line written to the output pane for every dispatched command
pub const ECHO_PREFIX: &str = "> ";

fn render_arrow() -> String {
    format!("{PRIMARY_COLOR}❱{Reset}")
}

fn render_success() -> String {
    format!("{SUCCESS_COLOR}✓{Reset}")
}

fn render_error() -> String {
    format!("{ERROR_COLOR}✘{Reset}")
}

/// Plain echo of a dispatched command, as shown in the output pane
#[must_use]
pub fn format_echo(command: &str) -> String {
    format!("{ECHO_PREFIX}{command}\n")
}

/// Styled banner printed by the `run` subcommand before the shell starts
#[must_use]
pub fn format_start_message(command: &str) -> String {
    format!("{} {}\n", render_arrow(), command)
}

#[must_use]
pub fn format_success_message() -> String {
    format!("\n{} Command succeeded {}\n", render_arrow(), render_success())
}

#[must_use]
pub fn format_failure_message(exit_code: u32) -> String {
    format!(
        "\n{} Command failed {} (exit code {})\n",
        render_arrow(),
        render_error(),
        exit_code
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_is_plain() {
        assert_eq!(format_echo("ls -la"), "> ls -la\n");
    }

    #[test]
    fn test_failure_message_mentions_code() {
        let text = strip_ansi_escapes::strip_str(format_failure_message(2));
        assert_eq!(text, "\n❱ Command failed ✘ (exit code 2)\n");
    }
}
