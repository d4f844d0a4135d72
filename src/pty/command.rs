use log::debug;
use portable_pty::CommandBuilder;

/// Executable and arguments used to launch the interactive shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellProgram {
    pub program: String,
    pub args: Vec<String>,
}

impl ShellProgram {
    #[must_use]
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
        }
    }

    /// `cmd.exe /Q` on Windows, an interactive bash elsewhere
    #[must_use]
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            Self::new("cmd.exe", &["/Q"])
        } else {
            Self::new("/bin/bash", &["-i"])
        }
    }
}

impl Default for ShellProgram {
    fn default() -> Self {
        Self::platform_default()
    }
}

impl std::fmt::Display for ShellProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

impl From<&ShellProgram> for CommandBuilder {
    fn from(shell: &ShellProgram) -> Self {
        debug!("Building shell command '{shell}'");
        let mut command_builder = CommandBuilder::new(&shell.program);
        command_builder.args(&shell.args);
        for (key, value) in std::env::vars() {
            command_builder.env(key, value);
        }
        // Output is displayed, not emulated: ask programs for plain text
        command_builder.env("TERM", "dumb");
        if let Ok(cwd) = std::env::current_dir() {
            command_builder.cwd(cwd);
        }
        command_builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_args() {
        let shell = ShellProgram::new("sh", &["-c", "exit 0"]);
        assert_eq!(shell.to_string(), "sh -c exit 0");
    }

    #[cfg(unix)]
    #[test]
    fn test_platform_default_is_interactive_bash() {
        assert_eq!(
            ShellProgram::platform_default(),
            ShellProgram::new("/bin/bash", &["-i"])
        );
    }
}
