use std::process::Command;

use super::error::{Result, SignalError};
use super::types::{CommandOutput, Contact};
use crate::config::DaemonConfig;

/// Builds and runs signal-cli invocations for one account
#[derive(Debug, Clone)]
pub struct SignalCli {
    daemon: DaemonConfig,
    account: String,
}

impl SignalCli {
    pub fn new(daemon: DaemonConfig, account: impl Into<String>) -> Self {
        Self {
            daemon,
            account: account.into(),
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn daemon_config(&self) -> &DaemonConfig {
        &self.daemon
    }

    /// `<program> <prefix args...> <args...>` in the configured working dir
    pub fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut cmd = Command::new(&self.daemon.program);
        cmd.args(&self.daemon.args);
        if let Some(dir) = self.daemon.working_dir() {
            cmd.current_dir(dir);
        }
        cmd.args(args);
        cmd
    }

    /// Same as [`command`](Self::command) with `-a <account>` in front
    pub fn account_command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut cmd = self.command(["-a", self.account.as_str()]);
        cmd.args(args);
        cmd
    }

    fn run(&self, label: &str, mut cmd: Command) -> Result<CommandOutput> {
        log::debug!("Running {:?}", cmd);
        let output = cmd.output()?;
        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            code: output.status.code(),
        };
        log::info!("signal-cli {} exited with {:?}", label, result.code);
        Ok(result)
    }

    /// Fetch pending messages once, waiting up to the configured timeout
    pub fn receive_once(&self) -> Result<CommandOutput> {
        let timeout = self.daemon.receive_timeout.to_string();
        self.run("receive", self.account_command(["receive", "-t", timeout.as_str()]))
    }

    pub fn list_contacts(&self) -> Result<Vec<Contact>> {
        let output = self.run("listContacts", self.account_command(["listContacts"]))?;
        if !output.success() {
            return Err(SignalError::CommandFailed {
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout.lines().filter_map(parse_contact_line).collect())
    }

    pub fn send(&self, recipient: &str, message: &str) -> Result<()> {
        let recipient = recipient.trim();
        let message = message.trim();
        if recipient.is_empty() || message.is_empty() {
            return Err(SignalError::EmptyMessage);
        }

        let output = self.run("send", self.account_command(["send", "-m", message, recipient]))?;
        if output.success() {
            Ok(())
        } else {
            Err(SignalError::CommandFailed {
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}

/// Pick the first "+..." token of a listContacts line as the number
pub fn parse_contact_line(line: &str) -> Option<Contact> {
    let raw = line.trim();
    if raw.is_empty() {
        return None;
    }
    let number = raw
        .split_whitespace()
        .find(|t| t.starts_with('+'))
        .map(|t| t.trim_end_matches(|c: char| c == ',' || c == ')').to_string());
    Some(Contact {
        number,
        raw: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(program: &str, args: &[&str]) -> SignalCli {
        let daemon = DaemonConfig {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            ..DaemonConfig::default()
        };
        SignalCli::new(daemon, "+2222")
    }

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_command_includes_prefix_and_account() {
        let cli = cli("java", &["-cp", "lib/*", "org.asamk.signal.Main"]);
        assert_eq!(cli.account(), "+2222");
        let cmd = cli.account_command(["receive", "-t", "10"]);
        assert_eq!(cmd.get_program(), "java");
        assert_eq!(
            args_of(&cmd),
            vec!["-cp", "lib/*", "org.asamk.signal.Main", "-a", "+2222", "receive", "-t", "10"]
        );
    }

    #[test]
    fn test_send_rejects_empty() {
        let cli = cli("signal-cli", &[]);
        assert!(matches!(cli.send("  ", "hi"), Err(SignalError::EmptyMessage)));
        assert!(matches!(cli.send("+3333", " \n"), Err(SignalError::EmptyMessage)));
    }

    #[test]
    fn test_send_reports_failure() {
        // `sh -c <script>` ignores the trailing signal-cli arguments
        let cli = cli("sh", &["-c", "echo 'Unregistered user' >&2; exit 3"]);
        match cli.send("+3333", "hello") {
            Err(SignalError::CommandFailed { code, stderr }) => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "Unregistered user");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_list_contacts() {
        let cli = cli(
            "sh",
            &["-c", "printf 'Number: +1111 Name: Alice Blocked: false\\n\\nNumber:  Name: Group\\n'"],
        );
        let contacts = cli.list_contacts().unwrap();
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].id(), "+1111");
        assert_eq!(contacts[1].number, None);
        assert_eq!(contacts[1].id(), "Number:  Name: Group");
    }

    #[test]
    fn test_receive_once_captures_output() {
        let cli = cli("sh", &["-c", "printf 'Body: hi\\n'; echo 'WARN slow' >&2"]);
        let output = cli.receive_once().unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, "Body: hi\n");
        assert_eq!(output.stderr, "WARN slow\n");
    }

    #[test]
    fn test_parse_contact_line() {
        assert_eq!(parse_contact_line("   "), None);
        let c = parse_contact_line("Some Chat (+447700900000)").unwrap();
        assert_eq!(c.number, None);
        let c = parse_contact_line("Some Chat +447700900000,").unwrap();
        assert_eq!(c.number.as_deref(), Some("+447700900000"));
    }
}
