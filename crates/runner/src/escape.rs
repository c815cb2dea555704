/// Quotes `command` so that `sh -c <escaped>` receives it byte for byte.
///
/// The whole command is wrapped in single quotes and every embedded `'`
/// becomes `'\''`. Nothing is special inside single quotes, so backticks,
/// `$` and newlines reach the remote shell untouched.
pub fn escape_command(command: &str) -> String {
  let mut escaped = String::with_capacity(command.len() + 2);
  escaped.push('\'');

  for ch in command.chars() {
    if ch == '\'' {
      escaped.push_str("'\\''");
    } else {
      escaped.push(ch);
    }
  }

  escaped.push('\'');
  escaped
}

/// The command line sent over the channel for a run step.
pub fn shell_command(shell: &str, command: &str) -> String {
  format!("{} -c {}", shell, escape_command(command))
}
