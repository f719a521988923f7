use is_terminal::IsTerminal;
use std::{
    env,
    io::{self, Write},
    process::{Child, Command, ExitStatus, Stdio},
};

const DEFAULT_PAGER: &str = "less -R";

/// Program and arguments for the pager named by `$PAGER`.
pub fn pager_command(pager_env: Option<&str>) -> (String, Vec<String>) {
    let command_line = pager_env
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_PAGER);

    let mut parts = command_line.split_whitespace().map(str::to_string);
    let program = parts.next().unwrap_or_else(|| "less".to_string());
    (program, parts.collect())
}

/// Write `text` through the pager when stdout is a terminal, to `out` otherwise.
pub fn page(text: &str, enabled: bool, out: &mut impl Write) -> io::Result<()> {
    if !enabled || !io::stdout().is_terminal() {
        return print(text, out);
    }

    let pager_env = env::var("PAGER").ok();
    let (program, args) = pager_command(pager_env.as_deref());

    let child = match Command::new(&program).args(&args).stdin(Stdio::piped()).spawn() {
        Ok(child) => child,
        Err(e) => {
            tracing::debug!(program = %program, error = %e, "pager unavailable, printing directly");
            return print(text, out);
        }
    };

    feed(child, text).map(|_| ())
}

/// Pipe `text` into the pager and wait for it to exit, even when writing fails.
fn feed(mut child: Child, text: &str) -> io::Result<ExitStatus> {
    let written = match child.stdin.take() {
        Some(mut stdin) => stdin.write_all(text.as_bytes()),
        None => Ok(()),
    };

    let status = child.wait()?;
    match written {
        // The user may quit the pager before reading everything.
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e),
        _ => Ok(status),
    }
}

fn print(text: &str, out: &mut impl Write) -> io::Result<()> {
    out.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    out.flush()
}
