// Helpers that turn raw host access into checked results.

use std::path::Path;

use itertools::Itertools;
use tracing::trace;

use crate::Error;
use crate::pal::Host;

/// Reads a file and returns its contents with surrounding whitespace removed.
pub(crate) fn read_trimmed(host: &impl Host, path: &Path) -> crate::Result<String> {
    let contents = host
        .read_to_string(path)
        .map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;

    trace!(path = %path.display(), %contents, "read host file");

    Ok(contents.trim().to_string())
}

/// Reads a file that must contain a single non-negative decimal integer.
pub(crate) fn read_u64(host: &impl Host, path: &Path) -> crate::Result<u64> {
    let contents = read_trimmed(host, path)?;

    parse_u64(&path.display().to_string(), &contents)
}

/// Parses a value that must consist only of ASCII digits.
pub(crate) fn parse_u64(origin: &str, value: &str) -> crate::Result<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::unexpected_output(origin, value, "expected an integer"));
    }

    value
        .parse()
        .map_err(|_parse_error| Error::unexpected_output(origin, value, "integer is out of range"))
}

/// Runs a command and returns its standard output, failing if the command does not succeed.
pub(crate) fn check_output(host: &impl Host, program: &str, args: &[&str]) -> crate::Result<String> {
    let command = std::iter::once(program).chain(args.iter().copied()).join(" ");
    let args: Vec<String> = args.iter().map(ToString::to_string).collect();

    let output = host.run(program, &args).map_err(|e| Error::Command {
        command: command.clone(),
        detail: e.to_string(),
    })?;

    if !output.success {
        return Err(Error::Command {
            command,
            detail: format!("exited with failure status: {}", output.stderr.trim()),
        });
    }

    trace!(%command, stdout = %output.stdout, "command succeeded");

    Ok(output.stdout)
}
