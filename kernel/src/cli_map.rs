//! The fixed command → message mapping the interactive shell (out of this
//! crate's scope) drives the core through.
//!
//! The shell itself — line editing, the UART it reads from — is an
//! external collaborator. But which message a given command produces, and
//! which registered service it targets, is part of the core's contract:
//! get it wrong here and every shell built against this kernel disagrees
//! with every other one about what `crash` means. So the mapping lives
//! here, as a thin, fully-tested adapter, rather than being left for each
//! shell implementation to reinvent.

use abi::{EndpointId, Message, MsgType};

/// One parsed command line.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CliCommand<'a> {
    /// `services` — list every registered service name.
    Services,
    /// `log <text>` — send a `LOG` message to the `log` service.
    Log(&'a str),
    /// `ipcecho <text>` — send an `ECHO` message to the `echo` service.
    IpcEcho(&'a str),
    /// `timertick` — force one timer fan-out tick.
    TimerTick,
    /// `crash` — send a `CRASH` message to the `echo` service.
    Crash,
    /// `bench [n]` — run the benchmark harness for `n` iterations
    /// (defaults to 1000 when omitted).
    Bench(usize),
    /// `halt` — stop the system.
    Halt,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CliError {
    /// The leading word did not match any known command.
    UnknownCommand,
    /// A command that requires an argument was given none.
    MissingArgument,
    /// An argument was present but could not be parsed (e.g. `bench abc`).
    InvalidArgument,
}

impl<'a> CliCommand<'a> {
    /// Parses one line of input. Unknown commands are reported here, not by
    /// the core's message-handling path, matching the rule that every
    /// recognized command maps to exactly one message exchange.
    pub fn parse(line: &'a str) -> Result<CliCommand<'a>, CliError> {
        let line = line.trim();
        let (word, rest) = match line.split_once(' ') {
            Some((w, r)) => (w, r.trim()),
            None => (line, ""),
        };
        match word {
            "services" => Ok(CliCommand::Services),
            "log" => {
                if rest.is_empty() {
                    Err(CliError::MissingArgument)
                } else {
                    Ok(CliCommand::Log(rest))
                }
            }
            "ipcecho" => {
                if rest.is_empty() {
                    Err(CliError::MissingArgument)
                } else {
                    Ok(CliCommand::IpcEcho(rest))
                }
            }
            "timertick" => Ok(CliCommand::TimerTick),
            "crash" => Ok(CliCommand::Crash),
            "bench" => {
                if rest.is_empty() {
                    Ok(CliCommand::Bench(1000))
                } else {
                    rest.parse()
                        .map(CliCommand::Bench)
                        .map_err(|_| CliError::InvalidArgument)
                }
            }
            "halt" => Ok(CliCommand::Halt),
            "" => Err(CliError::UnknownCommand),
            _ => Err(CliError::UnknownCommand),
        }
    }

    /// For commands that resolve to exactly one message, the message to
    /// send and the name of the service it targets. `Services`, `Bench`
    /// and `Halt` don't go over IPC at all, so they return `None` here —
    /// the shell drives them directly.
    pub fn as_message(&self, sender: EndpointId) -> Option<(Message, &'static str)> {
        match *self {
            CliCommand::Log(text) => Some((Message::new(MsgType::Log, sender, text.as_bytes()), "log")),
            CliCommand::IpcEcho(text) => {
                Some((Message::new(MsgType::Echo, sender, text.as_bytes()), "echo"))
            }
            CliCommand::Crash => Some((Message::new(MsgType::Crash, sender, &[]), "echo")),
            CliCommand::TimerTick | CliCommand::Services | CliCommand::Bench(_) | CliCommand::Halt => {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_services_with_no_argument() {
        assert_eq!(CliCommand::parse("services"), Ok(CliCommand::Services));
    }

    #[test]
    fn parses_log_with_its_text() {
        assert_eq!(CliCommand::parse("log hello world"), Ok(CliCommand::Log("hello world")));
    }

    #[test]
    fn log_without_text_is_missing_argument() {
        assert_eq!(CliCommand::parse("log"), Err(CliError::MissingArgument));
        assert_eq!(CliCommand::parse("log   "), Err(CliError::MissingArgument));
    }

    #[test]
    fn bench_defaults_to_1000_iterations() {
        assert_eq!(CliCommand::parse("bench"), Ok(CliCommand::Bench(1000)));
    }

    #[test]
    fn bench_parses_explicit_count() {
        assert_eq!(CliCommand::parse("bench 42"), Ok(CliCommand::Bench(42)));
    }

    #[test]
    fn bench_rejects_non_numeric_count() {
        assert_eq!(CliCommand::parse("bench abc"), Err(CliError::InvalidArgument));
    }

    #[test]
    fn unknown_command_is_reported() {
        assert_eq!(CliCommand::parse("frobnicate"), Err(CliError::UnknownCommand));
        assert_eq!(CliCommand::parse(""), Err(CliError::UnknownCommand));
    }

    #[test]
    fn ipcecho_maps_to_an_echo_message_for_the_echo_service() {
        let cmd = CliCommand::parse("ipcecho hi").unwrap();
        let (msg, service) = cmd.as_message(EndpointId(3)).unwrap();
        assert_eq!(service, "echo");
        assert_eq!(msg.ty(), MsgType::Echo);
        assert_eq!(msg.payload_bytes(), b"hi");
    }

    #[test]
    fn crash_maps_to_a_crash_message_for_the_echo_service() {
        let cmd = CliCommand::Crash;
        let (msg, service) = cmd.as_message(EndpointId(0)).unwrap();
        assert_eq!(service, "echo");
        assert_eq!(msg.ty(), MsgType::Crash);
    }

    #[test]
    fn services_bench_and_halt_do_not_produce_a_message() {
        assert!(CliCommand::Services.as_message(EndpointId(0)).is_none());
        assert!(CliCommand::Bench(10).as_message(EndpointId(0)).is_none());
        assert!(CliCommand::Halt.as_message(EndpointId(0)).is_none());
    }
}
