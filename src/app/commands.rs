//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (web UI, chat
//! bot) that the [`AppService`](super::service::AppService) interprets.

use core::fmt;
use core::str::FromStr;

/// Manual relay commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayCommand {
    /// Take manual control and switch the relay on.
    On,
    /// Take manual control and switch the relay off.
    Off,
    /// Hand the relay back to automation.
    Reset,
    /// Switch every output off and hand all of them back to automation.
    ResetAll,
}

/// The command word was not one of `on`, `off`, `reset`, `reset_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownCommand;

impl fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown relay command")
    }
}

impl FromStr for RelayCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            "reset" => Ok(Self::Reset),
            "reset_all" => Ok(Self::ResetAll),
            _ => Err(UnknownCommand),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transport_words() {
        assert_eq!("on".parse(), Ok(RelayCommand::On));
        assert_eq!("reset_all".parse(), Ok(RelayCommand::ResetAll));
        assert_eq!("toggle".parse::<RelayCommand>(), Err(UnknownCommand));
    }
}
