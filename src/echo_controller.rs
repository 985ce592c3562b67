use crate::siglent_scope::{FormatMismatch, ScopeError};
use crate::transport::{Transport, TransportError};
use std::ops::{Deref, DerefMut};

/// Whether replies carry the echoed command header (`C1:VDIV 5.00E-01V`)
/// or only the bare value (`5.00E-01V`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoMode {
    Verbose,
    Quiet,
}

impl EchoMode {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            EchoMode::Verbose
        } else {
            EchoMode::Quiet
        }
    }

    pub fn command(&self) -> &'static str {
        match self {
            EchoMode::Verbose => "COMM_HEADER LONG",
            EchoMode::Quiet => "COMM_HEADER OFF",
        }
    }
}

/// Owns the transport and tracks the echo mode the instrument was last put in.
pub struct EchoController<T: Transport> {
    transport: T,
    mode: EchoMode,
}

impl<T: Transport> EchoController<T> {
    /// Wrap a transport whose instrument is known to be in `mode`.
    pub fn new(transport: T, mode: EchoMode) -> Self {
        Self { transport, mode }
    }

    pub fn mode(&self) -> EchoMode {
        self.mode
    }

    pub fn set_echo_mode(&mut self, verbose: bool) -> Result<(), TransportError> {
        let mode = EchoMode::from_verbose(verbose);
        self.write(mode.command())?;
        self.mode = mode;
        Ok(())
    }

    pub fn write(&mut self, command: &str) -> Result<(), TransportError> {
        log::debug!("-> {}", command);
        self.transport.write(command)
    }

    /// Query without regard to the echo mode. Only for replies that are
    /// not parsed into values, such as `*IDN?`.
    pub fn query_unchecked(&mut self, command: &str) -> Result<String, TransportError> {
        log::debug!("-> {}", command);
        let response = self.transport.query(command)?;
        log::debug!("<- {}", response.trim_end());
        Ok(response)
    }

    /// Query a value for parsing. Fails before touching the transport if the
    /// instrument would prefix the reply with a command header.
    pub fn query_terse(&mut self, command: &str) -> Result<String, ScopeError> {
        if self.mode == EchoMode::Verbose {
            return Err(ScopeError::UnexpectedResponseFormat {
                command: command.to_string(),
                mismatch: FormatMismatch::EchoModeActive,
            });
        }
        let response = self.query_unchecked(command)?;
        Ok(response.trim_end().to_string())
    }

    pub fn read_raw(&mut self) -> Result<Vec<u8>, TransportError> {
        self.transport.read_raw()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Switch to QUIET for the lifetime of the returned guard, restoring
    /// VERBOSE when it goes out of scope if that is what was active.
    pub fn quiet(&mut self) -> Result<QuietGuard<'_, T>, TransportError> {
        let restore = self.mode == EchoMode::Verbose;
        if restore {
            log::debug!("Silencing command headers for the duration of a query");
            self.set_echo_mode(false)?;
        }
        Ok(QuietGuard {
            controller: self,
            restore,
        })
    }
}

pub struct QuietGuard<'c, T: Transport> {
    controller: &'c mut EchoController<T>,
    restore: bool,
}

impl<T: Transport> QuietGuard<'_, T> {
    /// Restore the previous mode now and report a failure to do so.
    pub fn finish(mut self) -> Result<(), TransportError> {
        if std::mem::take(&mut self.restore) {
            self.controller.set_echo_mode(true)
        } else {
            Ok(())
        }
    }
}

impl<T: Transport> Deref for QuietGuard<'_, T> {
    type Target = EchoController<T>;

    fn deref(&self) -> &Self::Target {
        self.controller
    }
}

impl<T: Transport> DerefMut for QuietGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.controller
    }
}

impl<T: Transport> Drop for QuietGuard<'_, T> {
    fn drop(&mut self) {
        if self.restore {
            if let Err(e) = self.controller.set_echo_mode(true) {
                log::warn!("Failed to restore verbose command headers: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::FakeSiglent;

    #[test]
    fn test_set_echo_mode_sends_command() {
        let mut controller = EchoController::new(FakeSiglent::new(), EchoMode::Verbose);
        controller.set_echo_mode(false).unwrap();
        assert_eq!(controller.mode(), EchoMode::Quiet);
        assert!(!controller.transport().header_long);
        assert_eq!(controller.transport().written, vec!["COMM_HEADER OFF"]);

        controller.set_echo_mode(true).unwrap();
        assert_eq!(controller.mode(), EchoMode::Verbose);
        assert!(controller.transport().header_long);
    }

    #[test]
    fn test_terse_query_refused_while_verbose() {
        let mut controller = EchoController::new(FakeSiglent::new(), EchoMode::Verbose);
        let result = controller.query_terse("TIME_DIV?");
        assert!(matches!(
            result,
            Err(ScopeError::UnexpectedResponseFormat {
                mismatch: FormatMismatch::EchoModeActive,
                ..
            })
        ));
        assert!(controller.transport().written.is_empty());
    }

    #[test]
    fn test_guard_restores_verbose() {
        let mut controller = EchoController::new(FakeSiglent::new(), EchoMode::Verbose);
        {
            let mut quiet = controller.quiet().unwrap();
            assert_eq!(quiet.mode(), EchoMode::Quiet);
            assert_eq!(quiet.query_terse("TIME_DIV?").unwrap(), "5.00E-04S");
        }
        assert_eq!(controller.mode(), EchoMode::Verbose);
        assert!(controller.transport().header_long);
    }

    #[test]
    fn test_guard_leaves_quiet_untouched() {
        let mut fake = FakeSiglent::new();
        fake.header_long = false;
        let mut controller = EchoController::new(fake, EchoMode::Quiet);
        controller.quiet().unwrap().finish().unwrap();
        assert_eq!(controller.mode(), EchoMode::Quiet);
        assert!(controller.transport().written.is_empty());
    }

    #[test]
    fn test_finish_restores_once() {
        let mut controller = EchoController::new(FakeSiglent::new(), EchoMode::Verbose);
        controller.quiet().unwrap().finish().unwrap();
        assert_eq!(controller.mode(), EchoMode::Verbose);
        assert_eq!(
            controller.transport().written,
            vec!["COMM_HEADER OFF", "COMM_HEADER LONG"]
        );
    }
}
