//! Configurable runtime assertions.

use super::Origin;
use crate::error::{Error, Result};
use crate::runtime::CascadeConfig;

/// Checks a runtime invariant.
///
/// Returns `Ok(true)` when `holds` is true. A violated invariant returns
/// `Ok(false)` silently when runtime assertions are disabled, returns a
/// `StateConflict` error with fail-fast, and is logged at `warn` otherwise.
pub fn runtime_assert(config: &CascadeConfig, holds: bool, what: &str) -> Result<bool> {
    if holds {
        return Ok(true);
    }
    if !config.runtime_assertions {
        return Ok(false);
    }
    if config.fail_fast {
        tracing::error!(assertion = %what, "runtime assertion failed");
        return Err(Error::state_conflict(format!("assertion failed: {what}")));
    }
    tracing::warn!(assertion = %what, "runtime assertion failed; continuing");
    Ok(false)
}

/// Reports a state-machine conflict on a node.
///
/// With fail-fast the conflict is returned as an error; otherwise it is
/// logged and `Ok(())` is returned so the caller can carry on.
pub fn state_conflict(config: &CascadeConfig, origin: Origin, what: &str) -> Result<()> {
    if config.fail_fast {
        tracing::error!(origin = %origin, conflict = %what, "state conflict");
        return Err(Error::state_conflict(format!("{what} (node created at {origin})")));
    }
    tracing::warn!(origin = %origin, conflict = %what, "state conflict ignored");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_utils::init_test;

    fn config(fail_fast: bool, runtime_assertions: bool) -> CascadeConfig {
        CascadeConfig {
            fail_fast,
            runtime_assertions,
            ..CascadeConfig::default()
        }
    }

    #[test]
    fn holding_assertion_is_ok() {
        init_test("holding_assertion_is_ok");
        assert!(runtime_assert(&config(true, true), true, "always").unwrap());
        crate::test_complete!("holding_assertion_is_ok");
    }

    #[test]
    fn fail_fast_returns_state_conflict() {
        init_test("fail_fast_returns_state_conflict");
        let err = runtime_assert(&config(true, true), false, "queue empty").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
        crate::test_complete!("fail_fast_returns_state_conflict");
    }

    #[test]
    fn lenient_mode_logs_and_continues() {
        init_test("lenient_mode_logs_and_continues");
        assert!(!runtime_assert(&config(false, true), false, "queue empty").unwrap());
        assert!(state_conflict(&config(false, true), Origin::here(), "double fork").is_ok());
        crate::test_complete!("lenient_mode_logs_and_continues");
    }

    #[test]
    fn disabled_assertions_are_silent() {
        init_test("disabled_assertions_are_silent");
        assert!(!runtime_assert(&config(true, false), false, "ignored").unwrap());
        crate::test_complete!("disabled_assertions_are_silent");
    }

    #[test]
    fn conflict_message_names_origin() {
        init_test("conflict_message_names_origin");
        let origin = Origin::here();
        let err = state_conflict(&config(true, true), origin, "double fork").unwrap_err();
        let message = err.message().unwrap_or_default().to_string();
        assert!(message.contains("double fork"));
        assert!(message.contains(&origin.to_string()));
        crate::test_complete!("conflict_message_names_origin");
    }
}
