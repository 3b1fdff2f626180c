//! Channel configuration
//!
//! A [`ChannelConfig`] says exactly how to spawn one tool server: command,
//! arguments, the environment it is allowed to see, and the channel's
//! timeouts. The child never inherits the parent's environment implicitly —
//! only the declared variables (scoped credentials, table identifiers,
//! region) are propagated, which keeps channel lifecycles independently
//! testable.

use std::collections::BTreeMap;
use std::time::Duration;

/// Default handshake timeout.
const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default per-call timeout. Media-analysis calls have been observed to run
/// ~7 minutes against the recognition service; the default sits safely
/// above that.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(600);

/// Default grace period between the close signal and a forced kill.
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Configuration for one subprocess tool server.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Short name used in logs and error messages (e.g. "castd").
    pub name: String,
    /// Executable implementing the wire protocol. Any language works.
    pub command: String,
    /// Arguments passed to the executable.
    pub args: Vec<String>,
    /// The complete environment the child will see.
    pub env: BTreeMap<String, String>,
    /// How long to wait for the tool catalog after spawn.
    pub handshake_timeout: Duration,
    /// Per-call timeout; distinct from (and much longer than) the
    /// handshake timeout.
    pub call_timeout: Duration,
    /// How long to wait after the close signal before killing the child.
    pub shutdown_grace: Duration,
}

impl ChannelConfig {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Declare one environment variable for the child.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ChannelConfig::new("castd", "/usr/local/bin/callsheet-castd");
        assert_eq!(config.handshake_timeout, Duration::from_secs(10));
        assert_eq!(config.call_timeout, Duration::from_secs(600));
        assert!(config.call_timeout > Duration::from_secs(7 * 60));
        assert!(config.env.is_empty());
    }

    #[test]
    fn test_builder() {
        let config = ChannelConfig::new("castd", "callsheet-castd")
            .with_arg("--strict")
            .with_env("CALLSHEET_CAST_TABLE", "cast-info")
            .with_handshake_timeout(Duration::from_millis(50));

        assert_eq!(config.args, vec!["--strict"]);
        assert_eq!(
            config.env.get("CALLSHEET_CAST_TABLE").map(String::as_str),
            Some("cast-info")
        );
        assert_eq!(config.handshake_timeout, Duration::from_millis(50));
    }
}
