//! Terminal session configuration.
//!
//! All fields have defaults suited to a full-screen dashboard; override only
//! what you need:
//!
//! ```
//! use std::time::Duration;
//! use tessera::TerminalConfig;
//!
//! let config = TerminalConfig::default()
//!     .with_mouse_capture(false)
//!     .with_poll_interval(Duration::from_millis(20));
//! assert!(!config.mouse_capture);
//! ```

use std::time::Duration;

/// How the terminal backends set up and drive a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalConfig {
    /// Report mouse moves, clicks and wheel events.
    pub mouse_capture: bool,
    /// Draw on the alternate screen and restore the original on exit.
    pub alternate_screen: bool,
    /// Hide the hardware cursor while the session runs.
    pub hide_cursor: bool,
    /// Longest time the input thread waits before re-checking its running
    /// flag. Bounds how long shutdown takes.
    pub poll_interval: Duration,
    /// Treat Ctrl+C as an exit request instead of a key press.
    pub exit_on_ctrl_c: bool,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            mouse_capture: true,
            alternate_screen: true,
            hide_cursor: true,
            poll_interval: Duration::from_millis(50),
            exit_on_ctrl_c: true,
        }
    }
}

impl TerminalConfig {
    pub fn with_mouse_capture(mut self, enabled: bool) -> Self {
        self.mouse_capture = enabled;
        self
    }

    pub fn with_alternate_screen(mut self, enabled: bool) -> Self {
        self.alternate_screen = enabled;
        self
    }

    pub fn with_hide_cursor(mut self, enabled: bool) -> Self {
        self.hide_cursor = enabled;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_exit_on_ctrl_c(mut self, enabled: bool) -> Self {
        self.exit_on_ctrl_c = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TerminalConfig::default();
        assert!(config.mouse_capture);
        assert!(config.alternate_screen);
        assert!(config.hide_cursor);
        assert!(config.exit_on_ctrl_c);
        assert_eq!(config.poll_interval, Duration::from_millis(50));
    }

    #[test]
    fn test_builder_overrides() {
        let config = TerminalConfig::default()
            .with_alternate_screen(false)
            .with_hide_cursor(false)
            .with_exit_on_ctrl_c(false)
            .with_poll_interval(Duration::from_millis(5));
        assert!(!config.alternate_screen);
        assert!(!config.hide_cursor);
        assert!(!config.exit_on_ctrl_c);
        assert_eq!(config.poll_interval, Duration::from_millis(5));
        assert!(config.mouse_capture);
    }
}
