//! Terminal shell over the session controller.
//!
//! Renders session snapshots the way the web page did and maps typed
//! commands onto controller actions.

use std::fmt::Write as _;

use crate::session::SessionState;

/// Page title.
pub const TITLE: &str = "Web5 Auth Example";

/// A command typed at the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellCommand {
    /// Start or advance a connection.
    Connect,
    /// Log out.
    Disconnect,
    /// The primary button: connect without an address, disconnect with one.
    Toggle,
    /// Fetch the user profile.
    UserInfo,
    /// Re-render the current state.
    Status,
    /// List commands.
    Help,
    /// Exit the shell.
    Quit,
}

impl ShellCommand {
    /// Parse a prompt line. Empty input maps to [`ShellCommand::Status`].
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "" | "status" | "s" => Some(Self::Status),
            "connect" | "c" => Some(Self::Connect),
            "disconnect" | "d" => Some(Self::Disconnect),
            "toggle" | "t" => Some(Self::Toggle),
            "info" | "userinfo" | "i" => Some(Self::UserInfo),
            "help" | "?" | "h" => Some(Self::Help),
            "quit" | "exit" | "q" => Some(Self::Quit),
            _ => None,
        }
    }

    /// Resolve [`ShellCommand::Toggle`] against the current state.
    pub fn resolve(self, state: &SessionState) -> Self {
        match self {
            Self::Toggle if state.is_connected() => Self::Disconnect,
            Self::Toggle => Self::Connect,
            other => other,
        }
    }
}

/// Label of the primary button for `state`.
pub fn primary_label(state: &SessionState) -> &'static str {
    if state.is_connected() {
        "Disconnect Wallet"
    } else {
        "Connect Wallet"
    }
}

/// Render a snapshot as text.
pub fn render(state: &SessionState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", TITLE);

    if let Some(err) = &state.last_error {
        let _ = writeln!(out, "Error: {}", err);
    }

    let _ = writeln!(out, "[{}]", primary_label(state));

    if state.loading {
        let _ = writeln!(out, "Loading Your Data...");
    }

    if state.is_connected() {
        let _ = writeln!(out, "User Address");
        let _ = writeln!(out, "  {}", state.address());
        let _ = writeln!(out, "Chain ID");
        let _ = writeln!(out, "  {}", state.chain_id());
        let _ = writeln!(out, "[Get User Info]");
    }

    if let Some(info) = &state.user_info {
        let _ = writeln!(out, "User Info");
        let pretty = serde_json::to_string_pretty(info).unwrap_or_else(|_| info.to_string());
        for line in pretty.lines() {
            let _ = writeln!(out, "  {}", line);
        }
    }

    let _ = writeln!(out, "(phase: {})", state.kind());
    out
}

/// Help text listing prompt commands.
pub fn help() -> &'static str {
    "commands: connect (c), disconnect (d), toggle (t), info (i), status (s), help (?), quit (q)"
}
