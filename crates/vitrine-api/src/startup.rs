//! Startup console output.

use std::sync::OnceLock;

use crate::config::{ServerConfig, WsMode};
use crate::ws::ChannelKind;

const ANSI_RESET: &str = "\x1b[0m";
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_DIM: &str = "\x1b[2m";
const ANSI_GREEN: &str = "\x1b[32m";
const ANSI_BLUE: &str = "\x1b[34m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_RED: &str = "\x1b[31m";
const ANSI_CYAN: &str = "\x1b[36m";
const ANSI_GRAY: &str = "\x1b[90m";

/// Whether colors are enabled (disabled in CI/logs, can be forced via env var).
fn colors_enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| {
        if std::env::var("NO_COLOR").is_ok() {
            return false;
        }
        if std::env::var("VITRINE_COLOR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(false)
        {
            return true;
        }
        atty::is(atty::Stream::Stderr)
    })
}

fn color(s: impl AsRef<str>, ansi: &str) -> String {
    if colors_enabled() {
        format!("{}{}{}", ansi, s.as_ref(), ANSI_RESET)
    } else {
        s.as_ref().to_string()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum StartupPhase {
    Banner,
    Initialization,
    Services,
    Ready,
}

/// Service status for startup logging.
pub enum ServiceStatus {
    Started,
    Warning,
    Error,
    Disabled,
}

/// Startup phase tracker for organized console output.
pub struct StartupLogger {
    phase: StartupPhase,
    quiet: bool,
}

impl StartupLogger {
    pub fn new() -> Self {
        Self {
            phase: StartupPhase::Banner,
            quiet: false,
        }
    }

    /// Minimal output, used when logs are JSON.
    pub fn quiet() -> Self {
        Self {
            phase: StartupPhase::Banner,
            quiet: true,
        }
    }

    pub fn banner(&mut self) {
        if self.quiet {
            return;
        }
        self.phase = StartupPhase::Banner;

        println!();
        println!("{}", color("┌─────────────────────────────────────────┐", ANSI_CYAN));
        println!(
            "{}{}{}",
            color("│ ", ANSI_CYAN),
            color(format!("Vitrine {:<32}", env!("CARGO_PKG_VERSION")), ANSI_BOLD),
            color("│", ANSI_CYAN)
        );
        println!(
            "{}{}{}",
            color("│ ", ANSI_CYAN),
            color(format!("{:<40}", "Alert fan-out server"), ANSI_DIM),
            color("│", ANSI_CYAN)
        );
        println!("{}", color("└─────────────────────────────────────────┘", ANSI_CYAN));
        println!();
    }

    fn phase(&mut self, phase: StartupPhase, title: &str) {
        if self.quiet || self.phase == phase {
            return;
        }
        println!(
            "{} {} {}",
            color("›", ANSI_BOLD),
            color(title, ANSI_BLUE),
            color("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━", ANSI_DIM)
        );
        self.phase = phase;
    }

    pub fn phase_init(&mut self) {
        self.phase(StartupPhase::Initialization, "Initialization");
    }

    pub fn phase_services(&mut self) {
        self.phase(StartupPhase::Services, "Services");
    }

    pub fn phase_ready(&mut self) {
        if self.quiet || self.phase == StartupPhase::Ready {
            return;
        }
        println!();
        println!("{} {}", color("✓", ANSI_GREEN), color("Server ready", ANSI_BOLD));
        self.phase = StartupPhase::Ready;
    }

    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        println!("  {} {}", color("⚠", ANSI_YELLOW), message);
    }

    pub fn detail(&self, message: &str) {
        if self.quiet {
            return;
        }
        println!("    {}", color(message, ANSI_GRAY));
    }

    pub fn service(&self, name: &str, status: ServiceStatus) {
        if self.quiet {
            return;
        }
        let (icon, color_code) = match status {
            ServiceStatus::Started => ("✓", ANSI_GREEN),
            ServiceStatus::Warning => ("⚠", ANSI_YELLOW),
            ServiceStatus::Error => ("✗", ANSI_RED),
            ServiceStatus::Disabled => ("○", ANSI_GRAY),
        };
        println!("    {} {:30}", color(icon, color_code), name);
    }

    /// Print the listening address and the mounted WebSocket paths.
    pub fn ready_info(&self, config: &ServerConfig) {
        if self.quiet {
            return;
        }
        let addr = format!("{}:{}", config.host, config.port);
        println!();
        println!("  {} http://{}/api/alerts", color("API:", ANSI_BOLD), addr);
        for path in ws_paths(config.ws.mode) {
            println!("  {}  ws://{}{}", color("WS:", ANSI_BOLD), addr, path);
        }
        println!();
        println!("{} {}", color("Press", ANSI_BOLD), color("Ctrl+C to stop.", ANSI_DIM));
        println!();
    }
}

impl Default for StartupLogger {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket paths served in `mode`.
pub fn ws_paths(mode: WsMode) -> Vec<&'static str> {
    match mode {
        WsMode::Dedicated => vec![ChannelKind::Alerts.path()],
        WsMode::Unified => ChannelKind::ALL.iter().map(|c| c.path()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_wrapper() {
        let colored = color("test", ANSI_GREEN);
        assert!(colored.contains("test"));
    }

    #[test]
    fn test_ws_paths_per_mode() {
        assert_eq!(ws_paths(WsMode::Dedicated), vec!["/ws/alerts"]);
        assert_eq!(ws_paths(WsMode::Unified).len(), 3);
    }
}
