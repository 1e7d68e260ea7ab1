//! Terminal status rendering for interactive breath tests.

use crate::protocol::{Notification, NotificationKind};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const CYAN: &str = "\x1b[96m";
const YELLOW: &str = "\x1b[93m";
const GREEN: &str = "\x1b[92m";
const BLUE: &str = "\x1b[94m";
const RED: &str = "\x1b[91m";

/// Boundary used only to color the verdict.
const LEGAL_LIMIT: f64 = 0.08;

/// Renders test progress to stdout, one line per notification, with a boxed
/// verdict for the final reading.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusPrinter {
    quiet: bool,
}

impl StatusPrinter {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn header(&self) {
        if self.quiet {
            return;
        }
        println!("{CYAN}{}{RESET}", "=".repeat(60));
        println!("{BOLD}{CYAN}{:^60}{RESET}", "BACtrack Breath Test");
        println!("{CYAN}{}{RESET}", "=".repeat(60));
    }

    pub fn connecting(&self) {
        if !self.quiet {
            println!("{YELLOW}Scanning for BACtrack device...{RESET}");
        }
    }

    pub fn connected(&self, name: Option<&str>, address: &str) {
        if !self.quiet {
            println!(
                "{GREEN}Connected to {} ({address}){RESET}",
                name.unwrap_or("BACtrack")
            );
        }
    }

    /// Callback target for [`BreathTester::take_test`](crate::device::BreathTester::take_test).
    pub fn report(&self, notification: &Notification) {
        if self.quiet {
            return;
        }
        let color = match notification.kind {
            NotificationKind::Countdown { .. } => YELLOW,
            NotificationKind::StartBlow | NotificationKind::KeepBlowing { .. } => GREEN,
            NotificationKind::Analyzing
            | NotificationKind::Finalizing
            | NotificationKind::WrappingUp => BLUE,
            NotificationKind::Cancelled
            | NotificationKind::BlowError
            | NotificationKind::Timeout => RED,
            NotificationKind::Result { .. }
            | NotificationKind::Unknown
            | NotificationKind::Invalid => CYAN,
        };
        println!("  {color}{notification}{RESET}");
    }

    pub fn show_result(&self, bac: f64) {
        let (color, verdict) = if bac == 0.0 {
            (GREEN, "Sober")
        } else if bac < LEGAL_LIMIT {
            (YELLOW, "Under Legal Limit")
        } else {
            (RED, "Over Legal Limit")
        };
        println!();
        println!("{BOLD}{color}  ╔════════════════════════════════╗{RESET}");
        println!("{BOLD}{color}  ║ {:^30} ║{RESET}", format!("BAC: {bac:.4}%"));
        println!("{BOLD}{color}  ║ {verdict:^30} ║{RESET}");
        println!("{BOLD}{color}  ╚════════════════════════════════╝{RESET}");
    }

    pub fn show_failure(&self, message: &str) {
        println!("{RED}{message}{RESET}");
    }
}
