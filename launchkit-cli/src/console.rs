//! Terminal status front end.

use std::path::PathBuf;

use colored::Colorize;

use launchkit_core::ShowLauncher;
use launchkit_runtime::{StatusSink, StatusUpdate};

pub struct ConsoleStatus {
    mode: ShowLauncher,
    log_path: PathBuf,
}

impl ConsoleStatus {
    pub fn new(mode: ShowLauncher, log_path: PathBuf) -> Self {
        Self { mode, log_path }
    }

    fn visible(&self, update: &StatusUpdate) -> bool {
        match self.mode {
            ShowLauncher::Always => true,
            ShowLauncher::FirstLaunch => update.is_first_launch || update.has_crashed,
            ShowLauncher::Never => false,
        }
    }

    fn render(&self, update: &StatusUpdate) -> String {
        if update.has_crashed {
            format!(
                "{} {}\nSee log file for more details: {}",
                "✗".red().bold(),
                update.text.red(),
                self.log_path.display()
            )
        } else if update.is_ready {
            format!("{} {}", "✓".green().bold(), update.text.green())
        } else if update.app_has_closed {
            format!("{} {}", "·".dimmed(), update.text.dimmed())
        } else {
            format!("{} {}", "›".cyan(), update.text)
        }
    }
}

impl StatusSink for ConsoleStatus {
    fn update(&self, update: StatusUpdate) {
        if self.visible(&update) {
            println!("{}", self.render(&update));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn console(mode: ShowLauncher) -> ConsoleStatus {
        ConsoleStatus::new(mode, PathBuf::from("/data/viewer/logs/launcher.log"))
    }

    #[test]
    fn first_launch_mode_hides_routine_updates() {
        let c = console(ShowLauncher::FirstLaunch);
        assert!(!c.visible(&StatusUpdate::message("Launching...")));
        assert!(c.visible(&StatusUpdate::message("Launching...").first_launch(true)));
        assert!(c.visible(&StatusUpdate::crashed("Failed to launch application")));
    }

    #[test]
    fn crash_lines_point_at_the_log() {
        colored::control::set_override(false);
        let line = console(ShowLauncher::Always).render(&StatusUpdate::crashed("Failed to launch application"));
        assert!(line.contains("Failed to launch application"));
        assert!(line.contains("See log file for more details: /data/viewer/logs/launcher.log"));
    }
}
