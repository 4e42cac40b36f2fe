// UI layer: the terminal side of the CLI. A spinner while Joplin waits
// for the user to approve access, a confirmation before permanent
// deletes, and JSON output of notes. Progress goes to stderr so stdout
// only ever carries results.

use crate::auth::Sleeper;
use anyhow::{Context, Result};
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::Path;
use std::thread;
use std::time::Duration;

/// Waits between authorization checks with a spinner on screen. The
/// spinner only appears once the first wait starts.
#[derive(Default)]
pub struct ApprovalSpinner {
    bar: Option<ProgressBar>,
    checks: u32,
}

impl ApprovalSpinner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sleeper for ApprovalSpinner {
    fn sleep(&mut self, interval: Duration) -> crate::Result<()> {
        self.checks += 1;
        let message = format!(
            "Accept the authorization request in Joplin (check {})",
            self.checks
        );
        let bar = self.bar.get_or_insert_with(|| {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        });
        bar.set_message(message);
        thread::sleep(interval);
        Ok(())
    }
}

impl Drop for ApprovalSpinner {
    fn drop(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// Ask before a note is deleted for good. Defaults to "no".
pub fn confirm_permanent_delete(id: &str) -> Result<bool> {
    Confirm::new()
        .with_prompt(format!("Permanently delete note {id}?"))
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}

/// Note title for a file: its name without directory or extension.
pub fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Pretty-print any serializable value to stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to format output")?;
    println!("{text}");
    Ok(())
}
