use indicatif::{ProgressBar, ProgressStyle};

/// A stderr spinner, or a hidden one when output is meant for a pipe.
pub fn create_spinner(message: impl Into<String>, json: bool) -> ProgressBar {
    if json {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["-", "\\", "|", "/"])
        .template("{msg} {spinner}")
    {
        spinner.set_style(style);
    }
    spinner.set_message(message.into());
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}
