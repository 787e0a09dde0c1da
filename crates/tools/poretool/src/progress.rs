//! Terminal progress bar fed by generator progress events

use indicatif::{ProgressBar, ProgressStyle};
use poregen::{Progress, ProgressEvent};

pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:>12} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        Self { bar }
    }

    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Progress for BarProgress {
    fn report(&mut self, event: &ProgressEvent) {
        self.bar.set_prefix(event.stage);
        self.bar.set_length(event.total.max(event.current));
        self.bar.set_position(event.current);
        if let Some(value) = event.value {
            self.bar.set_message(format!("{:.4}", value));
        }
    }
}
