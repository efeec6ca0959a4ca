//! Decisions taken during background subtraction.
//!
//! The subtraction workflow asks two questions: which level to subtract and
//! whether to save. [`ConsolePrompt`] asks a person; [`AcceptEstimate`]
//! answers without input for scripted runs.

use std::io::{BufRead, Write};

use anyhow::{bail, Context};
use shared::image_proc::background::BackgroundEstimate;

pub trait SubtractionPrompt {
    /// Show progress text (histograms, summaries).
    fn display(&mut self, text: &str);

    /// Background level to subtract, given the robust estimate.
    fn choose_level(&mut self, estimate: &BackgroundEstimate) -> anyhow::Result<f64>;

    /// Whether the modified image should be written back.
    fn confirm_save(&mut self) -> anyhow::Result<bool>;
}

/// Line-oriented prompt over any reader and writer.
///
/// An empty answer to the level question accepts the estimate; anything
/// that does not parse as a number is asked again. A save answer
/// containing `y` means yes.
pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> anyhow::Result<String> {
        write!(self.output, "{question}")?;
        self.output.flush()?;
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("reading answer")?;
        if read == 0 {
            bail!("input closed while waiting for an answer to {:?}", question.trim());
        }
        Ok(line.trim().to_string())
    }
}

impl ConsolePrompt<std::io::StdinLock<'static>, std::io::Stdout> {
    /// Prompt on the process's terminal.
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> SubtractionPrompt for ConsolePrompt<R, W> {
    fn display(&mut self, text: &str) {
        // Display output is best-effort
        let _ = writeln!(self.output, "{text}");
    }

    fn choose_level(&mut self, estimate: &BackgroundEstimate) -> anyhow::Result<f64> {
        loop {
            let answer = self.ask(&format!(
                "BG level [{:.6}, sigma {:.6}]: ",
                estimate.mode, estimate.sigma
            ))?;
            if answer.is_empty() {
                return Ok(estimate.mode);
            }
            match answer.parse::<f64>() {
                Ok(level) if level.is_finite() => return Ok(level),
                _ => writeln!(self.output, "Not a number: {answer:?}")?,
            }
        }
    }

    fn confirm_save(&mut self) -> anyhow::Result<bool> {
        let answer = self.ask("Save? ")?;
        Ok(answer.to_ascii_lowercase().contains('y'))
    }
}

/// Subtracts the estimate without asking, saving only if told to up front.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptEstimate {
    pub save: bool,
}

impl SubtractionPrompt for AcceptEstimate {
    fn display(&mut self, text: &str) {
        log::debug!("{text}");
    }

    fn choose_level(&mut self, estimate: &BackgroundEstimate) -> anyhow::Result<f64> {
        Ok(estimate.mode)
    }

    fn confirm_save(&mut self) -> anyhow::Result<bool> {
        Ok(self.save)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn estimate() -> BackgroundEstimate {
        BackgroundEstimate {
            mode: 0.25,
            sigma: 0.05,
            iterations: 3,
            retained: 900,
        }
    }

    #[test]
    fn test_empty_answer_accepts_estimate() {
        let mut out = Vec::new();
        let mut prompt = ConsolePrompt::new(Cursor::new("\n"), &mut out);
        assert_eq!(prompt.choose_level(&estimate()).unwrap(), 0.25);
    }

    #[test]
    fn test_invalid_level_is_asked_again() {
        let mut out = Vec::new();
        let mut prompt = ConsolePrompt::new(Cursor::new("abc\n0.3\n"), &mut out);
        assert_eq!(prompt.choose_level(&estimate()).unwrap(), 0.3);
        drop(prompt);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("BG level").count(), 2);
        assert!(text.contains("Not a number"));
    }

    #[test]
    fn test_closed_input_is_an_error() {
        let mut prompt = ConsolePrompt::new(Cursor::new(""), Vec::new());
        assert!(prompt.choose_level(&estimate()).is_err());
        assert!(prompt.confirm_save().is_err());
    }

    #[test]
    fn test_save_answers() {
        for (answer, expected) in [("y\n", true), ("Yes\n", true), ("n\n", false), ("\n", false)] {
            let mut prompt = ConsolePrompt::new(Cursor::new(answer), Vec::new());
            assert_eq!(prompt.confirm_save().unwrap(), expected, "answer {answer:?}");
        }
    }

    #[test]
    fn test_accept_estimate() {
        let mut prompt = AcceptEstimate { save: true };
        assert_eq!(prompt.choose_level(&estimate()).unwrap(), 0.25);
        assert!(prompt.confirm_save().unwrap());
    }
}
