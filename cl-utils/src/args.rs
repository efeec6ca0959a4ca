//! Free-form `plot_snr` inputs.
//!
//! Inputs may be given in any order: numbers are contour levels, the bare
//! words `linearity` and `help` select modes, anything else is a file.

use shared::image_proc::snr::SigmaLevels;

/// One classified command-line input.
#[derive(Debug, Clone, PartialEq)]
pub enum InputToken {
    File(String),
    Level(f64),
    Linearity,
    Help,
}

impl InputToken {
    pub fn classify(raw: &str) -> Self {
        match raw {
            "linearity" => InputToken::Linearity,
            "help" => InputToken::Help,
            _ => match raw.parse::<f64>() {
                Ok(level) if level.is_finite() => InputToken::Level(level),
                _ => InputToken::File(raw.to_string()),
            },
        }
    }
}

/// Inputs sorted by role, with files kept in the order given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlotInputs {
    pub files: Vec<String>,
    pub levels: SigmaLevels,
    pub linearity: bool,
    pub help: bool,
}

pub fn classify_inputs<I, S>(inputs: I) -> PlotInputs
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut files = Vec::new();
    let mut levels = Vec::new();
    let mut linearity = false;
    let mut help = false;

    for raw in inputs {
        match InputToken::classify(raw.as_ref()) {
            InputToken::File(f) => files.push(f),
            InputToken::Level(l) => levels.push(l),
            InputToken::Linearity => linearity = true,
            InputToken::Help => help = true,
        }
    }

    PlotInputs {
        files,
        levels: SigmaLevels::new(levels),
        linearity,
        help,
    }
}
