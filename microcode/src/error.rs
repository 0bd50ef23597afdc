use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("Error on line {line_number}: {message}")]
pub struct ParseError {
    line_number: usize,
    message: String,
}

impl ParseError {
    pub(crate) fn new(line_number: usize, message: &str) -> Self {
        ParseError {
            line_number,
            message: message.to_string(),
        }
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

/// Anything that makes a configuration unusable. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Enable rules form a dependency cycle through controls: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("Rule '{0}' references an undefined control or arrow")]
    UnknownReference(String),

    #[error("{0}")]
    Layout(String),

    #[error("Failed to read configuration '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// A rejected edit. The session keeps its prior state.
#[derive(Debug, Error, PartialEq)]
pub enum SelectError {
    #[error("Index {index} out of range for control '{control}' with {count} options")]
    OutOfRange {
        control: String,
        index: usize,
        count: usize,
    },

    #[error("Unknown control '{0}'")]
    UnknownControl(String),

    #[error("Unknown option '{label}' for control '{control}'")]
    UnknownOption { control: String, label: String },

    #[error("Control '{0}' is disabled")]
    Disabled(String),
}
