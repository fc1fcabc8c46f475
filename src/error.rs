use std::{
    error::Error,
    fmt::{Display, Formatter},
};

/// A granule container could not be read, or is missing a required layer.
#[derive(Debug, Clone)]
pub struct DecodeError {
    pub msg: String,
}

impl DecodeError {
    pub fn new(msg: impl Into<String>) -> Self {
        DecodeError { msg: msg.into() }
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.msg)
    }
}

impl Error for DecodeError {}
