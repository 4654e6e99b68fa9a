use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error object, as returned inside a legacy api reply array:
///
/// `[{"error": {"type": 1, "address": "/", "description": "unauthorized user"}}]`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HueApiV1Error {
    #[serde(rename = "type")]
    pub typ: u32,
    pub address: String,
    pub description: String,
}

impl fmt::Display for HueApiV1Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hue error {} at {}: {}",
            self.typ, self.address, self.description
        )
    }
}

#[derive(Error, Debug)]
pub enum HueError {
    #[error("Bridge replied with error: {0}")]
    V1Error(HueApiV1Error),

    #[error("Bridge replied with {0} errors, first: {1}")]
    V1Errors(usize, HueApiV1Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error("Unexpected reply from bridge: {0}")]
    UnexpectedReply(String),
}

pub type HueResult<T> = Result<T, HueError>;

impl HueError {
    /// Build an error from every error object in a reply. Returns [`None`]
    /// if the list is empty.
    #[must_use]
    pub fn from_errors(mut errors: Vec<HueApiV1Error>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop().map(Self::V1Error),
            n => Some(Self::V1Errors(n, errors.swap_remove(0))),
        }
    }
}
