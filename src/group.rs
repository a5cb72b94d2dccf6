//! Asset Groups
//!
//! Classifies an asset as a stylesheet or a script.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetGroup {
    Stylesheets,
    Javascripts,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown asset group: {0}")]
pub struct UnknownGroup(pub String);

impl AssetGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stylesheets => "stylesheets",
            Self::Javascripts => "javascripts",
        }
    }

    /// Infer the group from a usable extension. Anything that is not a
    /// script is treated as a stylesheet.
    pub fn from_usable_extension(extension: &str) -> Self {
        if extension.eq_ignore_ascii_case("js") {
            Self::Javascripts
        } else {
            Self::Stylesheets
        }
    }
}

impl FromStr for AssetGroup {
    type Err = UnknownGroup;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stylesheets" | "stylesheet" | "css" => Ok(Self::Stylesheets),
            "javascripts" | "javascript" | "js" => Ok(Self::Javascripts),
            _ => Err(UnknownGroup(s.to_string())),
        }
    }
}

impl fmt::Display for AssetGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
