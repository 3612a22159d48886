//! Payload rendering modes.

use std::fmt;
use std::str::FromStr;

use crate::error::OptionsError;

/// Selects how a sink renders the bytes carried by reads and writes.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum RenderMode {
    /// Aligned upper-case hex columns followed by an ASCII gutter.
    #[default]
    HexDump,
    /// A pasteable `&[u8]` literal, with call markers emitted as `//` comments.
    SourceLiteral,
}

impl RenderMode {
    /// Returns the canonical name accepted by [`FromStr`].
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HexDump => "hex-dump",
            Self::SourceLiteral => "source-literal",
        }
    }

    /// Reports whether call-event lines are commented out in this mode.
    pub const fn comments_events(self) -> bool {
        matches!(self, Self::SourceLiteral)
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderMode {
    type Err = OptionsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hex" | "hex-dump" | "hexdump" => Ok(Self::HexDump),
            "source" | "source-literal" | "literal" => Ok(Self::SourceLiteral),
            _ => Err(OptionsError::UnknownMode(value.to_owned())),
        }
    }
}
