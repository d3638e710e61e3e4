use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the independently generated renderings of a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Variant {
    Alfa,
    Beta,
    Zeus,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Alfa, Variant::Beta, Variant::Zeus];

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Alfa => "ALFA",
            Variant::Beta => "BETA",
            Variant::Zeus => "ZEUS",
        }
    }

    /// Position in per-session buffer arrays.
    pub fn index(&self) -> usize {
        match self {
            Variant::Alfa => 0,
            Variant::Beta => 1,
            Variant::Zeus => 2,
        }
    }

    /// Variants launched for one generation action.
    pub fn active(zeus: bool) -> Vec<Variant> {
        if zeus {
            Self::ALL.to_vec()
        } else {
            vec![Variant::Alfa, Variant::Beta]
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ALFA" => Ok(Variant::Alfa),
            "BETA" => Ok(Variant::Beta),
            "ZEUS" => Ok(Variant::Zeus),
            other => Err(format!("unknown variant: {other}")),
        }
    }
}
