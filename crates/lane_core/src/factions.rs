//! The two opposing sides of a battle.

use serde::{Deserialize, Serialize};

/// Owning side of an entity.
///
/// Red holds the top half of the arena, Blue the bottom half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Top half; driven by the opponent controller by default.
    Red,
    /// Bottom half; driven by placement commands by default.
    Blue,
}

impl Side {
    /// Both sides in a stable order.
    pub const BOTH: [Side; 2] = [Side::Red, Side::Blue];

    /// The side this one fights against.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Red => Self::Blue,
            Self::Blue => Self::Red,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Red => "Red",
            Self::Blue => "Blue",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opponent_is_an_involution() {
        for side in Side::BOTH {
            assert_ne!(side, side.opponent());
            assert_eq!(side, side.opponent().opponent());
        }
    }
}
