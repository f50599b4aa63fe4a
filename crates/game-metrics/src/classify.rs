//! Move severity classification by centipawn loss.

use chess_core::Side;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveClass {
    Blunder,
    Mistake,
    Inaccuracy,
    Ok,
}

/// Loss thresholds for one color; a move is classified when its loss is
/// strictly greater than the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideThresholds {
    pub blunder: f64,
    pub mistake: f64,
    pub inaccuracy: f64,
}

impl SideThresholds {
    pub fn classify(&self, loss: f64) -> MoveClass {
        if loss > self.blunder {
            MoveClass::Blunder
        } else if loss > self.mistake {
            MoveClass::Mistake
        } else if loss > self.inaccuracy {
            MoveClass::Inaccuracy
        } else {
            MoveClass::Ok
        }
    }
}

/// Per-color thresholds.
///
/// The defaults charge a blunder above 300 cp for White but above 200 cp for
/// Black. The asymmetry has no known rationale and may be an error in the
/// procedure these numbers come from; it is kept so results stay comparable,
/// and exposed here so a correction is a config change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub white: SideThresholds,
    pub black: SideThresholds,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            white: SideThresholds {
                blunder: 300.0,
                mistake: 100.0,
                inaccuracy: 50.0,
            },
            black: SideThresholds {
                blunder: 200.0,
                mistake: 100.0,
                inaccuracy: 50.0,
            },
        }
    }
}

impl Thresholds {
    /// Same thresholds for both colors.
    pub fn symmetric(side: SideThresholds) -> Self {
        Self {
            white: side,
            black: side,
        }
    }

    pub fn for_side(&self, side: Side) -> &SideThresholds {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }

    pub fn classify(&self, side: Side, loss: f64) -> MoveClass {
        self.for_side(side).classify(loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds_in_force() {
        let t = Thresholds::default();
        assert_eq!(t.white.blunder, 300.0);
        assert_eq!(t.white.mistake, 100.0);
        assert_eq!(t.white.inaccuracy, 50.0);
        assert_eq!(t.black.blunder, 200.0);
        assert_eq!(t.black.mistake, 100.0);
        assert_eq!(t.black.inaccuracy, 50.0);
    }

    #[test]
    fn test_classify_white() {
        let t = Thresholds::default();
        assert_eq!(t.classify(Side::White, 0.0), MoveClass::Ok);
        assert_eq!(t.classify(Side::White, 50.0), MoveClass::Ok);
        assert_eq!(t.classify(Side::White, 50.1), MoveClass::Inaccuracy);
        assert_eq!(t.classify(Side::White, 100.0), MoveClass::Inaccuracy);
        assert_eq!(t.classify(Side::White, 230.0), MoveClass::Mistake);
        assert_eq!(t.classify(Side::White, 300.0), MoveClass::Mistake);
        assert_eq!(t.classify(Side::White, 300.5), MoveClass::Blunder);
    }

    #[test]
    fn test_classify_black_uses_lower_blunder_line() {
        let t = Thresholds::default();
        assert_eq!(t.classify(Side::Black, 230.0), MoveClass::Blunder);
        assert_eq!(t.classify(Side::Black, 200.0), MoveClass::Mistake);
        assert_eq!(t.classify(Side::Black, 75.0), MoveClass::Inaccuracy);
    }

    #[test]
    fn test_severity_never_drops_as_loss_grows() {
        fn rank(c: MoveClass) -> u8 {
            match c {
                MoveClass::Ok => 0,
                MoveClass::Inaccuracy => 1,
                MoveClass::Mistake => 2,
                MoveClass::Blunder => 3,
            }
        }

        let t = Thresholds::default();
        for side in [Side::White, Side::Black] {
            let mut prev = 0;
            let mut seen = [0usize; 4];
            for step in 0..800 {
                let loss = step as f64 * 0.5;
                let r = rank(t.classify(side, loss));
                assert!(r >= prev, "{side} loss {loss}");
                seen[r as usize] += 1;
                prev = r;
            }
            assert!(seen.iter().all(|&n| n > 0));
            assert_eq!(seen.iter().sum::<usize>(), 800);
        }
    }

    #[test]
    fn test_symmetric_thresholds() {
        let t = Thresholds::symmetric(Thresholds::default().white);
        assert_eq!(t.classify(Side::Black, 230.0), MoveClass::Mistake);
    }
}
