//! The seam between the orchestrator and the chess rules engine.
//!
//! The room layer never interprets moves or positions. It hands a
//! [`MoveRequest`] to a [`RulesEngine`] and acts on the verdict: relay
//! the outcome, or drop the request. Tests plug in scripted engines;
//! production wires in a real chess library behind this trait.

use gambit_protocol::{GameOverReason, MoveRequest, Side};

/// FEN of the standard starting position, reported for fresh matches.
pub const START_POSITION: &str =
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// The ways a position can be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawKind {
    Stalemate,
    InsufficientMaterial,
    ThreefoldRepetition,
    FiftyMoveRule,
}

impl From<DrawKind> for GameOverReason {
    fn from(kind: DrawKind) -> Self {
        match kind {
            DrawKind::Stalemate => Self::Stalemate,
            DrawKind::InsufficientMaterial => Self::InsufficientMaterial,
            DrawKind::ThreefoldRepetition => Self::ThreefoldRepetition,
            DrawKind::FiftyMoveRule => Self::FiftyMoveRule,
        }
    }
}

/// Verdict on a position after a move was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    InPlay,
    /// The side to move is checkmated.
    Checkmate,
    Draw(DrawKind),
}

/// A move the engine refused.
#[derive(Debug, thiserror::Error)]
#[error("illegal move {from} -> {to}")]
pub struct IllegalMove {
    pub from: String,
    pub to: String,
}

/// What a legal move did to the position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Position after the move, in FEN.
    pub position: String,
    /// Side to move next.
    pub turn: Side,
    /// Whether the side to move is in check.
    pub check: bool,
    pub status: GameStatus,
}

/// One match's worth of chess rules.
///
/// Owned by the room actor; `Send` so the actor task can hold it, no
/// `Sync` needed since only the actor touches it.
pub trait RulesEngine: Send + 'static {
    /// Current position in FEN.
    fn position(&self) -> String;

    /// Whose turn it is.
    fn side_to_move(&self) -> Side;

    /// Applies a move if legal. On `Err` the position is unchanged.
    fn apply(
        &mut self,
        request: &MoveRequest,
    ) -> Result<MoveOutcome, IllegalMove>;
}

/// Creates a fresh engine per match (initial game, and again on every
/// accepted rematch).
pub trait RulesFactory: Send + Sync + 'static {
    fn create(&self) -> Box<dyn RulesEngine>;
}

impl<F> RulesFactory for F
where
    F: Fn() -> Box<dyn RulesEngine> + Send + Sync + 'static,
{
    fn create(&self) -> Box<dyn RulesEngine> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_kind_maps_to_matching_reason() {
        assert_eq!(
            GameOverReason::from(DrawKind::Stalemate),
            GameOverReason::Stalemate
        );
        assert_eq!(
            GameOverReason::from(DrawKind::FiftyMoveRule),
            GameOverReason::FiftyMoveRule
        );
    }

    #[test]
    fn test_closure_acts_as_factory() {
        struct Stub;
        impl RulesEngine for Stub {
            fn position(&self) -> String {
                START_POSITION.to_string()
            }
            fn side_to_move(&self) -> Side {
                Side::White
            }
            fn apply(
                &mut self,
                request: &MoveRequest,
            ) -> Result<MoveOutcome, IllegalMove> {
                Err(IllegalMove {
                    from: request.from.clone(),
                    to: request.to.clone(),
                })
            }
        }

        let factory = || Box::new(Stub) as Box<dyn RulesEngine>;
        let engine = RulesFactory::create(&factory);
        assert_eq!(engine.side_to_move(), Side::White);
    }
}
