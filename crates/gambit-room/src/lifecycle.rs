//! Room lifecycle and rematch negotiation states.

use std::fmt;

use gambit_protocol::UserId;

/// The phases a room moves through.
///
/// ```text
/// Waiting ──2nd join──▶ CountingDown ──tick 0──▶ InProgress ──end──▶ Concluded
///    ▲                        │                       │                  │
///    └────────── a participant leaves ────────────────┴──────────────────┘
/// ```
///
/// A departure from any phase with a seat still occupied falls back to
/// `Waiting`; a departure emptying the room destroys it instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomLifecycle {
    /// Fewer than two seats taken; the room accepts joins.
    Waiting,
    /// Both seats taken; the pre-match countdown is running.
    CountingDown,
    /// A match is being played.
    InProgress,
    /// The match ended; the room lingers for rematch negotiation.
    Concluded,
}

impl RoomLifecycle {
    /// Whether a new participant may take a seat.
    pub fn is_joinable(self) -> bool {
        self == Self::Waiting
    }

    /// Whether clients should render a board. True from match start
    /// onward, including after the match ended.
    pub fn game_started(self) -> bool {
        matches!(self, Self::InProgress | Self::Concluded)
    }

    /// Whether moves are accepted.
    pub fn accepts_moves(self) -> bool {
        self == Self::InProgress
    }
}

impl fmt::Display for RoomLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Waiting => "waiting",
            Self::CountingDown => "counting-down",
            Self::InProgress => "in-progress",
            Self::Concluded => "concluded",
        };
        f.write_str(s)
    }
}

/// Where rematch negotiation stands for a concluded room.
///
/// At most one request is outstanding; a second `request-rematch` while
/// one is pending is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RematchState {
    #[default]
    None,
    Requested {
        by: UserId,
    },
}
