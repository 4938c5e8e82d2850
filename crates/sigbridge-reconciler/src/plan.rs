//! Decision table: current position side × signal → action.
//!
//! | current | BUY                | SELL               |
//! |---------|--------------------|--------------------|
//! | FLAT    | open long          | open short         |
//! | LONG    | hold               | close, open short  |
//! | SHORT   | close, open long   | hold               |

use serde::Serialize;
use sigbridge_core::{OrderSide, PositionSide, Signal};

/// Orders required to move from the held side to the signalled side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Plan {
    /// Already on the signalled side; nothing to submit.
    Hold,
    /// Flat; open directly.
    Open { side: OrderSide },
    /// Opposite side held; close it all, then open.
    Flip { close: OrderSide, open: OrderSide },
}

impl Plan {
    pub fn opening_side(&self) -> Option<OrderSide> {
        match self {
            Self::Hold => None,
            Self::Open { side } => Some(*side),
            Self::Flip { open, .. } => Some(*open),
        }
    }
}

pub fn plan(current: PositionSide, signal: Signal) -> Plan {
    let target = signal.target_side();
    if current == target {
        return Plan::Hold;
    }
    match current.closing_side() {
        None => Plan::Open {
            side: signal.direction(),
        },
        Some(close) => Plan::Flip {
            close,
            open: signal.direction(),
        },
    }
}
