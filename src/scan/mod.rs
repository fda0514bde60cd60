//! The scan loop and its collaborators.
//!
//! [`ScanLoop`] moves between three states:
//!
//! ```text
//!          start                 decoded
//!   Idle ────────▶ Sampling ─────────────▶ Cooldown
//!    ▲               │  ▲                     │
//!    │     stop      │  └──── delay elapsed ──┘
//!    └───────────────┴────────────────────────┘ stop
//! ```

mod clock;
mod log;
mod scanner;
mod state;

pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::log::{LogSink, ScanLog, ScanResult};
pub use self::scanner::{ScanError, ScanLoop, ScanStats, MIN_READY_DIMENSION};
pub use self::state::{ScanState, TickOutcome};
