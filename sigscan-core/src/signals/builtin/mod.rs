//! Built-in detector catalog.
//!
//! Each detector evaluates its pattern on the last bar of the window. Default
//! parameters follow common A-share screening conventions (daily bars, 9.5%
//! treated as a limit-up move).

pub mod high_turnover;
pub mod limit_up;
pub mod ma_alignment;
pub mod macd_cross;
pub mod new_high;
pub mod rsi_rebound;
pub mod volume_breakout;

pub use high_turnover::HighTurnover;
pub use limit_up::LimitUp;
pub use ma_alignment::MaBullAlignment;
pub use macd_cross::MacdGoldenCross;
pub use new_high::NewHighBreakout;
pub use rsi_rebound::RsiOversoldRebound;
pub use volume_breakout::VolumeBreakout;

use super::SignalDefinition;

/// Every built-in detector with default parameters, enabled.
pub fn catalog() -> Vec<SignalDefinition> {
    vec![
        SignalDefinition::new(HighTurnover::default()),
        SignalDefinition::new(LimitUp::default()),
        SignalDefinition::new(MaBullAlignment::default()),
        SignalDefinition::new(MacdGoldenCross::default()),
        SignalDefinition::new(NewHighBreakout::default()),
        SignalDefinition::new(RsiOversoldRebound::default()),
        SignalDefinition::new(VolumeBreakout::default()),
    ]
}

/// Percent change of the last bar against the one before it.
pub(crate) fn last_change_pct(window: &[crate::domain::Bar]) -> Option<f64> {
    match window {
        [.., prev, last] => last.pct_change_from(prev.close),
        _ => None,
    }
}
