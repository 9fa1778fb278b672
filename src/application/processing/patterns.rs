use crate::application::processing::round2;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Per-bar shape measurements, each rounded to 2 dp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandleGeometry {
    pub body_size: Decimal,
    pub upper_shadow: Decimal,
    pub lower_shadow: Decimal,
    pub candle_size: Decimal,
}

impl CandleGeometry {
    /// `None` when a measurement overflows.
    pub fn new(open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Option<Self> {
        Some(Self {
            body_size: round2(close.checked_sub(open)?.abs()),
            upper_shadow: round2(high.checked_sub(open.max(close))?),
            lower_shadow: round2(open.min(close).checked_sub(low)?),
            candle_size: round2(high.checked_sub(low)?),
        })
    }

    pub fn is_doji(&self) -> bool {
        self.candle_size
            .checked_mul(dec!(0.1))
            .is_some_and(|limit| self.body_size <= limit)
    }

    pub fn is_hammer(&self) -> bool {
        long_short_shadows(self.lower_shadow, self.upper_shadow, self.body_size)
    }

    pub fn is_shooting_star(&self) -> bool {
        long_short_shadows(self.upper_shadow, self.lower_shadow, self.body_size)
    }
}

fn long_short_shadows(long: Decimal, short: Decimal, body: Decimal) -> bool {
    match (body.checked_mul(dec!(2)), body.checked_mul(dec!(0.5))) {
        (Some(twice), Some(half)) => long > twice && short <= half,
        _ => false,
    }
}

/// Pattern flags as stored: 0 or 1, not mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PatternFlags {
    pub doji: u8,
    pub hammer: u8,
    pub shooting_star: u8,
}

/// Classifies single bars without lookback.
pub struct CandlePatternDetector;

impl CandlePatternDetector {
    /// A missing price makes every flag 0.
    pub fn detect(
        open: Option<Decimal>,
        high: Option<Decimal>,
        low: Option<Decimal>,
        close: Option<Decimal>,
    ) -> PatternFlags {
        let (Some(open), Some(high), Some(low), Some(close)) = (open, high, low, close) else {
            return PatternFlags::default();
        };
        let Some(geometry) = CandleGeometry::new(open, high, low, close) else {
            return PatternFlags::default();
        };
        PatternFlags {
            doji: u8::from(geometry.is_doji()),
            hammer: u8::from(geometry.is_hammer()),
            shooting_star: u8::from(geometry.is_shooting_star()),
        }
    }
}
