//! Per-symbol host for the calculator.
//!
//! A `MarketStateStream` plays the part of a charting host: it owns the three
//! EMA value providers, their history buffers and one calculator, and feeds
//! each bar's close through them in order.

use tracing::{debug, info};

use marketstate_core::domain::Bar;
use marketstate_core::indicators::Ema;
use marketstate_core::state::SeriesBuffer;
use marketstate_core::{
    MarketStateCalculator, MarketStateConfig, MarketStateError, MarketStateUpdate, Phase, Tier,
    TierValues,
};

use crate::config::EmaConfig;

#[derive(Debug, Clone)]
pub struct MarketStateStream {
    symbol: String,
    emas: TierValues<Ema>,
    history: TierValues<SeriesBuffer>,
    calculator: MarketStateCalculator,
    bars_seen: usize,
}

impl MarketStateStream {
    pub fn new(
        symbol: impl Into<String>,
        ema: &EmaConfig,
        config: MarketStateConfig,
    ) -> Result<Self, MarketStateError> {
        ema.validate()
            .map_err(|e| MarketStateError::invalid(e.to_string()))?;
        // Older values never reach the slope or range windows.
        let capacity = config.required_history();
        Ok(Self {
            symbol: symbol.into(),
            emas: ema.lengths.map(|_, &len| Ema::with_seed(len, ema.seed)),
            history: TierValues::new(
                SeriesBuffer::bounded(capacity),
                SeriesBuffer::bounded(capacity),
                SeriesBuffer::bounded(capacity),
            ),
            calculator: MarketStateCalculator::new(config)?,
            bars_seen: 0,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn phase(&self) -> Phase {
        self.calculator.phase()
    }

    pub fn bars_seen(&self) -> usize {
        self.bars_seen
    }

    pub fn calculator(&self) -> &MarketStateCalculator {
        &self.calculator
    }

    /// Feed one bar. A bar for a different symbol restarts the stream first.
    pub fn on_bar(&mut self, bar: &Bar) -> Option<MarketStateUpdate> {
        if bar.symbol != self.symbol {
            info!(from = %self.symbol, to = %bar.symbol, "symbol changed, restarting stream");
            self.symbol = bar.symbol.clone();
            self.reset();
        }

        let before = self.calculator.phase();
        for tier in Tier::ALL {
            let ema = self.emas.get_mut(tier);
            let value = ema.update(bar.close);
            // An unseeded EMA has no value for this bar yet.
            if ema.value().is_some() {
                self.history.get_mut(tier).push(value);
            }
        }
        self.bars_seen += 1;

        let update = self.calculator.on_bar_update(
            &self.history.mini,
            &self.history.fast,
            &self.history.slow,
        );
        if before != self.calculator.phase() {
            debug!(
                symbol = %self.symbol,
                bar = self.bars_seen - 1,
                date = %bar.date,
                "stream warmed up"
            );
        }
        update
    }

    /// Drop all history and smoothing memory.
    pub fn reset(&mut self) {
        self.emas.mini.reset();
        self.emas.fast.reset();
        self.emas.slow.reset();
        self.history.mini.clear();
        self.history.fast.clear();
        self.history.slow.clear();
        self.calculator.reset();
        self.bars_seen = 0;
    }
}
