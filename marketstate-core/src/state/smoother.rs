//! Single-pole exponential smoother for the raw state stream.
//!
//! smoothed[t] = raw[t]                                   (no prior state)
//! smoothed[t] = alpha * raw[t] + (1 - alpha) * smoothed[t-1]
//! alpha = 2 / (period + 1); period 1 disables smoothing.

#[derive(Debug, Clone)]
pub struct StateSmoother {
    period: usize,
    alpha: f64,
    previous: Option<f64>,
}

impl StateSmoother {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "smoothing period must be >= 1");
        Self {
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            previous: None,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Last smoothed value, `None` until the first sample.
    pub fn previous(&self) -> Option<f64> {
        self.previous
    }

    pub fn update(&mut self, raw: f64) -> f64 {
        let smoothed = match self.previous {
            None => raw,
            Some(prev) => self.alpha * raw + (1.0 - self.alpha) * prev,
        };
        self.previous = Some(smoothed);
        smoothed
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}
