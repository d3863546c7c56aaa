//! Model orders and exhaustive order selection by information criterion.

use std::fmt;

use crate::core::TimeSeries;
use crate::models::arima::model::{ARIMA, SARIMA};
use crate::models::BoxedForecaster;
use serde::{Deserialize, Serialize};

/// Seasonal part (P, D, Q)\[s\] of a model order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeasonalOrder {
    /// Seasonal AR order.
    pub p: usize,
    /// Seasonal differencing order.
    pub d: usize,
    /// Seasonal MA order.
    pub q: usize,
    /// Season length in observations.
    pub period: usize,
}

/// Model order (p, d, q) with an optional seasonal component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelOrder {
    /// Non-seasonal AR order.
    pub p: usize,
    /// Non-seasonal differencing order.
    pub d: usize,
    /// Non-seasonal MA order.
    pub q: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seasonal: Option<SeasonalOrder>,
}

impl ModelOrder {
    /// Non-seasonal order.
    pub const fn new(p: usize, d: usize, q: usize) -> Self {
        Self {
            p,
            d,
            q,
            seasonal: None,
        }
    }

    /// Same order with a seasonal component.
    pub const fn with_seasonal(self, seasonal: SeasonalOrder) -> Self {
        Self {
            seasonal: Some(seasonal),
            ..self
        }
    }

    /// Check if this order carries a seasonal component.
    pub fn is_seasonal(&self) -> bool {
        self.seasonal.is_some()
    }

    /// Number of estimated coefficients, intercept included.
    pub fn num_params(&self) -> usize {
        let seasonal = self.seasonal.map_or(0, |s| s.p + s.q);
        self.p + self.q + seasonal + 1
    }

    /// Instantiate an unfitted model of the matching family.
    pub fn build(&self) -> BoxedForecaster {
        match self.seasonal {
            Some(s) => Box::new(SARIMA::new(self.p, self.d, self.q, s)),
            None => Box::new(ARIMA::new(self.p, self.d, self.q)),
        }
    }
}

impl fmt::Display for ModelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.seasonal {
            Some(s) => write!(
                f,
                "SARIMA({},{},{})({},{},{})[{}]",
                self.p, self.d, self.q, s.p, s.d, s.q, s.period
            ),
            None => write!(f, "ARIMA({},{},{})", self.p, self.d, self.q),
        }
    }
}

/// The pair of orders used by the two ensemble members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOrders {
    /// Trend-only member.
    pub arima: ModelOrder,
    /// Trend and seasonal member.
    pub sarima: ModelOrder,
}

impl Default for ModelOrders {
    fn default() -> Self {
        Self {
            arima: ModelOrder::new(5, 1, 0),
            sarima: ModelOrder::new(5, 1, 0).with_seasonal(SeasonalOrder {
                p: 1,
                d: 1,
                q: 1,
                period: 5,
            }),
        }
    }
}

/// Information criterion used to rank candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    #[default]
    Aic,
    Bic,
}

/// Inclusive upper bounds of the seasonal grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalSearch {
    pub max_p: usize,
    pub max_d: usize,
    pub max_q: usize,
    pub period: usize,
}

impl Default for SeasonalSearch {
    fn default() -> Self {
        Self {
            max_p: 1,
            max_d: 1,
            max_q: 1,
            period: 5,
        }
    }
}

/// Bounds and criterion of an exhaustive order search.
///
/// Every order from zero up to each `max_*` is tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderSearch {
    pub max_p: usize,
    pub max_d: usize,
    pub max_q: usize,
    pub seasonal: Option<SeasonalSearch>,
    pub criterion: Criterion,
}

impl Default for OrderSearch {
    fn default() -> Self {
        Self {
            max_p: 3,
            max_d: 2,
            max_q: 3,
            seasonal: Some(SeasonalSearch::default()),
            criterion: Criterion::Aic,
        }
    }
}

impl OrderSearch {
    /// Set maximum non-seasonal orders.
    pub fn with_max_orders(mut self, max_p: usize, max_d: usize, max_q: usize) -> Self {
        self.max_p = max_p;
        self.max_d = max_d;
        self.max_q = max_q;
        self
    }

    /// Set the seasonal grid; `None` searches non-seasonal orders only.
    pub fn with_seasonal(mut self, seasonal: Option<SeasonalSearch>) -> Self {
        self.seasonal = seasonal;
        self
    }

    /// Rank by BIC instead of AIC.
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Order returned when no candidate fits.
    pub fn fallback(&self) -> ModelOrder {
        let order = ModelOrder::new(1, 1, 1);
        match self.seasonal {
            Some(s) => order.with_seasonal(SeasonalOrder {
                p: 1,
                d: 1,
                q: 1,
                period: s.period,
            }),
            None => order,
        }
    }

    /// Candidate orders in search order: p, d, q, then P, D, Q.
    pub fn candidates(&self) -> Vec<ModelOrder> {
        let mut candidates = Vec::new();
        for p in 0..=self.max_p {
            for d in 0..=self.max_d {
                for q in 0..=self.max_q {
                    let order = ModelOrder::new(p, d, q);
                    match self.seasonal {
                        None => candidates.push(order),
                        Some(s) => {
                            for sp in 0..=s.max_p {
                                for sd in 0..=s.max_d {
                                    for sq in 0..=s.max_q {
                                        candidates.push(order.with_seasonal(SeasonalOrder {
                                            p: sp,
                                            d: sd,
                                            q: sq,
                                            period: s.period,
                                        }));
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        candidates
    }
}

/// Outcome of an order search.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSelection {
    best: ModelOrder,
    scores: Vec<(ModelOrder, f64)>,
    used_fallback: bool,
}

impl OrderSelection {
    /// The winning order (or the fallback).
    pub fn best(&self) -> ModelOrder {
        self.best
    }

    /// Every successfully fitted candidate with its criterion, best first.
    pub fn scores(&self) -> &[(ModelOrder, f64)] {
        &self.scores
    }

    /// True when no candidate could be fitted.
    pub fn used_fallback(&self) -> bool {
        self.used_fallback
    }
}

fn score(series: &TimeSeries, order: ModelOrder, criterion: Criterion) -> Option<f64> {
    let mut model = order.build();
    if let Err(e) = model.fit(series) {
        tracing::trace!(%order, error = %e, "candidate skipped");
        return None;
    }
    let criteria = model.information_criteria()?;
    let value = match criterion {
        Criterion::Aic => criteria.aic,
        Criterion::Bic => criteria.bic,
    };
    value.is_finite().then_some(value)
}

/// Fit every candidate of `search` and rank them.
///
/// Ties keep the candidate found first, so the result is deterministic.
pub fn select_with_scores(series: &TimeSeries, search: &OrderSearch) -> OrderSelection {
    let mut best: Option<(ModelOrder, f64)> = None;
    let mut scores = Vec::new();

    for order in search.candidates() {
        let Some(value) = score(series, order, search.criterion) else {
            continue;
        };
        tracing::debug!(%order, score = value, "candidate scored");
        scores.push((order, value));
        if best.is_none_or(|(_, b)| value < b) {
            best = Some((order, value));
        }
    }

    scores.sort_by(|a, b| a.1.total_cmp(&b.1));

    match best {
        Some((order, _)) => OrderSelection {
            best: order,
            scores,
            used_fallback: false,
        },
        None => {
            let fallback = search.fallback();
            tracing::warn!(order = %fallback, "no candidate order could be fitted");
            OrderSelection {
                best: fallback,
                scores,
                used_fallback: true,
            }
        }
    }
}

/// Best order within `search` for `series`.
pub fn select_order(series: &TimeSeries, search: &OrderSearch) -> ModelOrder {
    select_with_scores(series, search).best()
}

/// Per-member outcome of [`select_members`].
#[derive(Debug, Clone, PartialEq)]
pub struct MemberSelection {
    pub arima: OrderSelection,
    pub sarima: OrderSelection,
}

impl MemberSelection {
    pub fn orders(&self) -> ModelOrders {
        ModelOrders {
            arima: self.arima.best(),
            sarima: self.sarima.best(),
        }
    }

    /// True when either member had to take its fallback order.
    pub fn used_fallback(&self) -> bool {
        self.arima.used_fallback() || self.sarima.used_fallback()
    }
}

/// Search both ensemble members.
///
/// The trend-only member searches the non-seasonal grid, the seasonal member
/// the full seasonal grid (the default one when `search` has none).
pub fn select_members(series: &TimeSeries, search: &OrderSearch) -> MemberSelection {
    let arima = select_with_scores(series, &search.with_seasonal(None));
    let seasonal = search.seasonal.unwrap_or_default();
    let sarima = select_with_scores(series, &search.with_seasonal(Some(seasonal)));

    tracing::info!(
        arima = %arima.best(),
        sarima = %sarima.best(),
        observations = series.len(),
        "model orders selected"
    );
    MemberSelection { arima, sarima }
}

/// Orders for both ensemble members. See [`select_members`].
pub fn select_orders(series: &TimeSeries, search: &OrderSearch) -> ModelOrders {
    select_members(series, search).orders()
}
