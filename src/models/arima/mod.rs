//! ARIMA and SARIMA (Autoregressive Integrated Moving Average) models.
//!
//! This module provides:
//! - ARIMA models with (p, d, q) specifications
//! - SARIMA models with multiplicative seasonal components (P, D, Q)\[s\]
//! - Exhaustive order selection by information criterion

mod arma;
mod diff;
mod model;
mod order;

pub use diff::{difference, integrate, seasonal_difference, seasonal_integrate};
pub use model::{ARIMA, SARIMA};
pub use order::{
    select_members, select_order, select_orders, select_with_scores, Criterion, MemberSelection,
    ModelOrder, ModelOrders, OrderSearch, OrderSelection, SeasonalOrder, SeasonalSearch,
};
