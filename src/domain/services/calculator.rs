//! Calculation engine for risk sizing and bracket price levels
//!
//! Pure arithmetic over instrument tick data: dollars <-> ticks <-> price
//! levels, contract sizing from risk, and the composite flow that turns a
//! risk configuration plus an entry price into rendered-ready SL/TP levels.
//! No state, no I/O; every function is total except the documented
//! division-by-zero guards.

use crate::domain::entities::order::Side;
use crate::domain::errors::CalculationError;
use serde::{Deserialize, Serialize};

/// How the per-trade risk budget is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskMode {
    /// Percentage of account size
    Percent,
    /// Fixed dollar amount
    Fixed,
}

/// Rounding applied when converting a fractional contract count to a whole one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractRounding {
    Down,
    Up,
    Nearest,
}

/// Calculation engine service
#[derive(Debug, Clone, Copy, Default)]
pub struct Calculator;

impl Calculator {
    pub fn new() -> Self {
        Self
    }

    /// Risk budget in dollars.
    ///
    /// `percent` mode: `amount` is a percentage of `account_size`;
    /// `fixed` mode: `amount` is already dollars.
    ///
    /// Examples: (percent, 2, 50_000) -> 1_000; (fixed, 500, _) -> 500
    pub fn risk_in_dollars(&self, mode: RiskMode, amount: f64, account_size: f64) -> f64 {
        match mode {
            RiskMode::Percent => (amount / 100.0) * account_size,
            RiskMode::Fixed => amount,
        }
    }

    /// Convert a dollar amount to a tick count.
    ///
    /// Fails with [`CalculationError::ZeroTickValue`] rather than dividing
    /// by zero.
    pub fn dollars_to_ticks(&self, dollars: f64, tick_value: f64) -> Result<f64, CalculationError> {
        if tick_value == 0.0 {
            return Err(CalculationError::ZeroTickValue);
        }
        Ok(dollars.abs() / tick_value)
    }

    /// Convert ticks to a dollar amount for `contracts` contracts
    pub fn ticks_to_dollars(&self, ticks: f64, tick_value: f64, contracts: u32) -> f64 {
        ticks * tick_value * contracts as f64
    }

    /// Stop-loss price level: entry minus the dollar-equivalent movement for
    /// longs, entry plus it for shorts.
    ///
    /// Example: (21450, 100, 0.50, 0.25, long) -> 21400
    /// ($100 / $0.50 = 200 ticks, 200 * 0.25 = 50 points below entry)
    pub fn stop_loss_price(
        &self,
        entry_price: f64,
        sl_dollars: f64,
        tick_value: f64,
        tick_size: f64,
        side: Side,
    ) -> Result<f64, CalculationError> {
        let ticks = self.dollars_to_ticks(sl_dollars, tick_value)?;
        let movement = ticks * tick_size;
        Ok(match side {
            Side::Long => entry_price - movement,
            Side::Short => entry_price + movement,
        })
    }

    /// Take-profit price level: the same movement as [`stop_loss_price`]
    /// mirrored to the profit side of entry.
    pub fn take_profit_price(
        &self,
        entry_price: f64,
        tp_dollars: f64,
        tick_value: f64,
        tick_size: f64,
        side: Side,
    ) -> Result<f64, CalculationError> {
        let ticks = self.dollars_to_ticks(tp_dollars, tick_value)?;
        let movement = ticks * tick_size;
        Ok(match side {
            Side::Long => entry_price + movement,
            Side::Short => entry_price - movement,
        })
    }

    /// Contracts affordable for a risk budget, rounded down.
    ///
    /// Fails with [`CalculationError::ZeroTickDistance`] when the stop sits
    /// on the entry price.
    ///
    /// Example: (1000, 200, 0.50) -> 10
    pub fn contracts_for_risk(
        &self,
        risk_dollars: f64,
        ticks_to_sl: f64,
        tick_value: f64,
    ) -> Result<u32, CalculationError> {
        if ticks_to_sl == 0.0 {
            return Err(CalculationError::ZeroTickDistance);
        }
        let per_contract = ticks_to_sl * tick_value;
        Ok((risk_dollars / per_contract).floor() as u32)
    }

    /// Signed dollar P&L between entry and a target level.
    ///
    /// The sign follows `target - entry`: a target below entry is negative
    /// (the loss side for a long-style reading).
    pub fn dollars_from_price_delta(
        &self,
        entry_price: f64,
        target_price: f64,
        contracts: u32,
        tick_value: f64,
        tick_size: f64,
    ) -> f64 {
        let delta = target_price - entry_price;
        let ticks = delta.abs() / tick_size;
        let dollars = ticks * tick_value * contracts as f64;
        if delta < 0.0 {
            -dollars
        } else {
            dollars
        }
    }

    /// Derive the take-profit budget from the stop-loss budget by ratio.
    /// (100, 2) -> 200
    pub fn apply_ratio(&self, sl_dollars: f64, ratio: f64) -> f64 {
        sl_dollars * ratio
    }

    /// Snap a price onto the instrument's tick grid.
    ///
    /// Every price handed to the chart must pass through here: the line API
    /// accepts arbitrary floats but levels have to sit on valid boundaries.
    pub fn round_to_tick(&self, price: f64, tick_size: f64) -> f64 {
        (price / tick_size).round() * tick_size
    }

    /// Absolute distance between two prices in ticks
    pub fn ticks_between(&self, price_a: f64, price_b: f64, tick_size: f64) -> f64 {
        (price_a - price_b).abs() / tick_size
    }

    /// Full bracket computation: validate, derive dollar budgets, price
    /// levels (tick-rounded), contract count, and the achieved risk/reward
    /// at the rounded values. Fails fast with every offending field; no
    /// partial results.
    pub fn calculate_all(&self, req: &BracketRequest) -> Result<BracketLevels, CalculationError> {
        req.validate()?;

        let risk_dollars = self.risk_in_dollars(req.risk_mode, req.risk_amount, req.account_size);
        let tp_dollars = if req.use_ratio {
            self.apply_ratio(req.sl_dollars, req.tp_ratio)
        } else {
            req.tp_dollars
        };

        let sl_raw = self.stop_loss_price(
            req.entry_price,
            req.sl_dollars,
            req.tick_value,
            req.tick_size,
            req.side,
        )?;
        let tp_raw = self.take_profit_price(
            req.entry_price,
            tp_dollars,
            req.tick_value,
            req.tick_size,
            req.side,
        )?;

        let sl_price = self.round_to_tick(sl_raw, req.tick_size);
        let tp_price = self.round_to_tick(tp_raw, req.tick_size);

        let ticks_to_sl = self.ticks_between(req.entry_price, sl_price, req.tick_size);
        let ticks_to_tp = self.ticks_between(req.entry_price, tp_price, req.tick_size);

        let contracts = self.size_contracts(risk_dollars, ticks_to_sl, req)?;

        let actual_dollar_risk = self.ticks_to_dollars(ticks_to_sl, req.tick_value, contracts);
        let actual_dollar_profit = self.ticks_to_dollars(ticks_to_tp, req.tick_value, contracts);
        let actual_ratio = if actual_dollar_risk == 0.0 {
            0.0
        } else {
            actual_dollar_profit / actual_dollar_risk
        };

        Ok(BracketLevels {
            risk_dollars,
            sl_dollars: req.sl_dollars,
            tp_dollars,
            sl_price,
            tp_price,
            contracts,
            ticks_to_sl,
            ticks_to_tp,
            actual_dollar_risk,
            actual_dollar_profit,
            actual_ratio,
        })
    }

    fn size_contracts(
        &self,
        risk_dollars: f64,
        ticks_to_sl: f64,
        req: &BracketRequest,
    ) -> Result<u32, CalculationError> {
        if ticks_to_sl == 0.0 {
            return Err(CalculationError::ZeroTickDistance);
        }
        let raw = risk_dollars / (ticks_to_sl * req.tick_value);
        let rounded = match req.contract_rounding {
            ContractRounding::Down => raw.floor(),
            ContractRounding::Up => raw.ceil(),
            ContractRounding::Nearest => raw.round(),
        } as u32;
        Ok(rounded.clamp(req.min_contracts, req.max_contracts))
    }
}

/// Inputs for [`Calculator::calculate_all`]
#[derive(Debug, Clone)]
pub struct BracketRequest {
    pub risk_mode: RiskMode,
    /// Percent or dollars depending on `risk_mode`
    pub risk_amount: f64,
    pub account_size: f64,
    pub entry_price: f64,
    pub sl_dollars: f64,
    /// Derive TP from SL by `tp_ratio` instead of using `tp_dollars`
    pub use_ratio: bool,
    pub tp_ratio: f64,
    pub tp_dollars: f64,
    pub tick_value: f64,
    pub tick_size: f64,
    pub side: Side,
    pub contract_rounding: ContractRounding,
    pub min_contracts: u32,
    pub max_contracts: u32,
}

impl BracketRequest {
    /// Reject non-positive inputs before any arithmetic runs, naming every
    /// offending field.
    pub fn validate(&self) -> Result<(), CalculationError> {
        let mut fields = Vec::new();
        if self.entry_price <= 0.0 {
            fields.push("entry_price".to_string());
        }
        if self.tick_value <= 0.0 {
            fields.push("tick_value".to_string());
        }
        if self.tick_size <= 0.0 {
            fields.push("tick_size".to_string());
        }
        if self.risk_amount <= 0.0 {
            fields.push("risk_amount".to_string());
        }
        if self.sl_dollars <= 0.0 {
            fields.push("sl_dollars".to_string());
        }
        if self.use_ratio {
            if self.tp_ratio <= 0.0 {
                fields.push("tp_ratio".to_string());
            }
        } else if self.tp_dollars <= 0.0 {
            fields.push("tp_dollars".to_string());
        }
        if fields.is_empty() {
            Ok(())
        } else {
            Err(CalculationError::InvalidInputs { fields })
        }
    }
}

/// Everything derived by [`Calculator::calculate_all`]
#[derive(Debug, Clone, PartialEq)]
pub struct BracketLevels {
    pub risk_dollars: f64,
    pub sl_dollars: f64,
    pub tp_dollars: f64,
    /// Tick-rounded stop-loss level
    pub sl_price: f64,
    /// Tick-rounded take-profit level
    pub tp_price: f64,
    pub contracts: u32,
    pub ticks_to_sl: f64,
    pub ticks_to_tp: f64,
    /// Dollar risk at the rounded contract count
    pub actual_dollar_risk: f64,
    pub actual_dollar_profit: f64,
    pub actual_ratio: f64,
}
