//! Reservoir with carried storage
//!
//! For every step `t` of a window, with `dt` the step duration:
//!
//! ```text
//! storage[t] = storage[t-1]
//!            + dt * (inflow[t] - power_out[t] / efficiency
//!                    + power_in[t] * efficiency - overflow[t])
//! ```
//!
//! `storage[t]` is the volume at the end of step `t`. `storage[-1]` is the
//! value carried from the previous window, the configured initial storage on
//! the first window, or a free variable when neither is known.

use super::{ensure_finite, BuildContext, Component, ComponentKind, ComponentModel};
use crate::domain::{ComponentIo, Direction, Sampling, TimeSerieType, TimeSeries};
use crate::error::{EesrepError, Result};
use crate::optimizer::{Constraint, LinearExpr, VariableId};

const DEFAULT_SPILL_COST: f64 = 1e-3;

/// One side of the storage envelope
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StorageBound {
    /// No constraint on this side
    #[default]
    Unenforced,
    /// Same absolute volume at every step
    Fixed(f64),
    /// Fraction of the capacity, read at the end of each step
    Variable(TimeSeries),
}

impl StorageBound {
    fn is_variable(&self) -> bool {
        matches!(self, StorageBound::Variable(_))
    }

    /// Absolute bound per step of the grid, `fallback` where unenforced
    fn resolve(&self, ctx: &BuildContext<'_>, capacity: f64, fallback: f64) -> Result<Vec<f64>> {
        match self {
            StorageBound::Unenforced => Ok(vec![fallback; ctx.len()]),
            StorageBound::Fixed(value) => Ok(vec![*value; ctx.len()]),
            StorageBound::Variable(series) => Ok(series
                .resample(ctx.grid(), Sampling::StepEnd)?
                .into_iter()
                .map(|fraction| fraction * capacity)
                .collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dam {
    name: String,
    inflow: TimeSeries,
    efficiency: f64,
    turbine_power: f64,
    pump_power: f64,
    capacity: f64,
    initial_storage: Option<f64>,
    storage_min: StorageBound,
    storage_max: StorageBound,
    spill_cost: f64,
}

impl Dam {
    /// Lossless dam with unlimited turbine and capacity, storage kept
    /// non-negative. Pumping is disabled until `with_pump_power` is called.
    pub fn new(name: impl Into<String>, inflow: TimeSeries) -> Self {
        Self {
            name: name.into(),
            inflow,
            efficiency: 1.0,
            turbine_power: f64::INFINITY,
            pump_power: 0.0,
            capacity: f64::INFINITY,
            initial_storage: None,
            storage_min: StorageBound::Fixed(0.0),
            storage_max: StorageBound::Unenforced,
            spill_cost: DEFAULT_SPILL_COST,
        }
    }

    pub fn with_efficiency(mut self, efficiency: f64) -> Self {
        self.efficiency = efficiency;
        self
    }

    pub fn with_turbine_power(mut self, max_power_out: f64) -> Self {
        self.turbine_power = max_power_out;
        self
    }

    pub fn with_pump_power(mut self, max_power_in: f64) -> Self {
        self.pump_power = max_power_in;
        self
    }

    pub fn with_capacity(mut self, capacity: f64) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_initial_storage(mut self, storage: f64) -> Self {
        self.initial_storage = Some(storage);
        self
    }

    pub fn with_storage_min(mut self, bound: StorageBound) -> Self {
        self.storage_min = bound;
        self
    }

    pub fn with_storage_max(mut self, bound: StorageBound) -> Self {
        self.storage_max = bound;
        self
    }

    pub fn with_spill_cost(mut self, cost: f64) -> Self {
        self.spill_cost = cost;
        self
    }

    pub fn power_in(&self) -> ComponentIo {
        ComponentIo::input(&self.name, "power_in")
    }

    pub fn power_out(&self) -> ComponentIo {
        ComponentIo::output(&self.name, "power_out")
    }

    pub fn storage(&self) -> ComponentIo {
        ComponentIo::new(
            &self.name,
            "storage",
            Direction::Output,
            TimeSerieType::Extensive,
            true,
        )
    }

    pub fn overflow(&self) -> ComponentIo {
        ComponentIo::new(
            &self.name,
            "overflow",
            Direction::Output,
            TimeSerieType::Intensive,
            false,
        )
    }

    fn check_power(&self, field: &str, value: f64) -> Result<()> {
        if value.is_nan() || value < 0.0 {
            return Err(EesrepError::Parameters(format!(
                "{}: {} must be non-negative, got {}",
                self.name, field, value
            )));
        }
        Ok(())
    }
}

impl Component for Dam {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Dam
    }

    fn declare_ios(&self) -> Vec<ComponentIo> {
        vec![
            self.power_in(),
            self.power_out(),
            self.storage(),
            self.overflow(),
        ]
    }

    fn validate(&self) -> Result<()> {
        ensure_finite(&self.name, "efficiency", self.efficiency)?;
        if self.efficiency <= 0.0 || self.efficiency > 1.0 {
            return Err(EesrepError::Parameters(format!(
                "{}: efficiency must be in (0, 1], got {}",
                self.name, self.efficiency
            )));
        }
        self.check_power("turbine_power", self.turbine_power)?;
        self.check_power("pump_power", self.pump_power)?;
        self.check_power("capacity", self.capacity)?;
        ensure_finite(&self.name, "spill_cost", self.spill_cost)?;
        if let Some(initial) = self.initial_storage {
            ensure_finite(&self.name, "initial_storage", initial)?;
        }

        for (side, bound) in [("min", &self.storage_min), ("max", &self.storage_max)] {
            if let StorageBound::Fixed(value) = bound {
                ensure_finite(&self.name, &format!("storage_{}", side), *value)?;
            }
            if bound.is_variable() && !self.capacity.is_finite() {
                return Err(EesrepError::Parameters(format!(
                    "{}: variable storage_{} needs a finite capacity",
                    self.name, side
                )));
            }
        }
        if let (StorageBound::Fixed(min), StorageBound::Fixed(max)) =
            (&self.storage_min, &self.storage_max)
        {
            if min > max {
                return Err(EesrepError::Parameters(format!(
                    "{}: storage_min ({}) above storage_max ({})",
                    self.name, min, max
                )));
            }
        }
        Ok(())
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<ComponentModel> {
        let n = ctx.len();
        let (io_in, io_out) = (self.power_in(), self.power_out());
        let (io_storage, io_overflow) = (self.storage(), self.overflow());

        let inflow = self.inflow.resample(ctx.grid(), Sampling::StepStart)?;
        let lower = self
            .storage_min
            .resolve(ctx, self.capacity, f64::NEG_INFINITY)?;
        let upper = self.storage_max.resolve(ctx, self.capacity, f64::INFINITY)?;

        let mut model = ComponentModel::new();
        let problem = &mut model.problem;
        let power_in = problem.add_variables(&io_in.key().to_string(), n, 0.0, self.pump_power);
        let power_out = problem.add_variables(&io_out.key().to_string(), n, 0.0, self.turbine_power);
        let overflow =
            problem.add_variables(&io_overflow.key().to_string(), n, 0.0, f64::INFINITY);
        let storage: Vec<VariableId> = (0..n)
            .map(|t| {
                problem.add_variable(format!("{}_{}", io_storage.key(), t), lower[t], upper[t])
            })
            .collect();

        let initial = ctx.carried(&io_storage).or(self.initial_storage);
        let free_initial = if initial.is_none() && n > 0 {
            Some(problem.add_variable(
                format!("{}_initial", io_storage.key()),
                lower[0],
                upper[0],
            ))
        } else {
            None
        };

        for t in 0..n {
            let dt = ctx.duration(t);
            let mut balance = LinearExpr::new()
                .term(storage[t], 1.0)
                .term(power_out[t], dt / self.efficiency)
                .term(power_in[t], -dt * self.efficiency)
                .term(overflow[t], dt);
            match (t, initial, free_initial) {
                (0, Some(value), _) => balance.add_constant(-value),
                (0, _, Some(var)) => balance.add_term(var, -1.0),
                (0, _, None) => {}
                _ => balance.add_term(storage[t - 1], -1.0),
            }
            problem.add_constraint(Constraint::equal(
                format!("{}_balance_{}", self.name, t),
                balance,
                dt * inflow[t],
            ));
            problem.add_objective_term(overflow[t], self.spill_cost * dt);
        }

        model.publish(&io_in, power_in);
        model.publish(&io_out, power_out);
        model.publish(&io_storage, storage);
        model.publish(&io_overflow, overflow);
        Ok(model)
    }
}
