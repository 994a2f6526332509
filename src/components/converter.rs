use super::{ensure_finite, BuildContext, Component, ComponentKind, ComponentModel};
use crate::domain::{ComponentIo, Direction, TimeSerieType};
use crate::error::{EesrepError, Result};
use crate::optimizer::{Constraint, LinearExpr};

fn check_efficiency(component: &str, efficiency: f64) -> Result<()> {
    ensure_finite(component, "efficiency", efficiency)?;
    if efficiency <= 0.0 {
        return Err(EesrepError::Parameters(format!(
            "{}: efficiency must be positive, got {}",
            component, efficiency
        )));
    }
    Ok(())
}

/// Single conversion unit: `power_out = efficiency * power_in`
#[derive(Debug, Clone, PartialEq)]
pub struct Converter {
    name: String,
    efficiency: f64,
    max_input: f64,
    cost: f64,
}

impl Converter {
    pub fn new(name: impl Into<String>, efficiency: f64, max_input: f64, cost: f64) -> Self {
        Self {
            name: name.into(),
            efficiency,
            max_input,
            cost,
        }
    }

    pub fn power_in(&self) -> ComponentIo {
        ComponentIo::input(&self.name, "power_in")
    }

    pub fn power_out(&self) -> ComponentIo {
        ComponentIo::output(&self.name, "power_out")
    }
}

impl Component for Converter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Converter
    }

    fn declare_ios(&self) -> Vec<ComponentIo> {
        vec![self.power_in(), self.power_out()]
    }

    fn validate(&self) -> Result<()> {
        check_efficiency(&self.name, self.efficiency)?;
        ensure_finite(&self.name, "cost", self.cost)?;
        if self.max_input.is_nan() || self.max_input < 0.0 {
            return Err(EesrepError::Parameters(format!(
                "{}: max_input must be non-negative, got {}",
                self.name, self.max_input
            )));
        }
        Ok(())
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<ComponentModel> {
        let (io_in, io_out) = (self.power_in(), self.power_out());
        let mut model = ComponentModel::new();
        let power_in = model
            .problem
            .add_variables(&io_in.key().to_string(), ctx.len(), 0.0, self.max_input);
        let power_out = model
            .problem
            .add_variables(&io_out.key().to_string(), ctx.len(), 0.0, f64::INFINITY);

        for t in 0..ctx.len() {
            model.problem.add_constraint(Constraint::equal(
                format!("{}_conversion_{}", self.name, t),
                LinearExpr::new()
                    .term(power_out[t], 1.0)
                    .term(power_in[t], -self.efficiency),
                0.0,
            ));
            model
                .problem
                .add_objective_term(power_out[t], self.cost * ctx.duration(t));
        }

        model.publish(&io_in, power_in);
        model.publish(&io_out, power_out);
        Ok(model)
    }
}

/// Parameters of a [`Cluster`] of identical units
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterParams {
    pub n_units: u32,
    /// Minimum output of one running unit
    pub unit_min_power: f64,
    /// Maximum output of one running unit
    pub unit_max_power: f64,
    pub efficiency: f64,
    /// Cost per running unit and per unit of time
    pub running_cost: f64,
    /// Cost per unit start
    pub start_cost: f64,
    /// Cost per unit of output and per unit of time
    pub power_cost: f64,
    /// Units running before the first window
    pub initial_units_on: u32,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            n_units: 1,
            unit_min_power: 0.0,
            unit_max_power: 1.0,
            efficiency: 1.0,
            running_cost: 0.0,
            start_cost: 0.0,
            power_cost: 0.0,
            initial_units_on: 0,
        }
    }
}

/// Group of identical units with unit commitment.
///
/// `units_on` is an integer count per step and is carried across windows so
/// that start-ups at a window boundary are priced correctly.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    name: String,
    params: ClusterParams,
}

impl Cluster {
    pub fn new(name: impl Into<String>, params: ClusterParams) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    pub fn power_in(&self) -> ComponentIo {
        ComponentIo::input(&self.name, "power_in")
    }

    pub fn power_out(&self) -> ComponentIo {
        ComponentIo::output(&self.name, "power_out")
    }

    pub fn units_on(&self) -> ComponentIo {
        ComponentIo::new(
            &self.name,
            "units_on",
            Direction::Output,
            TimeSerieType::Discrete,
            true,
        )
    }
}

impl Component for Cluster {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Cluster
    }

    fn declare_ios(&self) -> Vec<ComponentIo> {
        vec![self.power_in(), self.power_out(), self.units_on()]
    }

    fn validate(&self) -> Result<()> {
        let p = &self.params;
        check_efficiency(&self.name, p.efficiency)?;
        for (field, value) in [
            ("unit_min_power", p.unit_min_power),
            ("unit_max_power", p.unit_max_power),
            ("running_cost", p.running_cost),
            ("start_cost", p.start_cost),
            ("power_cost", p.power_cost),
        ] {
            ensure_finite(&self.name, field, value)?;
        }
        if p.unit_min_power < 0.0 || p.unit_max_power < p.unit_min_power {
            return Err(EesrepError::Parameters(format!(
                "{}: unit power range [{}, {}] is invalid",
                self.name, p.unit_min_power, p.unit_max_power
            )));
        }
        if p.initial_units_on > p.n_units {
            return Err(EesrepError::Parameters(format!(
                "{}: {} initial units on but only {} units",
                self.name, p.initial_units_on, p.n_units
            )));
        }
        Ok(())
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<ComponentModel> {
        let p = &self.params;
        let (io_in, io_out, io_on) = (self.power_in(), self.power_out(), self.units_on());
        let n = ctx.len();
        let n_units = f64::from(p.n_units);

        let mut model = ComponentModel::new();
        let problem = &mut model.problem;
        let power_in = problem.add_variables(&io_in.key().to_string(), n, 0.0, f64::INFINITY);
        let power_out =
            problem.add_variables(&io_out.key().to_string(), n, 0.0, n_units * p.unit_max_power);
        let units_on: Vec<_> = (0..n)
            .map(|t| problem.add_integer_variable(format!("{}_{}", io_on.key(), t), 0.0, n_units))
            .collect();
        let starts = problem.add_variables(&format!("{}_starts", self.name), n, 0.0, f64::INFINITY);

        let previous_on = ctx
            .carried(&io_on)
            .unwrap_or_else(|| f64::from(p.initial_units_on));

        for t in 0..n {
            let dt = ctx.duration(t);

            problem.add_constraint(Constraint::at_most(
                format!("{}_max_power_{}", self.name, t),
                LinearExpr::new()
                    .term(power_out[t], 1.0)
                    .term(units_on[t], -p.unit_max_power),
                0.0,
            ));
            problem.add_constraint(Constraint::at_least(
                format!("{}_min_power_{}", self.name, t),
                LinearExpr::new()
                    .term(power_out[t], 1.0)
                    .term(units_on[t], -p.unit_min_power),
                0.0,
            ));
            problem.add_constraint(Constraint::equal(
                format!("{}_conversion_{}", self.name, t),
                LinearExpr::new()
                    .term(power_out[t], 1.0)
                    .term(power_in[t], -p.efficiency),
                0.0,
            ));

            // starts[t] >= on[t] - on[t-1]
            let mut start = LinearExpr::new().term(starts[t], 1.0).term(units_on[t], -1.0);
            if t == 0 {
                start.add_constant(previous_on);
            } else {
                start.add_term(units_on[t - 1], 1.0);
            }
            problem.add_constraint(Constraint::at_least(
                format!("{}_starts_{}", self.name, t),
                start,
                0.0,
            ));

            problem.add_objective_term(units_on[t], p.running_cost * dt);
            problem.add_objective_term(starts[t], p.start_cost);
            problem.add_objective_term(power_out[t], p.power_cost * dt);
        }

        model.publish(&io_in, power_in);
        model.publish(&io_out, power_out);
        model.publish(&io_on, units_on);
        Ok(model)
    }
}
