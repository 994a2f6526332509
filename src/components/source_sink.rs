use super::{ensure_finite, BuildContext, Component, ComponentKind, ComponentModel};
use crate::domain::{ComponentIo, Sampling, TimeSeries};
use crate::error::{EesrepError, Result};

/// Flow bounded by `[min_flow, max_flow]` at every step, priced at `cost`
/// per unit of flow and per unit of time
#[derive(Debug, Clone, PartialEq)]
struct BoundedFlow {
    min_flow: f64,
    max_flow: f64,
    cost: f64,
}

impl BoundedFlow {
    fn validate(&self, component: &str) -> Result<()> {
        ensure_finite(component, "min_flow", self.min_flow)?;
        ensure_finite(component, "cost", self.cost)?;
        if self.max_flow.is_nan() {
            return Err(EesrepError::Parameters(format!("{}: max_flow is NaN", component)));
        }
        if self.max_flow < self.min_flow {
            return Err(EesrepError::Parameters(format!(
                "{}: max_flow ({}) must be >= min_flow ({})",
                component, self.max_flow, self.min_flow
            )));
        }
        Ok(())
    }

    fn build(&self, ctx: &BuildContext<'_>, io: &ComponentIo) -> ComponentModel {
        let mut model = ComponentModel::new();
        let prefix = io.key().to_string();
        let flow = model
            .problem
            .add_variables(&prefix, ctx.len(), self.min_flow, self.max_flow);
        for (t, var) in flow.iter().enumerate() {
            model.problem.add_objective_term(*var, self.cost * ctx.duration(t));
        }
        model.publish(io, flow);
        model
    }
}

/// Producer with a single `power_out` output
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    name: String,
    flow: BoundedFlow,
}

impl Source {
    pub fn new(name: impl Into<String>, min_flow: f64, max_flow: f64, cost: f64) -> Self {
        Self {
            name: name.into(),
            flow: BoundedFlow {
                min_flow,
                max_flow,
                cost,
            },
        }
    }

    pub fn power_out(&self) -> ComponentIo {
        ComponentIo::output(&self.name, "power_out")
    }
}

impl Component for Source {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Source
    }

    fn declare_ios(&self) -> Vec<ComponentIo> {
        vec![self.power_out()]
    }

    fn validate(&self) -> Result<()> {
        self.flow.validate(&self.name)
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<ComponentModel> {
        Ok(self.flow.build(ctx, &self.power_out()))
    }
}

/// Consumer with a single `power_in` input
#[derive(Debug, Clone, PartialEq)]
pub struct Sink {
    name: String,
    flow: BoundedFlow,
}

impl Sink {
    pub fn new(name: impl Into<String>, min_flow: f64, max_flow: f64, cost: f64) -> Self {
        Self {
            name: name.into(),
            flow: BoundedFlow {
                min_flow,
                max_flow,
                cost,
            },
        }
    }

    pub fn power_in(&self) -> ComponentIo {
        ComponentIo::input(&self.name, "power_in")
    }
}

impl Component for Sink {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Sink
    }

    fn declare_ios(&self) -> Vec<ComponentIo> {
        vec![self.power_in()]
    }

    fn validate(&self) -> Result<()> {
        self.flow.validate(&self.name)
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<ComponentModel> {
        Ok(self.flow.build(ctx, &self.power_in()))
    }
}

/// Inelastic consumer: its `power_in` is fixed to an external series.
///
/// Any mismatch with the rest of the network has to be absorbed elsewhere,
/// otherwise the window is infeasible.
#[derive(Debug, Clone, PartialEq)]
pub struct FatalSink {
    name: String,
    demand: TimeSeries,
}

impl FatalSink {
    pub fn new(name: impl Into<String>, demand: TimeSeries) -> Self {
        Self {
            name: name.into(),
            demand,
        }
    }

    pub fn power_in(&self) -> ComponentIo {
        ComponentIo::input(&self.name, "power_in")
    }
}

impl Component for FatalSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::FatalSink
    }

    fn declare_ios(&self) -> Vec<ComponentIo> {
        vec![self.power_in()]
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<ComponentModel> {
        let io = self.power_in();
        let demand = self.demand.resample(ctx.grid(), Sampling::StepStart)?;

        let mut model = ComponentModel::new();
        let prefix = io.key().to_string();
        let flow: Vec<_> = demand
            .iter()
            .enumerate()
            .map(|(t, &value)| {
                model
                    .problem
                    .add_variable(format!("{}_{}", prefix, t), value, value)
            })
            .collect();
        model.publish(&io, flow);
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CarriedState, TimeGrid};
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 10.0, 1.0, true)]
    #[case(5.0, 5.0, 0.0, true)]
    #[case(10.0, 0.0, 1.0, false)]
    #[case(f64::NAN, 10.0, 1.0, false)]
    #[case(0.0, f64::INFINITY, 1.0, true)]
    #[case(0.0, 10.0, f64::INFINITY, false)]
    fn test_source_validation(
        #[case] min: f64,
        #[case] max: f64,
        #[case] cost: f64,
        #[case] valid: bool,
    ) {
        let source = Source::new("source", min, max, cost);
        assert_eq!(source.validate().is_ok(), valid);
    }

    #[test]
    fn test_source_build() {
        let grid = TimeGrid::new(0, 3, 2.0);
        let carried = CarriedState::new();
        let ctx = BuildContext::new(&grid, &carried);

        let source = Source::new("unsupplied", 0.0, 100.0, 10.0);
        let model = source.build(&ctx).unwrap();
        let vars = model.io_variables("power_out").unwrap();
        assert_eq!(vars.len(), 3);
        assert_eq!(model.problem.variable(vars[1]).name, "unsupplied_power_out_1");
        assert_eq!(model.problem.variable(vars[1]).upper, 100.0);
        assert_eq!(model.problem.objective().terms().next(), Some((vars[0], 20.0)));
    }

    #[test]
    fn test_fatal_sink_fixes_flow() {
        let grid = TimeGrid::new(2, 2, 1.0);
        let carried = CarriedState::new();
        let ctx = BuildContext::new(&grid, &carried);

        let demand = TimeSeries::from_steps(1.0, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let sink = FatalSink::new("load", demand);
        let model = sink.build(&ctx).unwrap();
        let vars = model.io_variables("power_in").unwrap();
        let first = model.problem.variable(vars[0]);
        assert_eq!((first.lower, first.upper), (3.0, 3.0));
        let second = model.problem.variable(vars[1]);
        assert_eq!((second.lower, second.upper), (4.0, 4.0));
        assert_eq!(sink.declare_ios(), vec![ComponentIo::input("load", "power_in")]);
    }
}
