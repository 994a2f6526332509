//! Network components
//!
//! Every component publishes its IOs through [`Component::declare_ios`] and,
//! for each window, builds its own fragment of the linear problem. The model
//! builder only ever talks to components through the [`Component`] trait.

pub mod bus;
pub mod converter;
pub mod dam;
pub mod source_sink;

pub use bus::*;
pub use converter::*;
pub use dam::*;
pub use source_sink::*;

use std::collections::BTreeMap;

use crate::domain::{CarriedState, ComponentIo, TimeGrid};
use crate::error::Result;
use crate::optimizer::{LinearProblem, VariableId};

/// Concrete component families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
pub enum ComponentKind {
    Source,
    Sink,
    FatalSink,
    Converter,
    Cluster,
    Dam,
    Bus,
}

/// What a component sees while building one window
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    grid: &'a TimeGrid,
    carried: &'a CarriedState,
}

impl<'a> BuildContext<'a> {
    pub fn new(grid: &'a TimeGrid, carried: &'a CarriedState) -> Self {
        Self { grid, carried }
    }

    pub fn grid(&self) -> &TimeGrid {
        self.grid
    }

    pub fn len(&self) -> usize {
        self.grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    pub fn duration(&self, t: usize) -> f64 {
        self.grid.duration(t)
    }

    /// Value of a continuity IO at the end of the previous window, or the
    /// user initial value on the first window
    pub fn carried(&self, io: &ComponentIo) -> Option<f64> {
        self.carried.get(io)
    }
}

/// Fragment of a window problem contributed by one component
#[derive(Debug, Clone, Default)]
pub struct ComponentModel {
    pub problem: LinearProblem,
    ios: BTreeMap<String, Vec<VariableId>>,
}

impl ComponentModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose one variable per step for the IO called `io`
    pub fn publish(&mut self, io: &ComponentIo, variables: Vec<VariableId>) {
        self.ios.insert(io.name.clone(), variables);
    }

    pub fn io_variables(&self, io: &str) -> Option<&[VariableId]> {
        self.ios.get(io).map(Vec::as_slice)
    }

    pub fn into_parts(self) -> (LinearProblem, BTreeMap<String, Vec<VariableId>>) {
        (self.problem, self.ios)
    }
}

/// Contract shared by every component of a network
pub trait Component: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    fn kind(&self) -> ComponentKind;

    fn declare_ios(&self) -> Vec<ComponentIo>;

    /// Check parameters before registration
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Variables, constraints and objective terms over the context grid.
    /// Each declared IO must be published with one variable per step.
    fn build(&self, ctx: &BuildContext<'_>) -> Result<ComponentModel>;

    /// Buses publish no variables; the builder turns their attachments into
    /// balance constraints
    fn bus_kind(&self) -> Option<BusKind> {
        None
    }
}

pub(crate) fn ensure_finite(component: &str, field: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(crate::error::EesrepError::Parameters(format!(
            "{}: {} is not finite: {}",
            component, field, value
        )))
    }
}
