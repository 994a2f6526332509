//! Model builder and rolling-horizon loop
//!
//! [`Eesrep`] owns the registered components, links and buses. `solve` walks
//! the windows of the time range in order: every window problem is rebuilt
//! from scratch and only the [`CarriedState`] survives from one window to the
//! next.

pub mod results;

pub use results::*;

use itertools::Itertools;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

use crate::components::{BuildContext, BusKind, Component};
use crate::config::EesrepConfig;
use crate::domain::{CarriedState, ComponentIo, IoKey, TimeGrid, TimeRange, TimeSerieType};
use crate::error::{EesrepError, Result};
use crate::network::{BusAttachment, BusEntry, Link};
use crate::optimizer::{offset_ids, LinearProblem, SolverError, SolverInterface, VariableId};

pub struct Eesrep {
    solver: Box<dyn SolverInterface>,
    components: Vec<Box<dyn Component>>,
    index: HashMap<String, usize>,
    ios: BTreeMap<IoKey, ComponentIo>,
    links: Vec<Link>,
    buses: BTreeMap<String, BusEntry>,
    time_range: Option<TimeRange>,
    initial_values: CarriedState,
    carried: CarriedState,
    results: Results,
}

impl Eesrep {
    pub fn new(solver: Box<dyn SolverInterface>) -> Self {
        Self {
            solver,
            components: Vec::new(),
            index: HashMap::new(),
            ios: BTreeMap::new(),
            links: Vec::new(),
            buses: BTreeMap::new(),
            time_range: None,
            initial_values: CarriedState::new(),
            carried: CarriedState::new(),
            results: Results::new(),
        }
    }

    /// Model with the configured backend and time range
    pub fn from_config(config: &EesrepConfig) -> Result<Self> {
        let solver = config.solver.backend.build(&config.solver)?;
        let mut model = Self::new(solver);
        model.time_range = Some(config.time_range.to_time_range()?);
        Ok(model)
    }

    pub fn add_component<C: Component + 'static>(&mut self, component: C) -> Result<()> {
        self.register(Box::new(component))
    }

    fn register(&mut self, component: Box<dyn Component>) -> Result<()> {
        let name = component.name().to_string();
        if name.is_empty() {
            return Err(EesrepError::Parameters("component name is empty".to_string()));
        }
        if self.index.contains_key(&name) {
            return Err(EesrepError::DuplicateName(name));
        }
        component.validate()?;

        let ios = component.declare_ios();
        if let Some(io) = ios.iter().find(|io| io.component != name) {
            return Err(EesrepError::Parameters(format!(
                "{} declares {} which belongs to another component",
                name, io
            )));
        }
        if let Some(duplicate) = ios.iter().map(|io| io.name.as_str()).duplicates().next() {
            return Err(EesrepError::Parameters(format!(
                "{} declares IO '{}' twice",
                name, duplicate
            )));
        }

        debug!(component = %name, kind = %component.kind(), ios = ios.len(), "component registered");
        self.ios.extend(ios.into_iter().map(|io| (io.key(), io)));
        if let Some(kind) = component.bus_kind() {
            self.buses.insert(name.clone(), BusEntry::new(name.clone(), kind));
        }
        self.index.insert(name, self.components.len());
        self.components.push(component);
        Ok(())
    }

    /// `destination = factor * source + offset` at every step
    pub fn add_link(
        &mut self,
        source: &ComponentIo,
        destination: &ComponentIo,
        factor: f64,
        offset: f64,
    ) -> Result<()> {
        check_transform(factor, offset)?;
        let source = self.registered_io(source)?;
        let destination = self.registered_io(destination)?;

        for io in [source, destination] {
            ensure_exchangeable(io)?;
            if self.buses.contains_key(&io.component) {
                return Err(EesrepError::LinkType(format!(
                    "{} belongs to a bus, use plug_to_bus",
                    io
                )));
            }
        }
        if !source.is_output() || !destination.is_input() {
            return Err(EesrepError::LinkType(format!(
                "a link goes from an output to an input, got {} -> {}",
                source, destination
            )));
        }
        if source.kind != destination.kind {
            return Err(EesrepError::LinkType(format!(
                "cannot link {} to {}",
                source, destination
            )));
        }

        let link = Link::new(source.key(), destination.key(), factor, offset);
        self.links.push(link);
        Ok(())
    }

    /// Register a bus from a kind name and its raw parameters
    pub fn create_bus(&mut self, kind: &str, params: serde_json::Value) -> Result<&BusEntry> {
        let kind = BusKind::parse(kind)?;
        let params = kind.parse_params(params)?;
        let name = params.name().to_string();
        self.add_component(BusKind::instantiate(params))?;
        self.bus(&name)
            .ok_or(EesrepError::UnknownComponent(name))
    }

    /// Attach `io` to the `input` or `output` side of a bus
    pub fn plug_to_bus(
        &mut self,
        io: &ComponentIo,
        bus_io: &ComponentIo,
        factor: f64,
        offset: f64,
    ) -> Result<()> {
        check_transform(factor, offset)?;
        if !self.buses.contains_key(&bus_io.component) {
            return Err(EesrepError::BusType(format!(
                "{} is not a registered bus",
                bus_io.component
            )));
        }
        let bus_io = self.registered_io(bus_io)?.clone();
        let io = self.registered_io(io)?.clone();
        ensure_exchangeable(&io)?;
        if self.buses.contains_key(&io.component) {
            return Err(EesrepError::LinkType(format!(
                "cannot plug bus IO {} into another bus",
                io
            )));
        }

        let feeds_bus = match bus_io.name.as_str() {
            "input" => true,
            "output" => false,
            other => {
                return Err(EesrepError::BusType(format!(
                    "bus {} has no side '{}'",
                    bus_io.component, other
                )))
            }
        };
        if feeds_bus != io.is_output() {
            return Err(EesrepError::LinkType(format!(
                "{} cannot be plugged into {}",
                io, bus_io
            )));
        }
        if io.kind != bus_io.kind {
            return Err(EesrepError::LinkType(format!(
                "{} and {} carry different kinds",
                io, bus_io
            )));
        }

        let attachment = BusAttachment {
            io: io.key(),
            factor,
            offset,
        };
        let entry = self
            .buses
            .get_mut(&bus_io.component)
            .ok_or_else(|| EesrepError::UnknownComponent(bus_io.component.clone()))?;
        if feeds_bus {
            entry.inputs.push(attachment);
        } else {
            entry.outputs.push(attachment);
        }
        Ok(())
    }

    /// Value of a continuity IO before the first window
    pub fn set_initial_value(&mut self, io: &ComponentIo, value: f64) -> Result<()> {
        let io = self.registered_io(io)?;
        if !io.continuity {
            return Err(EesrepError::Parameters(format!(
                "{} is not carried across windows",
                io
            )));
        }
        if !value.is_finite() {
            return Err(EesrepError::Parameters(format!(
                "initial value of {} is not finite",
                io
            )));
        }
        let key = io.key();
        self.initial_values.insert(key, value);
        Ok(())
    }

    pub fn define_time_range(
        &mut self,
        step_duration: f64,
        window_steps: usize,
        horizon_steps: usize,
        iterations: usize,
    ) -> Result<()> {
        let range = TimeRange::new(step_duration, window_steps, horizon_steps, iterations)?;
        self.time_range = Some(range);
        Ok(())
    }

    pub fn set_time_range(&mut self, range: TimeRange) {
        self.time_range = Some(range);
    }

    pub fn time_range(&self) -> Option<&TimeRange> {
        self.time_range.as_ref()
    }

    pub fn io(&self, component: &str, name: &str) -> Result<ComponentIo> {
        if !self.index.contains_key(component) {
            return Err(EesrepError::UnknownComponent(component.to_string()));
        }
        self.ios
            .get(&IoKey::new(component, name))
            .cloned()
            .ok_or_else(|| EesrepError::UnknownIo(format!("{}_{}", component, name)))
    }

    pub fn component(&self, name: &str) -> Option<&dyn Component> {
        self.index.get(name).map(|&i| self.components[i].as_ref())
    }

    /// Registered component names, in registration order
    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(|c| c.name())
    }

    pub fn bus(&self, name: &str) -> Option<&BusEntry> {
        self.buses.get(name)
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn get_results(&self) -> &Results {
        &self.results
    }

    /// Continuity values after the last committed window
    pub fn carried_state(&self) -> &CarriedState {
        &self.carried
    }

    /// Run every window of the time range in order.
    ///
    /// Previous results are discarded first. On an infeasible window the loop
    /// stops and the windows committed so far stay in the results.
    pub fn solve(&mut self) -> Result<()> {
        let range = self.time_range.clone().ok_or_else(|| {
            EesrepError::Configuration("no time range defined".to_string())
        })?;
        self.results = Results::new();
        self.carried = self.initial_values.clone();

        for bus in self.buses.values().filter(|b| b.is_empty()) {
            warn!(bus = %bus.name, "bus has no attachment, no balance is written");
        }
        info!(
            components = self.components.len(),
            links = self.links.len(),
            buses = self.buses.len(),
            iterations = range.iterations(),
            total_steps = range.total_steps(),
            "starting rolling-horizon solve"
        );

        for grid in range.windows() {
            let window = grid.iteration();
            let (problem, variables) = self.build_window(&grid, &self.carried)?;
            debug!(
                window,
                first_step = grid.first_step(),
                steps = grid.len(),
                variables = problem.num_variables(),
                constraints = problem.num_constraints(),
                "window built"
            );

            let solution = self.solver.solve(&problem).map_err(|e| match e {
                SolverError::Infeasible => EesrepError::Infeasible {
                    window,
                    reason: e.to_string(),
                },
                other => EesrepError::Solver(format!("window {}: {}", window, other)),
            })?;

            self.results.commit(&grid, &variables, &solution);
            let committed = self.continuity_values(&grid, &variables, |id| solution.value(id));
            self.carried = self.carried.merged_with(&committed);
            debug!(window, objective = solution.objective(), "window committed");
        }

        info!(steps = self.results.len(), "rolling-horizon solve finished");
        Ok(())
    }

    fn registered_io(&self, io: &ComponentIo) -> Result<&ComponentIo> {
        self.ios
            .get(&io.key())
            .ok_or_else(|| EesrepError::UnknownIo(io.key().to_string()))
    }

    /// Assemble the problem of one window with the variables of every IO
    fn build_window(
        &self,
        grid: &TimeGrid,
        carried: &CarriedState,
    ) -> Result<(LinearProblem, BTreeMap<IoKey, Vec<VariableId>>)> {
        let ctx = BuildContext::new(grid, carried);
        let mut problem = LinearProblem::new();
        let mut variables = BTreeMap::new();

        for component in self.components.iter().filter(|c| c.bus_kind().is_none()) {
            let (fragment, published) = component.build(&ctx)?.into_parts();
            let offset = problem.append(fragment);
            for io in component.declare_ios() {
                let vars = published
                    .get(&io.name)
                    .filter(|vars| vars.len() == grid.len())
                    .ok_or_else(|| {
                        EesrepError::Parameters(format!(
                            "{} did not publish {} variables for {}",
                            component.name(),
                            grid.len(),
                            io
                        ))
                    })?;
                variables.insert(io.key(), offset_ids(vars, offset));
            }
        }

        for link in &self.links {
            let lookup = |key: &IoKey| {
                variables
                    .get(key)
                    .ok_or_else(|| EesrepError::UnknownIo(key.to_string()))
            };
            for constraint in link.constraints(lookup(&link.source)?, lookup(&link.destination)?) {
                problem.add_constraint(constraint);
            }
        }

        for bus in self.buses.values().filter(|b| !b.is_empty()) {
            for constraint in bus.balance_constraints(&variables, grid.len())? {
                problem.add_constraint(constraint);
            }
        }

        Ok((problem, variables))
    }

    /// Values of the continuity IOs at the last committed step
    fn continuity_values(
        &self,
        grid: &TimeGrid,
        variables: &BTreeMap<IoKey, Vec<VariableId>>,
        value: impl Fn(VariableId) -> f64,
    ) -> CarriedState {
        let mut state = CarriedState::new();
        let Some(last) = grid.last_committed() else {
            return state;
        };
        for (key, _) in self.ios.iter().filter(|(_, io)| io.continuity) {
            if let Some(vars) = variables.get(key) {
                state.insert(key.clone(), value(vars[last]));
            }
        }
        state
    }
}

fn ensure_exchangeable(io: &ComponentIo) -> Result<()> {
    if io.kind == TimeSerieType::Discrete {
        return Err(EesrepError::LinkType(format!(
            "{} is a state and cannot be linked",
            io
        )));
    }
    Ok(())
}

fn check_transform(factor: f64, offset: f64) -> Result<()> {
    if !factor.is_finite() || !offset.is_finite() {
        return Err(EesrepError::Parameters(format!(
            "factor ({}) and offset ({}) must be finite",
            factor, offset
        )));
    }
    Ok(())
}
