use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical nature of the values carried by an IO
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum TimeSerieType {
    /// Rate-like quantity (power, flow), meaningful per instant
    Intensive,
    /// Quantity accumulated over a step (energy, stored volume)
    Extensive,
    /// Integer state such as a count of running units. Never linked.
    Discrete,
}

/// Whether an IO receives or emits a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

/// Identifies an IO of a registered component
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IoKey {
    pub component: String,
    pub io: String,
}

impl IoKey {
    pub fn new(component: impl Into<String>, io: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            io: io.into(),
        }
    }
}

impl fmt::Display for IoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.component, self.io)
    }
}

/// Descriptor of one named terminal of a component.
///
/// A descriptor is not a variable. Components publish one variable per time
/// step for each declared IO when they are built for a window.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentIo {
    pub component: String,
    pub name: String,
    pub direction: Direction,
    pub kind: TimeSerieType,
    /// Value at a window start must equal the last committed value of the
    /// previous window
    pub continuity: bool,
}

impl ComponentIo {
    pub fn new(
        component: impl Into<String>,
        name: impl Into<String>,
        direction: Direction,
        kind: TimeSerieType,
        continuity: bool,
    ) -> Self {
        Self {
            component: component.into(),
            name: name.into(),
            direction,
            kind,
            continuity,
        }
    }

    pub fn input(component: &str, name: &str) -> Self {
        Self::new(component, name, Direction::Input, TimeSerieType::Intensive, false)
    }

    pub fn output(component: &str, name: &str) -> Self {
        Self::new(component, name, Direction::Output, TimeSerieType::Intensive, false)
    }

    pub fn key(&self) -> IoKey {
        IoKey::new(&self.component, &self.name)
    }

    pub fn is_input(&self) -> bool {
        self.direction == Direction::Input
    }

    pub fn is_output(&self) -> bool {
        self.direction == Direction::Output
    }
}

impl fmt::Display for ComponentIo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} ({}, {})",
            self.component, self.name, self.direction, self.kind
        )
    }
}
