use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{BuildContext, Component, ComponentKind, ComponentModel};
use crate::domain::ComponentIo;
use crate::error::{EesrepError, Result};

/// Closed set of bus kinds accepted by `create_bus`
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum BusKind {
    #[serde(rename = "bus")]
    #[strum(serialize = "bus")]
    Generic,
}

/// Parameters of a generic bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenericBusParams {
    pub name: String,
}

/// Typed parameters, one variant per [`BusKind`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusParams {
    Generic(GenericBusParams),
}

impl BusParams {
    pub fn name(&self) -> &str {
        match self {
            BusParams::Generic(p) => &p.name,
        }
    }
}

impl BusKind {
    /// Parse a kind name, failing with `BusType` on unknown names
    pub fn parse(kind: &str) -> Result<Self> {
        BusKind::from_str(kind).map_err(|_| EesrepError::BusType(kind.to_string()))
    }

    /// Check a raw parameter object against the schema of this kind
    pub fn parse_params(self, params: serde_json::Value) -> Result<BusParams> {
        if !params.is_object() {
            return Err(EesrepError::Parameters(format!(
                "{} parameters must be an object, got {}",
                self, params
            )));
        }
        match self {
            BusKind::Generic => serde_json::from_value::<GenericBusParams>(params)
                .map(BusParams::Generic)
                .map_err(|e| EesrepError::Parameters(format!("{} parameters: {}", self, e))),
        }
    }

    pub fn instantiate(params: BusParams) -> GenericBus {
        match params {
            BusParams::Generic(p) => GenericBus::new(p.name),
        }
    }
}

/// Balance point. It has no variables of its own: the model builder turns
/// its attachments into one balance constraint per step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericBus {
    name: String,
}

impl GenericBus {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn input(&self) -> ComponentIo {
        ComponentIo::input(&self.name, "input")
    }

    pub fn output(&self) -> ComponentIo {
        ComponentIo::output(&self.name, "output")
    }
}

impl Component for GenericBus {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Bus
    }

    fn declare_ios(&self) -> Vec<ComponentIo> {
        vec![self.input(), self.output()]
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(EesrepError::Parameters("bus name is empty".to_string()));
        }
        Ok(())
    }

    fn build(&self, _ctx: &BuildContext<'_>) -> Result<ComponentModel> {
        Ok(ComponentModel::new())
    }

    fn bus_kind(&self) -> Option<BusKind> {
        Some(BusKind::Generic)
    }
}
