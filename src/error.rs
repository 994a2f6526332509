use thiserror::Error;

/// Errors raised while assembling or solving an energy system model.
///
/// Structural errors (`Parameters`, `BusType`, `LinkType`, `DuplicateName`,
/// `Configuration`) are returned by the call that introduced them and leave
/// the model untouched. `Infeasible` is only returned by `Eesrep::solve`.
#[derive(Debug, Error)]
pub enum EesrepError {
    #[error("Invalid parameters: {0}")]
    Parameters(String),

    #[error("Unknown bus type: {0}")]
    BusType(String),

    #[error("Incompatible link: {0}")]
    LinkType(String),

    #[error("Name already registered: {0}")]
    DuplicateName(String),

    #[error("Invalid time range configuration: {0}")]
    Configuration(String),

    #[error("Window {window} is infeasible: {reason}")]
    Infeasible { window: usize, reason: String },

    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    #[error("Unknown IO: {0}")]
    UnknownIo(String),

    #[error("Time series error: {0}")]
    TimeSeries(String),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EesrepError {
    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            EesrepError::Parameters(_) => "ParametersException",
            EesrepError::BusType(_) => "BusTypeException",
            EesrepError::LinkType(_) => "LinkTypeException",
            EesrepError::DuplicateName(_) => "DuplicateNameException",
            EesrepError::Configuration(_) => "ConfigurationException",
            EesrepError::Infeasible { .. } => "InfeasibleException",
            EesrepError::UnknownComponent(_) => "UnknownComponent",
            EesrepError::UnknownIo(_) => "UnknownIo",
            EesrepError::TimeSeries(_) => "TimeSeriesError",
            EesrepError::Solver(_) => "SolverError",
            EesrepError::Csv(_) => "CsvError",
            EesrepError::Io(_) => "IoError",
        }
    }
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, EesrepError>;
