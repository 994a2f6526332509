use anyhow::{Context, Result};
use eesrep::components::{Dam, FatalSink, GenericBus, Sink, Source, StorageBound};
use eesrep::config::{EesrepConfig, ScenarioConfig};
use eesrep::domain::TimeSeries;
use eesrep::{telemetry, Eesrep};
use tracing::{info, warn};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cfg = EesrepConfig::load()?;
    telemetry::init_tracing(&cfg.logging.filter);

    let Some(scenario) = cfg.scenario.clone() else {
        warn!("no [scenario] section in the configuration, nothing to solve");
        return Ok(());
    };

    let mut model = Eesrep::from_config(&cfg)?;
    build_dam_scenario(&mut model, &scenario)?;

    info!(
        backend = %cfg.solver.backend,
        data = %scenario.data_file.display(),
        "solving dam scenario"
    );
    model.solve()?;

    model
        .get_results()
        .as_table()
        .write_csv_path(&scenario.output_file)
        .with_context(|| format!("writing {}", scenario.output_file.display()))?;
    info!(
        steps = model.get_results().len(),
        output = %scenario.output_file.display(),
        "results written"
    );
    Ok(())
}

/// Dam and backup source feeding an inelastic load through one bus
fn build_dam_scenario(model: &mut Eesrep, scenario: &ScenarioConfig) -> Result<()> {
    let delimiter = u8::try_from(scenario.delimiter)
        .context("the CSV delimiter must be an ASCII character")?;
    let read_column = |column: &str| -> Result<TimeSeries> {
        let file = std::fs::File::open(&scenario.data_file)
            .with_context(|| format!("opening {}", scenario.data_file.display()))?;
        TimeSeries::from_csv_columns(file, delimiter, &scenario.time_column, column)
            .with_context(|| format!("reading column '{}'", column))
    };
    let load = read_column(&scenario.load_column)?;
    let inflow = read_column(&scenario.inflow_column)?;

    let bus = GenericBus::new("bus");
    let unsupplied = Source::new("unsupplied", 0.0, f64::INFINITY, scenario.unsupplied_cost);
    let spilled = Sink::new("spilled", 0.0, f64::INFINITY, scenario.spilled_cost);
    let fatal_sink = FatalSink::new("load", load);

    let params = &scenario.dam;
    let bound = |value: Option<f64>| value.map_or(StorageBound::Unenforced, StorageBound::Fixed);
    let dam = Dam::new("dam", inflow)
        .with_efficiency(params.efficiency)
        .with_turbine_power(params.turbine_power)
        .with_pump_power(params.pump_power)
        .with_capacity(params.capacity)
        .with_initial_storage(params.initial_storage)
        .with_storage_min(bound(params.storage_min))
        .with_storage_max(bound(params.storage_max));

    let plugs = [
        (dam.power_out(), bus.input()),
        (unsupplied.power_out(), bus.input()),
        (fatal_sink.power_in(), bus.output()),
        (spilled.power_in(), bus.output()),
    ];

    model.add_component(bus)?;
    model.add_component(unsupplied)?;
    model.add_component(spilled)?;
    model.add_component(dam)?;
    model.add_component(fatal_sink)?;
    for (io, bus_io) in &plugs {
        model.plug_to_bus(io, bus_io, 1.0, 0.0)?;
    }
    Ok(())
}
