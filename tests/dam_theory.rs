use eesrep::components::{Dam, FatalSink, GenericBus, Sink, Source, StorageBound};
use eesrep::domain::TimeSeries;
use eesrep::optimizer::MiniLpSolver;
use eesrep::Eesrep;
use rstest::rstest;

const TOLERANCE: f64 = 1e-5;

const INFLOW: [f64; 10] = [5.0, 5.0, 5.0, 5.0, 5.0, 3.0, 3.0, 3.0, 3.0, 3.0];
const LOAD: [f64; 10] = [4.0, 6.0, 5.0, 7.0, 2.0, 3.0, 4.0, 1.0, 5.0, 3.0];

fn model() -> Eesrep {
    Eesrep::new(Box::new(MiniLpSolver::default()))
}

fn series(values: &[f64]) -> TimeSeries {
    TimeSeries::from_steps(1.0, values).unwrap()
}

/// Null source -> dam -> fatal sink, lossless, no storage maximum
fn closed_loop(window: usize, horizon: usize, iterations: usize) -> Eesrep {
    let mut model = model();
    let null_source = Source::new("null_source", 0.0, 0.0, 1.0);
    let dam = Dam::new("dam", series(&INFLOW)).with_initial_storage(10.0);
    let fatal_sink = FatalSink::new("fatal_sink", series(&LOAD));

    let links = [
        (null_source.power_out(), dam.power_in()),
        (dam.power_out(), fatal_sink.power_in()),
    ];
    model.add_component(null_source).unwrap();
    model.add_component(dam).unwrap();
    model.add_component(fatal_sink).unwrap();
    for (source, destination) in &links {
        model.add_link(source, destination, 1.0, 0.0).unwrap();
    }

    model
        .define_time_range(1.0, window, horizon, iterations)
        .unwrap();
    model
}

fn theoretical_storage(initial: f64) -> Vec<f64> {
    INFLOW
        .iter()
        .zip(LOAD)
        .scan(initial, |storage, (inflow, load)| {
            *storage += inflow - load;
            Some(*storage)
        })
        .collect()
}

#[test]
fn test_mass_balance() {
    let mut model = closed_loop(10, 10, 1);
    model.solve().unwrap();

    let results = model.get_results();
    let production = results.get("dam", "power_out").unwrap();
    let storage = results.get("dam", "storage").unwrap();
    assert_eq!(production.len(), LOAD.len());

    for (t, expected) in theoretical_storage(10.0).iter().enumerate() {
        assert!((production[t] - LOAD[t]).abs() < TOLERANCE, "power_out at {}", t);
        assert!((storage[t] - expected).abs() < TOLERANCE, "storage at {}", t);
    }
}

#[test]
fn test_rolling_horizon_matches_single_window() {
    let mut single = closed_loop(10, 10, 1);
    single.solve().unwrap();

    // 3 * 2 + 4 = 10 steps
    let mut rolling = closed_loop(2, 4, 4);
    rolling.solve().unwrap();

    let table = single.get_results().as_table();
    let rolled = rolling.get_results().as_table();
    assert_eq!(
        table.headers().collect::<Vec<_>>(),
        rolled.headers().collect::<Vec<_>>()
    );
    for header in table.headers() {
        let expected = table.column(header).unwrap();
        let actual = rolled.column(header).unwrap();
        assert_eq!(expected.len(), actual.len(), "{}", header);
        for (e, a) in expected.iter().zip(actual) {
            assert!((e - a).abs() < TOLERANCE, "{}: {} != {}", header, e, a);
        }
    }

    let last = theoretical_storage(10.0)[9];
    let carried = rolling
        .carried_state()
        .iter()
        .find(|(key, _)| key.component == "dam" && key.io == "storage")
        .map(|(_, value)| value)
        .unwrap();
    assert!((carried - last).abs() < TOLERANCE);
}

/// Dam, backup source and spillage sink sharing one bus with a fatal load
fn bus_network(dam: Dam, load: f64) -> Eesrep {
    let mut model = model();
    let bus = GenericBus::new("bus");
    let unsupplied = Source::new("unsupplied", 0.0, 10_000.0, 10.0);
    let spilled = Sink::new("spilled", 0.0, 10_000.0, 50.0);
    let fatal_sink = FatalSink::new("fatal_sink", TimeSeries::constant(load).unwrap());

    let plugs = [
        (dam.power_out(), bus.input()),
        (unsupplied.power_out(), bus.input()),
        (fatal_sink.power_in(), bus.output()),
        (spilled.power_in(), bus.output()),
    ];
    model.add_component(bus).unwrap();
    model.add_component(unsupplied).unwrap();
    model.add_component(spilled).unwrap();
    model.add_component(dam).unwrap();
    model.add_component(fatal_sink).unwrap();
    for (io, bus_io) in &plugs {
        model.plug_to_bus(io, bus_io, 1.0, 0.0).unwrap();
    }
    model
}

fn assert_bus_balance(model: &Eesrep) {
    let results = model.get_results();
    let dam = results.get("dam", "power_out").unwrap();
    let unsupplied = results.get("unsupplied", "power_out").unwrap();
    let load = results.get("fatal_sink", "power_in").unwrap();
    let spilled = results.get("spilled", "power_in").unwrap();
    for t in 0..results.len() {
        let fed = dam[t] + unsupplied[t];
        let drawn = load[t] + spilled[t];
        assert!((fed - drawn).abs() < TOLERANCE, "bus balance at {}", t);
    }
}

#[test]
fn test_empty_dam_leaves_load_to_backup() {
    let dam = Dam::new("dam", TimeSeries::constant(0.0).unwrap()).with_initial_storage(0.0);
    let mut model = bus_network(dam, 100.0);
    model.define_time_range(1.0, 5, 5, 1).unwrap();
    model.solve().unwrap();

    let results = model.get_results();
    let unsupplied = results.get("unsupplied", "power_out").unwrap();
    let pumped = results.get("dam", "power_in").unwrap();
    let produced = results.get("dam", "power_out").unwrap();
    assert_eq!(unsupplied.len(), 5);
    for t in 0..5 {
        assert!((unsupplied[t] - 100.0).abs() < TOLERANCE, "unsupplied at {}", t);
        assert!(pumped[t].abs() < TOLERANCE, "power_in at {}", t);
        assert!(produced[t].abs() < TOLERANCE, "power_out at {}", t);
    }
    assert_bus_balance(&model);
}

#[test]
fn test_variable_minimum_storage() {
    let minimum = [0.1, 0.2, 0.3, 0.35, 0.4, 0.45, 0.4, 0.3, 0.2, 0.1, 0.1];
    let dam = Dam::new("dam", TimeSeries::constant(2.0).unwrap())
        .with_capacity(100.0)
        .with_initial_storage(50.0)
        .with_storage_min(StorageBound::Variable(series(&minimum)));
    let mut model = bus_network(dam, 5.0);
    model.define_time_range(1.0, 1, 10, 1).unwrap();
    model.solve().unwrap();

    let storage = model.get_results().get("dam", "storage").unwrap();
    assert_eq!(storage.len(), 10);
    // storage[t] is the end of step t, compared with the bound at t + 1
    for (t, value) in storage.iter().enumerate() {
        assert!(
            value - 100.0 * minimum[t + 1] >= -TOLERANCE,
            "storage {} below minimum at {}",
            value,
            t
        );
    }
    assert_bus_balance(&model);
}

#[rstest]
#[case(10, 10, 1)]
#[case(2, 4, 4)]
fn test_variable_maximum_storage(
    #[case] window: usize,
    #[case] horizon: usize,
    #[case] iterations: usize,
) {
    let maximum = [0.5, 0.55, 0.6, 0.6, 0.55, 0.5, 0.45, 0.5, 0.6, 0.7, 0.7];
    let dam = Dam::new("dam", TimeSeries::constant(8.0).unwrap())
        .with_capacity(100.0)
        .with_turbine_power(4.0)
        .with_initial_storage(40.0)
        .with_storage_max(StorageBound::Variable(series(&maximum)));
    let mut model = bus_network(dam, 3.0);
    model
        .define_time_range(1.0, window, horizon, iterations)
        .unwrap();
    model.solve().unwrap();

    let storage = model.get_results().get("dam", "storage").unwrap();
    assert_eq!(storage.len(), 10);
    for (t, value) in storage.iter().enumerate() {
        assert!(
            value - 100.0 * maximum[t + 1] <= TOLERANCE,
            "storage {} above maximum at {}",
            value,
            t
        );
    }
    assert_bus_balance(&model);
}

#[test]
fn test_fixed_bounds_are_hard() {
    // Demand cannot be met without draining below the fixed minimum
    let dam = Dam::new("dam", TimeSeries::constant(0.0).unwrap())
        .with_initial_storage(10.0)
        .with_storage_min(StorageBound::Fixed(8.0));
    let mut model = model();
    let fatal_sink = FatalSink::new("fatal_sink", TimeSeries::constant(1.0).unwrap());
    let (out, input) = (dam.power_out(), fatal_sink.power_in());
    model.add_component(dam).unwrap();
    model.add_component(fatal_sink).unwrap();
    model.add_link(&out, &input, 1.0, 0.0).unwrap();
    model.define_time_range(1.0, 1, 1, 4).unwrap();

    let result = model.solve();
    assert!(matches!(
        result,
        Err(eesrep::EesrepError::Infeasible { window: 2, .. })
    ));
    let storage = model.get_results().get("dam", "storage").unwrap();
    assert_eq!(storage.len(), 2);
    assert!((storage[0] - 9.0).abs() < TOLERANCE);
    assert!((storage[1] - 8.0).abs() < TOLERANCE);
}
