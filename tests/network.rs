use eesrep::components::{Cluster, ClusterParams, FatalSink, Sink, Source};
use eesrep::domain::TimeSeries;
use eesrep::optimizer::MiniLpSolver;
use eesrep::{Eesrep, EesrepError};
use rstest::{fixture, rstest};
use serde_json::json;
use std::collections::BTreeSet;

#[fixture]
fn model() -> Eesrep {
    Eesrep::new(Box::new(MiniLpSolver::default()))
}

#[rstest]
fn test_wrong_bus_type(mut model: Eesrep) {
    let result = model.create_bus("wrong_bus", json!({}));
    assert!(matches!(result, Err(EesrepError::BusType(_))));
}

#[rstest]
#[case(json!({}))]
#[case(json!({"name": 2}))]
#[case(json!({"name": "the_bus", "type": "bus"}))]
fn test_malformed_bus_parameters(mut model: Eesrep, #[case] params: serde_json::Value) {
    let result = model.create_bus("bus", params);
    let err = result.err().unwrap();
    assert_eq!(err.kind(), "ParametersException");
}

#[rstest]
fn test_bus_entry_keys(mut model: Eesrep) {
    let entry = model.create_bus("bus", json!({"name": "the_bus"})).unwrap();
    let value = serde_json::to_value(entry).unwrap();
    let keys: BTreeSet<_> = value.as_object().unwrap().keys().cloned().collect();
    let expected: BTreeSet<_> = ["name", "component_type", "inputs", "outputs"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(keys, expected);
    assert!(model.bus("the_bus").is_some());
    assert!(model.io("the_bus", "input").is_ok());
}

#[rstest]
fn test_bus_balance_with_factors(mut model: Eesrep) {
    model.create_bus("bus", json!({"name": "bus"})).unwrap();
    let bus_in = model.io("bus", "input").unwrap();
    let bus_out = model.io("bus", "output").unwrap();

    let cheap = Source::new("cheap", 0.0, 4.0, 1.0);
    let expensive = Source::new("expensive", 0.0, 100.0, 5.0);
    let load = FatalSink::new("load", TimeSeries::from_steps(1.0, &[2.0, 6.0, 10.0]).unwrap());
    let (cheap_out, expensive_out, load_in) =
        (cheap.power_out(), expensive.power_out(), load.power_in());
    model.add_component(cheap).unwrap();
    model.add_component(expensive).unwrap();
    model.add_component(load).unwrap();

    // 10% losses on the cheap feeder
    model.plug_to_bus(&cheap_out, &bus_in, 0.9, 0.0).unwrap();
    model.plug_to_bus(&expensive_out, &bus_in, 1.0, 0.0).unwrap();
    model.plug_to_bus(&load_in, &bus_out, 1.0, 0.0).unwrap();
    model.define_time_range(1.0, 3, 3, 1).unwrap();
    model.solve().unwrap();

    let results = model.get_results();
    let cheap = results.get("cheap", "power_out").unwrap();
    let expensive = results.get("expensive", "power_out").unwrap();
    let load = results.get("load", "power_in").unwrap();
    for t in 0..3 {
        assert!((0.9 * cheap[t] + expensive[t] - load[t]).abs() < 1e-6);
    }
    // cheap source saturates before the expensive one is used
    assert!((cheap[0] - 2.0 / 0.9).abs() < 1e-6);
    assert!((cheap[2] - 4.0).abs() < 1e-6);
    assert!((expensive[2] - 6.4).abs() < 1e-6);
}

#[rstest]
fn test_unserved_fatal_sink_is_infeasible(mut model: Eesrep) {
    let source = Source::new("source", 0.0, 5.0, 1.0);
    let load = FatalSink::new(
        "load",
        TimeSeries::from_steps(1.0, &[1.0, 1.0, 1.0, 1.0, 9.0, 9.0]).unwrap(),
    );
    let (out, input) = (source.power_out(), load.power_in());
    model.add_component(source).unwrap();
    model.add_component(load).unwrap();
    model.add_link(&out, &input, 1.0, 0.0).unwrap();
    model.define_time_range(1.0, 2, 2, 3).unwrap();

    let err = model.solve().unwrap_err();
    assert!(matches!(err, EesrepError::Infeasible { window: 2, .. }));
    assert_eq!(err.kind(), "InfeasibleException");

    let first = model.get_results().clone();
    assert_eq!(first.len(), 4);
    assert_eq!(&first, model.get_results());
}

#[rstest]
fn test_link_with_offset(mut model: Eesrep) {
    let source = Source::new("source", 0.0, 10.0, 1.0);
    let sink = Sink::new("sink", 3.0, 3.0, 0.0);
    let (out, input) = (source.power_out(), sink.power_in());
    model.add_component(source).unwrap();
    model.add_component(sink).unwrap();
    // sink = 0.5 * source + 1
    model.add_link(&out, &input, 0.5, 1.0).unwrap();
    model.define_time_range(1.0, 2, 2, 1).unwrap();
    model.solve().unwrap();

    let produced = model.get_results().get("source", "power_out").unwrap();
    assert!(produced.iter().all(|p| (p - 4.0).abs() < 1e-6));
}

fn cluster_model(demand: &[f64], window: usize, iterations: usize) -> Eesrep {
    let mut model = Eesrep::new(Box::new(MiniLpSolver::default()));
    let fuel = Source::new("fuel", 0.0, f64::INFINITY, 0.0);
    let cluster = Cluster::new(
        "cluster",
        ClusterParams {
            n_units: 4,
            unit_min_power: 10.0,
            unit_max_power: 100.0,
            running_cost: 50.0,
            start_cost: 10.0,
            power_cost: 1.0,
            ..ClusterParams::default()
        },
    );
    let load = FatalSink::new("load", TimeSeries::from_steps(1.0, demand).unwrap());
    let links = [
        (fuel.power_out(), cluster.power_in()),
        (cluster.power_out(), load.power_in()),
    ];
    model.add_component(fuel).unwrap();
    model.add_component(cluster).unwrap();
    model.add_component(load).unwrap();
    for (source, destination) in &links {
        model.add_link(source, destination, 1.0, 0.0).unwrap();
    }
    model.define_time_range(1.0, window, window, iterations).unwrap();
    model
}

#[rstest]
#[case::single_window(3, 1)]
#[case::one_step_windows(1, 3)]
fn test_cluster_starts_right_number_of_units(#[case] window: usize, #[case] iterations: usize) {
    let mut model = cluster_model(&[250.0, 150.0, 50.0], window, iterations);
    model.solve().unwrap();

    let units = model.get_results().get("cluster", "units_on").unwrap();
    assert_eq!(units, &[3.0, 2.0, 1.0]);
    let units_on = model.io("cluster", "units_on").unwrap();
    assert_eq!(model.carried_state().get(&units_on), Some(1.0));
}
