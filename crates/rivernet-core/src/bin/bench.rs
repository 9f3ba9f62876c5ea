/// Benchmarks for node steps, network runs and objective evaluations.
///
/// Uses std::time::Instant for timing, a deterministic LCG PRNG for data generation,
/// and std::hint::black_box to prevent dead-code elimination.
use std::hint::black_box;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde_json::{json, Map, Value};

use rivernet_core::{
    metrics, run_catchment, run_isolated, Climate, EvapKind, Node, NodeModel, Objective,
    RunInputs, StreamNetwork,
};

const REPEATS: usize = 7;

/// Simple LCG PRNG for deterministic data generation.
fn make_data(n: usize, seed: u64) -> (Vec<f64>, Vec<f64>) {
    let mut state = seed;
    let mut next_f64 = || -> f64 {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 33) as f64 / (1u64 << 31) as f64
    };

    let rain: Vec<f64> = (0..n).map(|_| next_f64() * 10.0).collect();
    let evap: Vec<f64> = (0..n).map(|_| 0.5 + next_f64() * 4.5).collect();
    (rain, evap)
}

/// Run a closure `REPEATS` times, return the median duration.
fn median_time<F: FnMut()>(mut f: F) -> Duration {
    let mut times: Vec<Duration> = (0..REPEATS)
        .map(|_| {
            let start = Instant::now();
            f();
            start.elapsed()
        })
        .collect();
    times.sort();
    times[REPEATS / 2]
}

/// Linear chain `n0 -> n1 -> ... -> dam` of `n_nodes` IHACRES nodes ending in a dam.
fn chain_topology(n_nodes: usize) -> Value {
    let mut nodes = Map::new();
    for i in 0..n_nodes {
        let inlets: Vec<String> = if i == 0 { vec![] } else { vec![format!("n{}", i - 1)] };
        nodes.insert(
            format!("n{i}"),
            json!({"node_type": "IHACRES", "area": 100.0, "inlets": inlets}),
        );
    }
    nodes.insert(
        "dam".to_string(),
        json!({"node_type": "Dam", "max_store": 50_000.0, "inlets": [format!("n{}", n_nodes - 1)]}),
    );
    Value::Object(nodes)
}

fn climate_for(network: &StreamNetwork, n: usize) -> Climate {
    let start = NaiveDate::from_ymd_opt(1980, 1, 1).unwrap();
    let dates = start.iter_days().take(n).collect();
    let mut climate = Climate::new(dates, EvapKind::Evapotranspiration).unwrap();
    for (seed, name) in network.node_names().enumerate() {
        let (rain, evap) = make_data(n, 42 + seed as u64);
        climate = climate.with_gauge(name, rain, evap).unwrap();
    }
    climate
}

fn bench_isolated(sizes: &[usize]) -> Vec<(&'static str, usize, Duration)> {
    let network = StreamNetwork::build("single", &chain_topology(1)).unwrap();
    let mut results = Vec::new();

    for &n in sizes {
        let climate = climate_for(&network, n);
        let mut node: Node = network.get_node("n0").unwrap().clone();

        // Warmup
        black_box(run_isolated(&mut node, &climate, None, None, None).unwrap());

        let dur = median_time(|| {
            node.reset();
            black_box(run_isolated(&mut node, &climate, None, None, None).unwrap());
        });
        results.push(("ihacres isolated", n, dur));
    }
    results
}

fn bench_catchment(n_nodes: usize, sizes: &[usize]) -> Vec<(&'static str, usize, Duration)> {
    let mut network = StreamNetwork::build("chain", &chain_topology(n_nodes)).unwrap();
    let mut results = Vec::new();

    for &n in sizes {
        let climate = climate_for(&network, n);

        // Warmup
        network.reset();
        black_box(run_catchment(&mut network, &climate, &RunInputs::default()).unwrap());

        let dur = median_time(|| {
            network.reset();
            black_box(run_catchment(&mut network, &climate, &RunInputs::default()).unwrap());
        });
        results.push(("chain catchment", n, dur));
    }
    results
}

fn bench_objective(sizes: &[usize]) -> Vec<(&'static str, usize, Duration)> {
    let mut network = StreamNetwork::build("chain", &chain_topology(4)).unwrap();
    let mut results = Vec::new();

    for &n in sizes {
        let climate = climate_for(&network, n);
        let observed = run_catchment(&mut network, &climate, &RunInputs::default())
            .unwrap()
            .remove("dam")
            .unwrap();
        network.reset();
        let objective = Objective::new("n3", observed, &climate, metrics::nse).run_through("dam");
        let x0 = network.current_parameters("n3").unwrap();

        let dur = median_time(|| {
            black_box(objective.evaluate(&mut network, &x0).unwrap());
        });
        results.push(("objective", n, dur));

        let candidates = vec![x0.clone(); 64];
        let dur = median_time(|| {
            black_box(objective.evaluate_batch(&network, &candidates));
        });
        results.push(("objective x64 batch", n, dur));
    }
    results
}

fn main() {
    println!("Network Simulation Benchmarks");
    println!("============================================================");
    println!("{:<22} {:>6}   {:>12}", "Case", "N", "Median (ms)");
    println!("--------------------------------------------");

    let mut all_results: Vec<(&str, usize, Duration)> = Vec::new();

    all_results.extend(bench_isolated(&[3650, 36500]));
    all_results.extend(bench_catchment(10, &[3650, 36500]));
    all_results.extend(bench_objective(&[3650]));

    for (case, n, dur) in &all_results {
        let ms = dur.as_secs_f64() * 1000.0;
        println!("{:<22} {:>6}      {:>8.2}", case, n, ms);
    }

    println!("============================================================");
}
