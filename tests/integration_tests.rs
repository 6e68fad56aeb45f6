//! Integration tests for the Toroid SOM engine.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use toroid::{
    toroidal_distance, DecayKind, GridCoord, Som, SomConfig, SomError, SomTrainer,
    TrainingState,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Two noisy 2-D blobs around (0, 0) and (5, 5), labelled 0 and 1.
fn create_clusters(per_cluster: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<u8>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(per_cluster * 2);
    let mut labels = Vec::with_capacity(per_cluster * 2);

    for (label, center) in [(0u8, 0.0), (1u8, 5.0)] {
        for _ in 0..per_cluster {
            data.push(vec![
                center + rng.gen_range(-0.5..0.5),
                center + rng.gen_range(-0.5..0.5),
            ]);
            labels.push(label);
        }
    }

    (data, labels)
}

fn euclid(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(p, q)| (p - q) * (p - q))
        .sum::<f64>()
        .sqrt()
}

#[test]
fn test_end_to_end_training() {
    init_logger();
    let (data, labels) = create_clusters(40, 1);
    let config = SomConfig::new(8, 8).with_seed(42);

    let initial = Som::initialize(&config, &data, &mut ChaCha8Rng::seed_from_u64(42)).unwrap();
    let initial_error = initial.quantization_error(&data).unwrap();

    let mut trainer = SomTrainer::new(config).unwrap();
    trainer.fit(&data, &labels, 500).unwrap();

    assert_eq!(trainer.state(), TrainingState::Idle);
    assert_eq!(trainer.epoch(), 500);
    assert_eq!(trainer.history(), &[trainer.error()]);
    assert!(
        trainer.error() < initial_error,
        "error {} did not improve on {}",
        trainer.error(),
        initial_error
    );

    let som = trainer.som().unwrap();
    assert!(som.weights().iter().all(|w| w.is_finite()));

    let a = som.find_winner(&[0.0, 0.0]).unwrap();
    let b = som.find_winner(&[5.0, 5.0]).unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_training_is_deterministic() {
    let (data, labels) = create_clusters(25, 2);
    let config = SomConfig::new(5, 7).with_seed(1234);

    let mut first = SomTrainer::new(config.clone()).unwrap();
    let mut second = SomTrainer::new(config).unwrap();
    first.fit(&data, &labels, 0).unwrap();
    first.fit(&data, &labels, 120).unwrap();
    second.fit(&data, &labels, 0).unwrap();
    second.fit(&data, &labels, 120).unwrap();

    assert_eq!(first.som(), second.som());
    assert_eq!(first.steps(), second.steps());
    assert_eq!(first.history(), second.history());

    let mut other = SomTrainer::new(SomConfig::new(5, 7).with_seed(99)).unwrap();
    other.fit(&data, &labels, 0).unwrap();
    other.fit(&data, &labels, 120).unwrap();
    assert_ne!(first.som(), other.som());
}

#[test]
fn test_single_sample_scenario() {
    init_logger();
    let config = SomConfig::new(4, 4).with_seed(42).with_alpha_start(0.6);
    let (spread, _) = create_clusters(10, 3);
    let grid = Som::initialize(&config, &spread, &mut ChaCha8Rng::seed_from_u64(42)).unwrap();
    let before = grid.clone();

    let sample = vec![vec![1.0, 1.0]];
    let mut trainer = SomTrainer::new(config).unwrap().with_som(grid).unwrap();
    trainer.fit(&sample, &["only"], 1).unwrap();

    let step = trainer.steps()[0];
    assert_eq!(step.alpha, 0.6);
    assert_eq!(step.sigma, 2.0);

    // Winner is the initially closest neuron
    let closest = before
        .index()
        .iter()
        .copied()
        .min_by(|&p, &q| {
            let dp = euclid(before.cell(p).unwrap().as_slice().unwrap(), &[1.0, 1.0]);
            let dq = euclid(before.cell(q).unwrap().as_slice().unwrap(), &[1.0, 1.0]);
            dp.partial_cmp(&dq).unwrap()
        })
        .unwrap();
    assert_eq!(step.winner, closest);

    let after = trainer.som().unwrap();
    for &cell in after.index().iter() {
        let old = euclid(before.cell(cell).unwrap().as_slice().unwrap(), &[1.0, 1.0]);
        let new = euclid(after.cell(cell).unwrap().as_slice().unwrap(), &[1.0, 1.0]);
        let moved = euclid(
            before.cell(cell).unwrap().as_slice().unwrap(),
            after.cell(cell).unwrap().as_slice().unwrap(),
        );

        let d = toroidal_distance(cell, step.winner, (4, 4)) as f64;
        let h = (-(d / 2.0).powi(2)).exp();

        assert!(new < old, "cell {:?} did not move closer", cell);
        assert!(moved > 0.0);
        assert!((moved - h * 0.6 * old).abs() < 1e-9);
        if cell != step.winner {
            assert!(moved / old < 0.6);
        }
    }
}

#[test]
fn test_replacement_policy() {
    let (data, labels) = create_clusters(15, 4);
    let mut trainer = SomTrainer::new(SomConfig::new(3, 3)).unwrap();

    trainer.fit(&data, &labels, 0).unwrap();
    let mut samples: Vec<usize> = trainer.steps().iter().filter_map(|s| s.sample).collect();
    assert_eq!(samples.len(), data.len());
    samples.sort_unstable();
    assert_eq!(samples, (0..data.len()).collect::<Vec<_>>());

    trainer.reset_epoch();
    trainer.fit(&data, &labels, 10).unwrap();
    assert_eq!(trainer.steps().len(), 10);
    assert!(trainer.steps().iter().all(|s| s.sample.unwrap() < data.len()));
}

#[test]
fn test_schedule_decays_within_run() {
    let (data, labels) = create_clusters(10, 5);
    for decay in [DecayKind::Hill, DecayKind::Linear] {
        let config = SomConfig::new(6, 4).with_decay(decay);
        let mut trainer = SomTrainer::new(config).unwrap();
        trainer.fit(&data, &labels, 50).unwrap();

        let steps = trainer.steps();
        assert_eq!(steps[0].alpha, 0.6);
        assert_eq!(steps[0].sigma, 3.0);
        for pair in steps.windows(2) {
            assert!(pair[1].alpha <= pair[0].alpha);
            assert!(pair[1].sigma <= pair[0].sigma);
        }
        assert!(steps[49].sigma > 0.0);
    }
}

#[test]
fn test_errors_leave_trained_grid_unchanged() {
    let (data, labels) = create_clusters(10, 6);
    let mut trainer = SomTrainer::new(SomConfig::new(4, 4)).unwrap();
    trainer.fit(&data, &labels, 0).unwrap();
    let snapshot = trainer.som().unwrap().clone();

    let three_d = vec![vec![1.0, 2.0, 3.0]];
    assert_eq!(
        trainer.fit(&three_d, &[0u8], 0),
        Err(SomError::DimensionMismatch { expected: 2, found: 3 })
    );
    assert!(matches!(
        trainer.fit(&data, &labels[..3], 0),
        Err(SomError::InvalidInput(_))
    ));
    assert!(matches!(
        trainer.step(&[0.0, 0.0]),
        Err(SomError::ScheduleExhausted { .. })
    ));
    assert!(matches!(
        trainer.step(&[f64::NAN, 0.0]),
        Err(SomError::InvalidInput(_))
    ));

    assert_eq!(trainer.som().unwrap(), &snapshot);
    assert_eq!(trainer.epoch(), 20);
}

#[test]
fn test_second_run_restarts_decay() {
    init_logger();
    let (data, labels) = create_clusters(10, 8);
    let mut trainer = SomTrainer::new(SomConfig::new(6, 4)).unwrap();

    trainer.fit(&data, &labels, 10).unwrap();
    let first: Vec<(f64, f64)> = trainer.steps().iter().map(|s| (s.alpha, s.sigma)).collect();

    trainer.fit(&data, &labels, 10).unwrap();
    let second: Vec<(f64, f64)> = trainer.steps().iter().map(|s| (s.alpha, s.sigma)).collect();

    assert_eq!(trainer.epoch(), 20);
    assert_eq!(trainer.schedule().unwrap().len(), 10);
    assert_eq!(second, first);
    assert_eq!(second[0], (0.6, 3.0));
    assert!((second[9].0 - 0.6 / 17.0).abs() < 1e-12);
    assert_eq!(trainer.steps()[0].epoch, 10);
    assert_eq!(trainer.steps()[0].step, 0);
}

#[test]
fn test_reporting_queries() {
    let (data, labels) = create_clusters(20, 7);
    let mut trainer = SomTrainer::new(SomConfig::new(6, 6)).unwrap();
    trainer.fit(&data, &labels, 300).unwrap();
    let som = trainer.som().unwrap();

    let distances = som.transform(&data).unwrap();
    assert_eq!(distances.dim(), (data.len(), 36));

    let winners = som.winner_neurons(&data).unwrap();
    for (i, w) in winners.iter().enumerate() {
        let row = distances.row(i);
        let best = row.iter().copied().fold(f64::INFINITY, f64::min);
        assert_eq!(row[w.flat_index(6)], best);
    }

    let map = som.distance_map();
    assert_eq!(map.dim(), (6, 6));
    assert!(map.iter().all(|&v| (0.0..=1.0).contains(&v)));
    assert!(map.iter().any(|&v| v == 1.0));

    // Everything within the maximum torus distance is a neighbor
    let all = som.neighbors(&data[0], &data, 6).unwrap();
    assert_eq!(all.len(), data.len());
    let own = som.neighbors(&data[0], &data, 0).unwrap();
    assert!(own.contains(&0));
}

#[test]
fn test_config_from_json() {
    let config: SomConfig =
        serde_json::from_str(r#"{"x": 3, "y": 7, "decay": "linear", "seed": 5}"#).unwrap();

    assert_eq!(config.x, 3);
    assert_eq!(config.y, 7);
    assert_eq!(config.decay, DecayKind::Linear);
    assert_eq!(config.seed, 5);
    assert_eq!(config.alpha_start, 0.6);
    assert_eq!(config.sigma_start, None);
    assert!((config.initial_sigma() - 3.5).abs() < 1e-12);
}

#[test]
fn test_grid_coord_is_row_major() {
    let coord = GridCoord::new(2, 1);
    assert_eq!(coord.flat_index(5), 11);
    assert_eq!(GridCoord::from((2, 1)), coord);
}
