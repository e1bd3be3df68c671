use approx::assert_abs_diff_eq;
use proclab::core::components::downcast_unit;
use proclab::units::{Bioreactor, CoCounterHeatExchanger, WaterTank, STRIP_POINTS};
use proclab::{
    ConcurrencyMode, LabKind, Orchestrator, ProcessUnit, RecordingDisplay, SimulationEngine, UnitId,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn build(kind: LabKind, display: RecordingDisplay) -> Orchestrator<RecordingDisplay> {
    kind.builder(kind.default_config())
        .unwrap()
        .build(display)
        .unwrap()
}

/// Tick until every unit reports steady state; returns the tick count
fn run_to_steady_state(orchestrator: &mut Orchestrator<RecordingDisplay>, limit: u64) -> u64 {
    for n in 1..=limit {
        if orchestrator.tick().unwrap() {
            return n;
        }
    }
    panic!("no steady state within {} ticks", limit);
}

fn output(orchestrator: &Orchestrator<RecordingDisplay>, unit: usize, field: &str) -> f64 {
    orchestrator
        .snapshot()
        .get(&UnitId(unit).output(field))
        .unwrap()
}

/// Tick until steady state is reported again, returning the tick count.
///
/// Every tick that reports steady state must see each field within `tolerance`
/// of its value `window` ticks earlier.
fn tick_until_settled(
    orchestrator: &mut Orchestrator<RecordingDisplay>,
    fields: &[(usize, &str)],
    window: usize,
    tolerance: impl Fn(f64, f64) -> bool,
    limit: usize,
) -> usize {
    let read = |o: &Orchestrator<RecordingDisplay>| -> Vec<f64> {
        fields.iter().map(|&(unit, field)| output(o, unit, field)).collect()
    };
    let mut history = vec![read(&*orchestrator)];
    for n in 1..=limit {
        let converged = orchestrator.tick().unwrap();
        history.push(read(&*orchestrator));
        if converged {
            assert!(n >= window, "steady state reported {} ticks after a change", n);
            for (i, &(unit, field)) in fields.iter().enumerate() {
                let (then, now) = (history[n - window][i], history[n][i]);
                assert!(
                    tolerance(then, now),
                    "unit {} {} still moving at tick {}: {} -> {}",
                    unit,
                    field,
                    n,
                    then,
                    now
                );
            }
            return n;
        }
    }
    panic!("no steady state within {} ticks", limit);
}

fn within_3_decimals(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-3
}

fn exchanger(orchestrator: &Orchestrator<RecordingDisplay>) -> &CoCounterHeatExchanger {
    downcast_unit::<CoCounterHeatExchanger>(orchestrator.unit(UnitId(0)).unwrap()).unwrap()
}

#[test]
fn test_counter_current_exchanger_reaches_balanced_steady_state() {
    let mut lab = build(LabKind::HeatExchanger, RecordingDisplay::new());
    run_to_steady_state(&mut lab, 10_000);

    let hot_out = output(&lab, 0, "hot_outlet");
    let cold_out = output(&lab, 0, "cold_outlet");
    assert!(hot_out > 310.0 && hot_out < 360.0, "hot outlet {}", hot_out);
    assert!(cold_out > 310.0 && cold_out < 360.0, "cold outlet {}", cold_out);

    // kW released by the hot stream vs. taken up by the cold stream
    let q_hot = 0.5 * 4.2 * (360.0 - hot_out);
    let q_cold = 0.75 * 4.2 * (cold_out - 310.0);
    assert!(
        (q_hot - q_cold).abs() / q_hot < 0.05,
        "energy balance off: hot {:.2} kW, cold {:.2} kW",
        q_hot,
        q_cold
    );
}

#[test]
fn test_converged_exchanger_stays_converged() {
    let mut lab = build(LabKind::HeatExchanger, RecordingDisplay::new());
    run_to_steady_state(&mut lab, 10_000);
    // residual drift at 0.1 K may still cross a rounding edge shortly after first convergence
    for _ in 0..3000 {
        lab.tick().unwrap();
    }
    assert!(lab.is_converged());

    let outlets = (output(&lab, 0, "hot_outlet"), output(&lab, 0, "cold_outlet"));
    for n in 0..3000 {
        assert!(lab.tick().unwrap(), "dropped out of steady state {} ticks later", n);
    }
    assert_abs_diff_eq!(output(&lab, 0, "hot_outlet"), outlets.0, epsilon = 0.05);
    assert_abs_diff_eq!(output(&lab, 0, "cold_outlet"), outlets.1, epsilon = 0.05);
}

#[test]
fn test_flow_mode_swaps_cold_boundaries() {
    let mut display = RecordingDisplay::new();
    display.set_parameter(UnitId(0), "Flow Mode", 0.0);
    let mut co = build(LabKind::HeatExchanger, display);
    let mut counter = build(LabKind::HeatExchanger, RecordingDisplay::new());
    for _ in 0..1500 {
        co.tick().unwrap();
        counter.tick().unwrap();
    }

    let n = exchanger(&co).cold_temperatures().len() - 1;
    assert_eq!(exchanger(&co).cold_temperatures()[0], 310.0);
    assert_eq!(exchanger(&counter).cold_temperatures()[n], 310.0);
    assert_eq!(exchanger(&co).hot_temperatures()[0], 360.0);
    assert_eq!(exchanger(&counter).hot_temperatures()[0], 360.0);

    // counter-current transfers more heat for the same area
    assert!(output(&counter, 0, "cold_outlet") > output(&co, 0, "cold_outlet"));
    assert!(output(&counter, 0, "hot_outlet") < output(&co, 0, "hot_outlet"));
}

#[test]
fn test_parallel_field_update_matches_sequential() {
    let config = LabKind::HeatExchanger
        .default_config()
        .with_concurrency(ConcurrencyMode::Rayon)
        .with_thread_pool_size(2);
    let mut parallel = LabKind::HeatExchanger
        .builder(config)
        .unwrap()
        .build(RecordingDisplay::new())
        .unwrap();
    let mut sequential = build(LabKind::HeatExchanger, RecordingDisplay::new());
    for _ in 0..50 {
        parallel.tick().unwrap();
        sequential.tick().unwrap();
    }
    assert_eq!(exchanger(&parallel).hot_temperatures(), exchanger(&sequential).hot_temperatures());
    assert_eq!(exchanger(&parallel).cold_temperatures(), exchanger(&sequential).cold_temperatures());
}

#[test]
fn test_reset_is_idempotent_and_deterministic() {
    let mut lab = build(LabKind::WaterTank, RecordingDisplay::new());
    let levels = |lab: &mut Orchestrator<RecordingDisplay>| -> Vec<f64> {
        (0..50)
            .map(|_| {
                lab.tick().unwrap();
                output(lab, 1, "level")
            })
            .collect()
    };

    let first = levels(&mut lab);
    lab.reset();
    let after_one = lab.snapshot().clone();
    lab.reset();
    let after_two = lab.snapshot().clone();
    for field in [(0, "flow_rate"), (1, "level"), (2, "command")] {
        let port = UnitId(field.0).output(field.1);
        assert_eq!(after_one.get(&port), after_two.get(&port));
    }
    assert_eq!(lab.clock().sim_time(), 0.0);

    let second = levels(&mut lab);
    assert_eq!(first, second);
}

#[test]
fn test_out_of_range_parameters_are_clamped_and_stay_simulatable() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut lab = build(LabKind::HeatExchanger, RecordingDisplay::new());
    let names: Vec<(String, f64, f64)> = exchanger(&lab)
        .parameters()
        .iter()
        .map(|d| (d.name.clone(), d.min, d.max))
        .collect();

    for _ in 0..6 {
        for (name, min, max) in &names {
            let span = max - min;
            let value = rng.gen_range((min - span)..(max + span));
            lab.display_mut().set_parameter(UnitId(0), name, value);
        }
        lab.notify_parameter_changed(UnitId(0)).unwrap();
        assert!(!lab.is_converged());

        for _ in 0..3 {
            lab.tick().unwrap();
        }
        let hx = exchanger(&lab);
        for d in hx.parameters().iter() {
            assert!(d.current >= d.min && d.current <= d.max, "{} = {}", d.name, d.current);
        }
        let (hot, cold) = (&hx.outputs()[0], &hx.outputs()[1]);
        for &t in hx.hot_temperatures() {
            assert!(t.is_finite() && hot.contains(t), "hot temperature {}", t);
        }
        for &t in hx.cold_temperatures() {
            assert!(t.is_finite() && cold.contains(t), "cold temperature {}", t);
        }
    }
}

#[test]
fn test_bioreactor_states_stay_bounded_for_random_parameters() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut lab = build(LabKind::Bioreactor, RecordingDisplay::new());

    for _ in 0..10 {
        let display = lab.display_mut();
        display.set_parameter(UnitId(0), "Feed Flow", rng.gen_range(-0.5..1.5));
        display.set_parameter(UnitId(0), "Feed Substrate", rng.gen_range(-10.0..60.0));
        display.set_parameter(UnitId(1), "Max Growth Rate", rng.gen_range(0.0..1.5));
        display.set_parameter(UnitId(1), "Half Saturation", rng.gen_range(0.0..6.0));
        display.set_parameter(UnitId(1), "Yield", rng.gen_range(0.0..1.5));
        display.set_parameter(UnitId(1), "Volume", rng.gen_range(0.0..12.0));
        lab.notify_parameter_changed(UnitId(0)).unwrap();
        lab.notify_parameter_changed(UnitId(1)).unwrap();

        for _ in 0..20 {
            lab.tick().unwrap();
        }
        let declared = lab.unit(UnitId(1)).unwrap().outputs();
        let biomass = output(&lab, 1, "biomass");
        let substrate = output(&lab, 1, "substrate");
        assert!(declared[0].contains(biomass), "biomass {}", biomass);
        assert!(declared[1].contains(substrate), "substrate {}", substrate);
    }
}

#[test]
fn test_water_tank_settles_and_resumes_after_setpoint_change() {
    let mut lab = build(LabKind::WaterTank, RecordingDisplay::new());
    run_to_steady_state(&mut lab, 5_000);
    assert_abs_diff_eq!(output(&lab, 1, "level"), 1.0, epsilon = 0.01);
    assert_abs_diff_eq!(output(&lab, 2, "command"), 1.0 / 3.0, epsilon = 0.01);
    assert!(lab.is_converged());

    lab.display_mut().set_parameter(UnitId(2), "Setpoint", 1.5);
    lab.notify_parameter_changed(UnitId(2)).unwrap();
    assert!(!lab.is_converged());

    let ticks = tick_until_settled(&mut lab, &[(1, "level"), (2, "command")], 10, within_3_decimals, 5_000);
    assert!(ticks > 10);
    assert_abs_diff_eq!(output(&lab, 1, "level"), 1.5, epsilon = 0.01);
    let tank = downcast_unit::<WaterTank>(lab.unit(UnitId(1)).unwrap()).unwrap();
    assert_eq!(tank.level(), output(&lab, 1, "level"));
}

#[test]
fn test_feed_change_keeps_water_tank_active_until_level_settles() {
    let mut lab = build(LabKind::WaterTank, RecordingDisplay::new());
    run_to_steady_state(&mut lab, 5_000);
    for _ in 0..300 {
        lab.tick().unwrap();
    }
    assert!(lab.is_converged());

    lab.display_mut().set_parameter(UnitId(0), "Flow Rate", 1.0);
    lab.notify_parameter_changed(UnitId(0)).unwrap();
    assert!(!lab.tick().unwrap(), "feed change must be seen on the next tick");
    let mut lowest = output(&lab, 1, "level");
    for _ in 0..10 {
        assert!(!lab.tick().unwrap());
        lowest = lowest.min(output(&lab, 1, "level"));
    }
    assert!(lowest < 0.99, "level barely moved: {}", lowest);

    tick_until_settled(&mut lab, &[(1, "level"), (2, "command")], 10, within_3_decimals, 5_000);
    assert_abs_diff_eq!(output(&lab, 1, "level"), 1.0, epsilon = 0.01);
    assert_abs_diff_eq!(output(&lab, 2, "command"), 2.0 / 3.0, epsilon = 0.01);
}

#[test]
fn test_throttled_engine_resumes_full_rate_after_feed_change() {
    let lab = build(LabKind::WaterTank, RecordingDisplay::new());
    let mut engine = SimulationEngine::new(lab, None, 20);
    assert!(engine.run_until_converged(5_000).unwrap().is_some());
    for _ in 0..300 {
        engine.orchestrator_mut().tick().unwrap();
    }
    assert!(engine.orchestrator().is_converged());

    let skipped = (0..40).filter(|_| !engine.step().unwrap()).count();
    assert!(skipped >= 36, "a converged lab ticks once every 20 frames, skipped {}", skipped);

    let orchestrator = engine.orchestrator_mut();
    orchestrator.display_mut().set_parameter(UnitId(0), "Flow Rate", 1.0);
    orchestrator.notify_parameter_changed(UnitId(0)).unwrap();

    let mut frames = 0;
    while !engine.orchestrator().is_converged() {
        assert!(engine.step().unwrap(), "frame {} skipped while active", engine.frame());
        frames += 1;
        assert!(frames < 5_000, "no steady state after the feed change");
    }
    assert!(frames > 10, "steady state after only {} frames", frames);
    assert_abs_diff_eq!(output(engine.orchestrator(), 1, "level"), 1.0, epsilon = 0.01);
}

#[test]
fn test_bioreactor_feed_change_waits_for_new_steady_state() {
    let mut lab = build(LabKind::Bioreactor, RecordingDisplay::new());
    run_to_steady_state(&mut lab, 10_000);

    lab.display_mut().set_parameter(UnitId(0), "Feed Flow", 0.3);
    lab.notify_parameter_changed(UnitId(0)).unwrap();
    assert!(!lab.tick().unwrap());

    // 4 significant figures over one 1/mu_max window (2 h = 20 display steps)
    let four_figures = |a: f64, b: f64| (a - b).abs() <= 1e-3 * a.abs().max(b.abs());
    tick_until_settled(&mut lab, &[(1, "biomass"), (1, "substrate")], 20, four_figures, 20_000);

    let reactor = downcast_unit::<Bioreactor>(lab.unit(UnitId(1)).unwrap()).unwrap();
    let s_star = 0.2 * 0.3 / (0.5 - 0.3);
    assert_abs_diff_eq!(reactor.substrate(), s_star, epsilon = 1e-3);
    assert_abs_diff_eq!(reactor.biomass(), 0.5 * (20.0 - s_star), epsilon = 1e-2);
}

#[test]
fn test_bioreactor_reaches_monod_steady_state() {
    let mut lab = build(LabKind::Bioreactor, RecordingDisplay::new());
    run_to_steady_state(&mut lab, 10_000);

    let reactor = downcast_unit::<Bioreactor>(lab.unit(UnitId(1)).unwrap()).unwrap();
    let s_star = 0.2 * 0.2 / (0.5 - 0.2);
    assert_abs_diff_eq!(reactor.substrate(), s_star, epsilon = 1e-3);
    assert_abs_diff_eq!(reactor.biomass(), 0.5 * (20.0 - s_star), epsilon = 1e-2);
}

#[test]
fn test_strip_chart_window_tracks_state() {
    let mut lab = build(LabKind::WaterTank, RecordingDisplay::new());
    for _ in 0..(STRIP_POINTS + 20) {
        lab.tick().unwrap();
    }

    let series = lab.display().latest(UnitId(1), "level").unwrap();
    let strip = series.as_strip().unwrap();
    assert_eq!(strip.points.len(), STRIP_POINTS + 1);

    let display_dt = lab.clock().display_time_step();
    for (p, window) in strip.points.windows(2).enumerate() {
        assert!(window[1].0 > window[0].0, "time axis must increase");
        assert_abs_diff_eq!(window[0].0, p as f64 * display_dt, epsilon = 1e-9);
    }
    let newest = strip.points[STRIP_POINTS].1;
    assert_eq!(newest, output(&lab, 1, "level"));
}

#[test]
fn test_every_lab_publishes_on_reset() {
    for kind in LabKind::ALL {
        let lab = build(kind, RecordingDisplay::new());
        assert!(lab.display().publish_count() > 0, "{} published nothing", kind);
        assert!(!lab.is_converged());
    }
}
