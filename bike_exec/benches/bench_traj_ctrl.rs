//! # Trajectory Control Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use bike_lib::loc::Pose;
use bike_lib::traj_ctrl::{
    tracker, BikeParams, FilterCoeffs, HeadingRateFilter, HeadingRateFilterState, InputData,
    LocalTrajectory, Params, TrajCtrl, TrajParams, Waypoint,
};
use util::module::State;

fn traj_ctrl_benchmark(c: &mut Criterion) {
    // ---- Build a window on a left hand arc ----

    let radius_m = 10.0;
    let spacing_m = 0.5;
    let points: Vec<Waypoint> = (0..20)
        .map(|i| {
            let theta = i as f64 * spacing_m / radius_m;
            Waypoint {
                x_m: radius_m * theta.sin(),
                y_m: radius_m * (1.0 - theta.cos()),
                psi_rad: theta,
            }
        })
        .collect();
    let window = LocalTrajectory::from_waypoints(points.iter()).unwrap();

    let params = Params {
        bike: BikeParams {
            g: 9.81,
            lr_m: 0.4,
            lf_m: 0.7,
            lambda_rad: 1.2217,
        },
        traj: TrajParams {
            k1: 0.5,
            k2: 1.0,
            e1_max_m: 0.5,
        },
        filter: FilterCoeffs {
            ad: 0.8,
            bd: 0.2,
            cd: 0.39,
            dd: 0.0,
        },
    };

    let pose = Pose::new(2.6, 0.45, 0.2);

    // ---- Benchmark the tracker alone ----

    let filter = HeadingRateFilter::from(&params.filter);
    let mut state = HeadingRateFilterState::default();

    c.bench_function("tracker::compute", |b| {
        b.iter(|| {
            tracker::compute(
                black_box(&window),
                black_box(&pose),
                black_box(3.0),
                &params.traj,
                &filter,
                &mut state,
            )
        })
    });

    // ---- Benchmark a full module cycle ----

    let mut traj_ctrl = TrajCtrl::new(params).unwrap();
    let input = InputData {
        pose,
        speed_ms: 3.0,
        window,
    };

    c.bench_function("TrajCtrl::proc", |b| {
        b.iter(|| traj_ctrl.proc(black_box(&input)))
    });
}

criterion_group!(benches, traj_ctrl_benchmark);
criterion_main!(benches);
