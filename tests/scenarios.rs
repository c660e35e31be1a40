//! End-to-end scenario and property tests for the solver.

use exterior_ballistics::prelude::*;
use exterior_ballistics::Error;

/// 168 gr .308 over the G1 curve, 2600 ft/s, 2 in sight height, standard
/// sea-level air, no wind.
fn g1_baseline() -> Shot {
    let projectile = Projectile::new(
        Unit::Grain.new(168.0),
        Unit::Inch.new(0.308),
        0.243,
        DragCurve::standard(StandardCurve::G1),
    );
    let ammo = Ammo::new(projectile, Unit::Fps.new(2600.0));
    let weapon = Weapon::new(Unit::Inch.new(2.0), Unit::Inch.new(11.25));
    Shot::new(weapon, ammo, Atmosphere::sea_level())
}

/// 175 gr .308 over the G7 curve, 2700 ft/s, 10 mph wind from 3 o'clock.
fn g7_long_range() -> Shot {
    let projectile = Projectile::new(
        Unit::Grain.new(175.0),
        Unit::Inch.new(0.308),
        0.377,
        DragCurve::standard(StandardCurve::G7),
    );
    let ammo = Ammo::new(projectile, Unit::Fps.new(2700.0));
    let weapon = Weapon::new(Unit::Inch.new(2.0), Unit::Inch.new(11.25));
    let mut shot = Shot::new(weapon, ammo, Atmosphere::sea_level());
    shot.winds = vec![WindSegment::unbounded(
        Unit::Mph.new(10.0),
        Unit::Degree.new(90.0),
    )];
    shot
}

fn rk4() -> Engine {
    Engine::new(Method::RungeKutta4, Config::default())
}

fn zeroed(engine: &Engine, mut shot: Shot, distance: Quantity) -> Shot {
    shot.weapon.zero_elevation = engine.zero_elevation(&shot, distance).unwrap();
    shot
}

#[test]
fn s1_g1_baseline() {
    let engine = rk4();
    let shot = zeroed(&engine, g1_baseline(), Unit::Yard.new(100.0));
    let traj = engine
        .fire(&shot, Unit::Yard.new(520.0), Unit::Yard.new(20.0))
        .unwrap();

    let at_500 = traj
        .sample_at_range(Unit::Yard.new(500.0))
        .unwrap()
        .unwrap();
    let drop_in = at_500.height.get_in(Unit::Inch).unwrap();
    assert!(
        (-150.0..=-80.0).contains(&drop_in),
        "500 yd drop out of band: {drop_in} in"
    );
    assert!(
        (0.75..=1.00).contains(&at_500.time),
        "500 yd time of flight out of band: {} s",
        at_500.time
    );
    // Near the zero the trajectory sits on the sight line.
    let at_100 = traj
        .sample_at_range(Unit::Yard.new(100.0))
        .unwrap()
        .unwrap();
    assert!(at_100.height.get_in(Unit::Inch).unwrap().abs() < 0.05);
}

#[test]
fn s2_g7_long_range() {
    let engine = rk4();
    let shot = zeroed(&engine, g7_long_range(), Unit::Yard.new(200.0));
    let traj = engine
        .fire_extra(&shot, Unit::Yard.new(1900.0), Unit::Yard.new(50.0))
        .unwrap();

    let at_1000 = traj
        .sample_at_range(Unit::Yard.new(1000.0))
        .unwrap()
        .unwrap();
    let drop_in = at_1000.height.get_in(Unit::Inch).unwrap();
    assert!(
        (-380.0..=-250.0).contains(&drop_in),
        "1000 yd drop out of band: {drop_in} in"
    );
    // +z is the shooter's right, so a wind from 3 o'clock drifts the
    // bullet downwind to the left: windage comes out negative.
    let windage_in = at_1000.windage.get_in(Unit::Inch).unwrap();
    assert!(
        (-85.0..=-40.0).contains(&windage_in),
        "1000 yd windage out of band: {windage_in} in"
    );
    // Still comfortably supersonic at 1000 yd; the transonic crossing is
    // flagged further out.
    assert!(at_1000.mach > 1.2);
    let mach = traj
        .first_flag(TrajFlag::MACH)
        .expect("transonic crossing flagged");
    let mach_yd = mach.distance.get_in(Unit::Yard).unwrap();
    assert!(
        (1150.0..=1900.0).contains(&mach_yd),
        "Mach crossing out of band: {mach_yd} yd"
    );
    assert!((mach.mach - 1.0).abs() < 5e-3);
}

#[test]
fn s3_euler_and_rk4_agree() {
    let euler = Engine::new(Method::Euler, Config::default());
    let rk4 = rk4();
    let shot = zeroed(&rk4, g1_baseline(), Unit::Yard.new(100.0));

    let range = Unit::Yard.new(520.0);
    let step = Unit::Yard.new(100.0);
    let a = euler.fire(&shot, range, step).unwrap();
    let b = rk4.fire(&shot, range, step).unwrap();
    for multiple in 1..=5 {
        let at = Unit::Yard.new(100.0 * multiple as f64);
        let sa = a.sample_at_range(at).unwrap().unwrap();
        let sb = b.sample_at_range(at).unwrap().unwrap();
        let ha = sa.height.get_in(Unit::Inch).unwrap();
        let hb = sb.height.get_in(Unit::Inch).unwrap();
        assert!(
            (ha - hb).abs() < 0.4,
            "drop disagreement at {multiple}00 yd: {ha} vs {hb} in"
        );
        assert!(
            (sa.time - sb.time).abs() < 2e-3,
            "time disagreement at {multiple}00 yd: {} vs {} s",
            sa.time,
            sb.time
        );
    }
}

#[test]
fn s4_zero_convergence_and_refire() {
    let engine = rk4();
    let shot = zeroed(&engine, g1_baseline(), Unit::Yard.new(300.0));
    let traj = engine
        .fire(&shot, Unit::Yard.new(310.0), Unit::Yard.new(300.0))
        .unwrap();
    let at_zero = traj
        .sample_at_range(Unit::Yard.new(300.0))
        .unwrap()
        .unwrap();
    let residual_ft = at_zero.height.get_in(Unit::Foot).unwrap().abs();
    assert!(
        residual_ft <= engine.config().zero_finding_accuracy_ft,
        "zero residual too large: {residual_ft} ft"
    );
}

#[test]
fn s5_danger_space() {
    let engine = rk4();
    let shot = zeroed(&engine, g1_baseline(), Unit::Yard.new(400.0));
    let traj = engine
        .fire(&shot, Unit::Yard.new(600.0), Unit::Yard.new(5.0))
        .unwrap();
    let ds = traj
        .danger_space(Unit::Yard.new(400.0), Unit::Inch.new(18.0))
        .unwrap();

    let begin_yd = ds.begin.get_in(Unit::Yard).unwrap();
    let end_yd = ds.end.get_in(Unit::Yard).unwrap();
    assert!(begin_yd < 400.0 && 400.0 < end_yd, "{begin_yd}..{end_yd}");
    assert!(ds.length().get_in(Unit::Yard).unwrap() > 0.0);
    // Zeroed at the reference range, the interval endpoints sit on the
    // target's edges either side of the sight line.
    let top = traj.sample_at_range(ds.begin).unwrap().unwrap();
    let bottom = traj.sample_at_range(ds.end).unwrap().unwrap();
    assert!((top.height.get_in(Unit::Inch).unwrap() - 9.0).abs() < 0.1);
    assert!((bottom.height.get_in(Unit::Inch).unwrap() + 9.0).abs() < 0.1);
}

#[test]
fn s6_cancellation_after_ten_samples() {
    let engine = rk4();
    let shot = g1_baseline();
    let mut emitted = 0usize;
    let result = engine.fire_with(
        &shot,
        Unit::Yard.new(500.0),
        Unit::Yard.new(10.0),
        TrajFlag::RANGE | TrajFlag::MAX,
        || {
            emitted += 1;
            emitted < 10
        },
    );
    match result {
        Err(Error::Cancelled { trajectory }) => {
            assert_eq!(trajectory.samples().len(), 10);
        }
        other => panic!("expected Cancelled, got {other:?}"),
    }
}

#[test]
fn time_and_range_increase_monotonically() {
    let engine = rk4();
    let shot = zeroed(&engine, g1_baseline(), Unit::Yard.new(100.0));
    let traj = engine
        .fire_extra(&shot, Unit::Yard.new(600.0), Unit::Yard.new(25.0))
        .unwrap();
    for pair in traj.samples().windows(2) {
        assert!(pair[1].time > pair[0].time);
        assert!(pair[1].distance.raw() >= pair[0].distance.raw());
    }
}

#[test]
fn muzzle_energy_is_half_m_v_squared() {
    let engine = rk4();
    let shot = g1_baseline();
    let traj = engine
        .fire(&shot, Unit::Yard.new(100.0), Unit::Yard.new(50.0))
        .unwrap();
    let muzzle = &traj.samples()[0];
    let mass_slugs = shot.ammo.projectile.weight.get_in(Unit::Pound).unwrap() / 32.17405;
    let expected_ftlb = 0.5 * mass_slugs * 2600.0 * 2600.0;
    let actual = muzzle.energy.get_in(Unit::FootPound).unwrap();
    assert!(
        ((actual - expected_ftlb) / expected_ftlb).abs() < 1e-6,
        "muzzle energy {actual} vs {expected_ftlb} ft·lb"
    );
}

#[test]
fn no_wind_no_coriolis_means_exactly_zero_windage() {
    let engine = rk4();
    let shot = zeroed(&engine, g1_baseline(), Unit::Yard.new(100.0));
    let traj = engine
        .fire(&shot, Unit::Yard.new(500.0), Unit::Yard.new(50.0))
        .unwrap();
    for s in traj.samples() {
        assert_eq!(s.windage.get_in(Unit::Inch).unwrap(), 0.0);
    }
}

#[test]
fn coriolis_deflects_an_eastward_shot() {
    let engine = rk4();
    let mut shot = zeroed(&engine, g1_baseline(), Unit::Yard.new(100.0));
    shot.latitude = Some(Unit::Degree.new(45.0));
    shot.azimuth = Unit::Degree.new(90.0);
    let traj = engine
        .fire(&shot, Unit::Yard.new(1000.0), Unit::Yard.new(100.0))
        .unwrap();
    let far = traj.samples().last().unwrap();
    let windage = far.windage.get_in(Unit::Inch).unwrap();
    // Northern hemisphere: horizontal deflection to the right, small but
    // nonzero.
    assert!(windage > 0.0 && windage < 12.0, "Coriolis windage {windage} in");
}

#[test]
fn zero_gravity_keeps_the_velocity_direction() {
    let mut config = Config::default();
    config.gravity_fps2 = 0.0;
    let engine = Engine::new(Method::RungeKutta4, config);
    let mut shot = g1_baseline();
    shot.relative_angle = Unit::MRad.new(10.0);
    let traj = engine
        .fire(&shot, Unit::Yard.new(500.0), Unit::Yard.new(100.0))
        .unwrap();
    // Drag is antiparallel to velocity, so with gravity off the flight path
    // is a straight line through the muzzle.
    let muzzle = &traj.samples()[0];
    let slope = muzzle.velocity.y / muzzle.velocity.x;
    let y0_in = muzzle.height.get_in(Unit::Inch).unwrap();
    for s in traj.samples() {
        let x_in = s.distance.get_in(Unit::Inch).unwrap();
        let expected = y0_in + slope * x_in;
        let actual = s.height.get_in(Unit::Inch).unwrap();
        assert!(
            (actual - expected).abs() < 1e-9,
            "at {x_in} in: {actual} vs {expected}"
        );
    }
}

#[test]
fn inclined_zero_holds_on_the_slanted_sight_line() {
    let engine = rk4();
    let mut shot = g1_baseline();
    shot.look_angle = Unit::Degree.new(30.0);
    let distance = Unit::Yard.new(400.0);
    shot.weapon.zero_elevation = engine.zero_elevation(&shot, distance).unwrap();

    let zero_x = Unit::Yard.new(400.0 * 30f64.to_radians().cos());
    let traj = engine
        .fire(&shot, Unit::Yard.new(410.0), Unit::Yard.new(5.0))
        .unwrap();
    let at_zero = traj.sample_at_range(zero_x).unwrap().unwrap();
    assert!(
        at_zero.height.get_in(Unit::Inch).unwrap().abs() < 0.01,
        "height on the slope: {}",
        at_zero.height
    );
    // Slant distance at the zero matches the dialed distance.
    let slant_yd = at_zero.slant_distance.get_in(Unit::Yard).unwrap();
    assert!((slant_yd - 400.0).abs() < 1.0, "slant {slant_yd} yd");
}

#[test]
fn registry_round_trip_with_all_engines() {
    let shot = g1_baseline();
    for name in exterior_ballistics::registry::names() {
        let engine = exterior_ballistics::registry::create(name, Config::default()).unwrap();
        let traj = engine
            .fire(&shot, Unit::Yard.new(200.0), Unit::Yard.new(100.0))
            .unwrap();
        assert_eq!(traj.samples().len(), 3, "{name}");
    }
    assert!(matches!(
        exterior_ballistics::registry::create("warp_engine", Config::default()),
        Err(Error::UnknownEngine { .. })
    ));
}

#[test]
fn altitude_thins_the_air_and_flattens_the_arc() {
    let engine = rk4();
    let sea = zeroed(&engine, g1_baseline(), Unit::Yard.new(100.0));

    let mut high = g1_baseline();
    high.atmo = Atmosphere::icao(Unit::Foot.new(8000.0)).unwrap();
    let high = zeroed(&engine, high, Unit::Yard.new(100.0));

    let at = Unit::Yard.new(500.0);
    let range = Unit::Yard.new(520.0);
    let step = Unit::Yard.new(20.0);
    let drop_sea = engine
        .fire(&sea, range, step)
        .unwrap()
        .sample_at_range(at)
        .unwrap()
        .unwrap()
        .height
        .get_in(Unit::Inch)
        .unwrap();
    let drop_high = engine
        .fire(&high, range, step)
        .unwrap()
        .sample_at_range(at)
        .unwrap()
        .unwrap()
        .height
        .get_in(Unit::Inch)
        .unwrap();
    assert!(
        drop_high > drop_sea + 5.0,
        "thin air should flatten the arc: {drop_high} vs {drop_sea} in"
    );
}
