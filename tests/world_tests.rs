//! Whole-simulation behaviour: spawning, signals, queues and statistics

use std::collections::HashMap;

use traffic_grid::simulation::{
    queue_chains, Car, CarId, GridPos, Heading, IntersectionId, Phase, RollingWindow, SimConfig,
    Simulation,
};

fn config(seed: u64, spawn_rate: u32) -> SimConfig {
    SimConfig {
        spawn_rate,
        ..SimConfig::with_seed(seed)
    }
}

/// A world that never spawns on its own
fn quiet_world(seed: u64) -> Simulation {
    Simulation::new(config(seed, u32::MAX))
}

#[test]
fn test_population_grows_to_cap() {
    let mut sim = Simulation::new(SimConfig {
        max_cars: 3,
        ..config(1, 1)
    });

    for tick in 1..=10usize {
        sim.step();
        assert_eq!(sim.cars().len(), tick.min(3), "tick {}", tick);
        assert_eq!(sim.total_cars_spawned(), tick.min(3) as u64);
    }
}

#[test]
fn test_population_cap_is_never_exceeded() {
    let mut sim = Simulation::new(config(2, 1));
    let mut max_seen = 0;

    for _ in 0..1500 {
        let before = sim.cars().len();
        let spawned_before = sim.total_cars_spawned();
        sim.step();

        assert!(sim.cars().len() <= 20);
        if before >= 20 {
            assert_eq!(sim.total_cars_spawned(), spawned_before);
        }
        max_seen = max_seen.max(sim.cars().len());
    }
    assert!(max_seen >= 10, "busy grid only reached {} cars", max_seen);
}

#[test]
fn test_spawn_interval() {
    let mut sim = Simulation::new(config(3, 5));
    for _ in 0..4 {
        sim.step();
    }
    assert_eq!(sim.total_cars_spawned(), 0);
    sim.step();
    assert_eq!(sim.total_cars_spawned(), 1);
}

#[test]
fn test_no_car_enters_on_red() {
    let mut sim = Simulation::new(config(4, 2));

    for _ in 0..2000 {
        let previous: HashMap<CarId, (GridPos, Heading)> = sim
            .cars()
            .iter()
            .map(|car| (car.id, (car.position, car.heading)))
            .collect();
        sim.step();

        for car in sim.cars() {
            let Some(&(from, heading)) = previous.get(&car.id) else {
                continue;
            };
            if sim.map.is_intersection(from) || !sim.map.is_intersection(car.position) {
                continue;
            }
            let light_cell = from.step(heading.right());
            let light = sim
                .lights()
                .find(|light| light.position == light_cell)
                .expect("every approach has a light");
            assert!(
                light.is_green(),
                "car {:?} entered from {:?} on red at tick {}",
                car.id,
                from,
                sim.tick_count()
            );
        }
    }
}

#[test]
fn test_wait_accounting() {
    let mut sim = Simulation::new(config(5, 2));
    let mut previous_total = 0;
    let mut previous_exited = 0;

    for _ in 0..1500 {
        sim.step();

        // Every held car adds exactly one tick; exiting cars moved
        let total = sim.total_wait_ticks();
        assert_eq!(total - previous_total, sim.current_cars_waiting() as u64);
        assert!(sim.cars_exited() >= previous_exited);

        for car in sim.cars() {
            assert_eq!(car.waiting, car.current_wait_ticks > 0);
            assert!(car.current_wait_ticks <= car.total_wait_ticks);
        }

        let live: u64 = sim.cars().iter().map(|car| car.total_wait_ticks).sum();
        assert_eq!(sim.stats().removed_wait_ticks + live, total);

        previous_total = total;
        previous_exited = sim.cars_exited();
    }

    assert!(sim.cars_exited() > 0);
    assert_eq!(
        sim.cars_exited() + sim.cars().len() as u64,
        sim.total_cars_spawned()
    );
}

#[test]
fn test_queue_chain_in_front_of_red_light() {
    for reversed in [false, true] {
        let mut sim = quiet_world(6);
        let mut cells = vec![
            GridPos::new(5, 9),
            GridPos::new(5, 8),
            GridPos::new(5, 7),
        ];
        if reversed {
            cells.reverse();
        }
        for cell in cells {
            sim.add_car(cell, Heading::South);
        }
        sim.set_intersection_light_phase(IntersectionId(0), Phase::HorizontalGreen)
            .unwrap();

        sim.step();

        assert_eq!(sim.current_cars_waiting(), 3);
        assert_eq!(sim.current_queue_lengths(), vec![3]);
        assert_eq!(sim.max_queue_length(), 3);
        assert_eq!(
            sim.get_intersection_queues(IntersectionId(0)).unwrap(),
            [0, 3, 0, 0]
        );
        assert_eq!(
            sim.get_intersection_queues(IntersectionId(1)).unwrap(),
            [0, 0, 0, 0]
        );
    }
}

#[test]
fn test_queue_discharges_with_reaction_lag() {
    let mut sim = quiet_world(7);
    let front = sim.add_car(GridPos::new(5, 9), Heading::South);
    let behind = sim.add_car(GridPos::new(5, 8), Heading::South);
    let id = IntersectionId(0);

    sim.set_intersection_light_phase(id, Phase::HorizontalGreen)
        .unwrap();
    sim.step();
    sim.set_intersection_light_phase(id, Phase::VerticalGreen)
        .unwrap();

    for _ in 0..2 {
        sim.step();
        assert_eq!(sim.car(front).unwrap().position, GridPos::new(5, 9));
        assert_eq!(sim.car(behind).unwrap().position, GridPos::new(5, 8));
    }

    sim.step();
    assert_eq!(sim.car(front).unwrap().position, GridPos::new(5, 10));
    // The follower reacts to the gap only now
    assert_eq!(sim.car(behind).unwrap().position, GridPos::new(5, 8));

    sim.step();
    sim.step();
    assert_eq!(sim.car(behind).unwrap().position, GridPos::new(5, 9));
}

#[test]
fn test_manual_phase_persists() {
    let mut sim = quiet_world(8);
    sim.set_intersection_light_phase(IntersectionId(0), Phase::HorizontalGreen)
        .unwrap();

    for tick in 1..=100 {
        sim.step();
        let manual = &sim.intersections()[0].lights;
        assert!(manual.horizontal.east_entry.is_green());
        assert!(manual.vertical.south_entry.is_red());

        // The other intersection keeps cycling
        let automatic = &sim.intersections()[1].lights;
        assert_eq!(
            automatic.vertical.south_entry.is_green(),
            (tick / 30) % 2 == 0,
            "tick {}",
            tick
        );
    }
}

#[test]
fn test_unknown_intersection_is_an_error() {
    let mut sim = quiet_world(9);
    let missing = IntersectionId(7);

    let err = sim.get_intersection_queues(missing).unwrap_err();
    assert!(err.to_string().contains("not found"));
    assert!(sim
        .set_intersection_light_phase(missing, Phase::VerticalGreen)
        .is_err());
}

#[test]
fn test_get_state() {
    let mut sim = Simulation::new(config(10, 1));
    for _ in 0..5 {
        sim.step();
    }

    let state = sim.get_state();
    assert_eq!(state.tick, 5);
    assert_eq!(state.cars.len(), sim.cars().len());
    assert_eq!(state.lights.len(), 8);
    assert_eq!(state.map.width(), 20);
    assert_eq!(state.total_cars_spawned, 5);
    assert_eq!(state.total_wait_ticks, sim.total_wait_ticks());
    assert!(state.average_wait_time_seconds >= 0.0);
    for (snapshot, car) in state.cars.iter().zip(sim.cars()) {
        assert_eq!(snapshot.id, car.id);
        assert_eq!(snapshot.position, car.position);
    }
}

#[test]
fn test_same_seed_same_run() {
    let mut first = Simulation::new(config(11, 2));
    let mut second = Simulation::new(config(11, 2));
    assert_eq!(first.render_ascii(), second.render_ascii());

    for _ in 0..500 {
        first.step();
        second.step();
        assert_eq!(first.get_state().cars, second.get_state().cars);
    }
    assert_eq!(first.render_ascii(), second.render_ascii());
    assert_eq!(first.max_queue_length(), second.max_queue_length());
}

#[test]
fn test_render_ascii_shape() {
    let mut sim = quiet_world(12);
    sim.add_car(GridPos::new(0, 11), Heading::East);

    let text = sim.render_ascii();
    let rows: Vec<&str> = text.lines().collect();
    assert_eq!(rows.len(), 20);
    assert!(rows.iter().all(|row| row.chars().count() == 20));
    assert_eq!(rows[11].chars().next(), Some('>'));
    assert_eq!(rows[10].chars().nth(5), Some('+'));
    assert_eq!(rows[9].chars().nth(4), Some('G'));
}

#[test]
fn test_rolling_window() {
    let mut window = RollingWindow::new(3);
    assert!(window.is_empty());
    assert_eq!(window.average(), 0.0);

    for sample in [1.0, 2.0, 3.0, 4.0] {
        window.push(sample);
    }
    assert_eq!(window.len(), 3);
    assert_eq!(window.average(), 3.0);

    assert_eq!(RollingWindow::new(0).capacity(), 1);
}

fn waiting_car(id: usize, x: i32, y: i32, heading: Heading) -> Car {
    let mut car = Car::new(CarId(id), GridPos::new(x, y), heading);
    car.waiting = true;
    car.current_wait_ticks = 1;
    car
}

#[test]
fn test_queue_chains() {
    let mut moving = Car::new(CarId(9), GridPos::new(4, 11), Heading::East);
    moving.waiting = false;

    let cars = vec![
        waiting_car(0, 2, 11, Heading::East),
        moving,
        waiting_car(1, 3, 11, Heading::East),
        waiting_car(2, 5, 3, Heading::South),
        // Adjacent but facing the other way
        waiting_car(3, 5, 4, Heading::North),
    ];

    let mut chains = queue_chains(&cars);
    chains.sort_unstable();
    assert_eq!(chains, vec![1, 1, 2]);

    assert!(queue_chains(&[]).is_empty());
}
