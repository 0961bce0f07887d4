//! End-to-end scenarios through the public API.

use std::cell::RefCell;
use std::rc::Rc;

use sundial::{EventId, EventStatus, SimError, Simulation, Store, VirtualTime};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn deposit(sim: &mut Simulation<u64>, store: &Store<u64>, at: u64, item: u64, blocking: bool) -> EventId {
    let store = store.clone();
    sim.schedule(
        VirtualTime::new(at),
        move |ctx| async move {
            if blocking {
                ctx.put_blocking(&store, item).await;
            } else {
                ctx.put(&store, item).await;
            }
            Ok(item)
        },
        None,
    )
    .unwrap()
}

fn request(sim: &mut Simulation<u64>, store: &Store<u64>, at: u64) -> EventId {
    let store = store.clone();
    sim.schedule(VirtualTime::new(at), move |ctx| async move { Ok(ctx.get(&store).await) }, None)
        .unwrap()
}

fn finished(sim: &Simulation<u64>, id: EventId) -> Option<VirtualTime> {
    sim.event(id).unwrap().finished_at
}

#[test]
fn blocking_deposit_completes_when_consumed() {
    init_tracing();
    let mut sim = Simulation::new();
    let store = sim.create_store([]);

    let producer = deposit(&mut sim, &store, 30, 1, true);
    let consumer = request(&mut sim, &store, 40);
    sim.run();

    assert_eq!(finished(&sim, producer), Some(VirtualTime::new(40)));
    assert_eq!(finished(&sim, consumer), Some(VirtualTime::new(40)));
}

#[test]
fn non_blocking_deposit_completes_immediately() {
    init_tracing();
    let mut sim = Simulation::new();
    let store = sim.create_store([]);

    let producer = deposit(&mut sim, &store, 50, 1, false);
    let consumer = request(&mut sim, &store, 60);
    sim.run();

    assert_eq!(finished(&sim, producer), Some(VirtualTime::new(50)));
    assert_eq!(finished(&sim, consumer), Some(VirtualTime::new(60)));
}

#[test]
fn surplus_requests_stay_parked() {
    init_tracing();
    let mut sim = Simulation::new();
    let store = sim.create_store([]);

    let first = request(&mut sim, &store, 50);
    request(&mut sim, &store, 55);
    request(&mut sim, &store, 60);
    deposit(&mut sim, &store, 70, 9, false);
    sim.run();

    assert_eq!(sim.event(first).unwrap().item, Some(9));
    assert_eq!(store.get_requests_len(), 2);
    assert_eq!(sim.parked().len(), 2);
}

#[test]
fn surplus_deposits_stay_queued() {
    init_tracing();
    let mut sim = Simulation::new();
    let store = sim.create_store([]);

    deposit(&mut sim, &store, 50, 500, false);
    deposit(&mut sim, &store, 55, 550, false);
    deposit(&mut sim, &store, 60, 600, false);
    let consumer = request(&mut sim, &store, 70);
    sim.run();

    assert_eq!(sim.event(consumer).unwrap().item, Some(500));
    assert_eq!(store.put_requests_len(), 2);
    assert_eq!(store.queued_items(), vec![550, 600]);
}

#[test]
fn dispatch_order_is_time_then_admission() {
    init_tracing();
    let mut sim = Simulation::new();
    let order = Rc::new(RefCell::new(Vec::new()));

    let due = [40, 10, 30, 10, 20, 40, 10];
    let mut events = Vec::new();
    for at in due {
        let order = Rc::clone(&order);
        events.push(sim.create_event(
            VirtualTime::new(at),
            move |ctx| async move {
                order.borrow_mut().push((ctx.now().ticks(), ctx.id()));
                Ok(0)
            },
            None,
        ));
    }
    // Admit in reverse creation order.
    let mut admitted = Vec::new();
    while let Some(event) = events.pop() {
        admitted.push((event.scheduled_at().ticks(), sim.schedule_event(event).unwrap()));
    }
    sim.run();

    let mut expected = admitted.clone();
    // Stable sort keeps admission order among equal times.
    expected.sort_by_key(|(at, _)| *at);
    assert_eq!(*order.borrow(), expected);
}

#[test]
fn causality_violation_is_reported_and_run_continues() {
    init_tracing();
    let mut sim: Simulation<u64> = Simulation::new();
    let outcome = Rc::new(RefCell::new(None));

    let sink = Rc::clone(&outcome);
    let late = sim
        .schedule(
            VirtualTime::new(20),
            move |ctx| async move {
                let past = ctx.create_event(VirtualTime::new(10), |_ctx| async move { Ok(0) }, None);
                *sink.borrow_mut() = Some(ctx.schedule_event(past));
                Ok(1)
            },
            None,
        )
        .unwrap();
    let after = sim.schedule(VirtualTime::new(30), |_ctx| async move { Ok(2) }, None).unwrap();
    sim.run();

    assert!(matches!(
        outcome.borrow_mut().take(),
        Some(Err(SimError::CausalityViolation { .. }))
    ));
    assert_eq!(sim.event(late).unwrap().status, EventStatus::Completed);
    assert_eq!(sim.event(after).unwrap().status, EventStatus::Completed);
    assert_eq!(sim.events().len(), 2);
}

#[test]
fn tellers_serve_customers_in_arrival_order() {
    init_tracing();
    const SERVICE: u64 = 5;

    let mut sim = Simulation::new();
    // Two teller tokens.
    let tellers = sim.create_store([1, 2]);

    let customers: Vec<EventId> = [0, 1, 2, 3]
        .into_iter()
        .map(|arrival| {
            let tellers = tellers.clone();
            sim.schedule(
                VirtualTime::new(arrival),
                move |ctx| async move {
                    let token = ctx.get(&tellers).await;
                    let served_at = ctx.now().ticks();
                    let tellers = tellers.clone();
                    ctx.schedule_after(
                        SERVICE,
                        move |ctx| async move {
                            ctx.put(&tellers, token).await;
                            Ok(token)
                        },
                        None,
                    )?;
                    Ok(served_at)
                },
                None,
            )
            .unwrap()
        })
        .collect();
    let stats = sim.run();

    let served: Vec<u64> = customers
        .iter()
        .map(|id| sim.event(*id).unwrap().item.unwrap())
        .collect();
    assert_eq!(served, vec![0, 1, 5, 6]);
    assert_eq!(sim.current_time(), VirtualTime::new(11));
    assert_eq!(tellers.queued_items(), vec![1, 2]);
    assert!(sim.parked().is_empty());
    assert!(stats.duration.as_secs() < 60);
}

#[test]
fn dropping_a_simulation_with_parked_processes() {
    init_tracing();
    let marker = Rc::new(());
    {
        let mut sim: Simulation<u64> = Simulation::new();
        let store = sim.create_store([]);
        let held = Rc::clone(&marker);
        let s = store.clone();
        sim.schedule(
            VirtualTime::ZERO,
            move |ctx| async move {
                let _held = held;
                Ok(ctx.get(&s).await)
            },
            None,
        )
        .unwrap();
        sim.run();
        assert_eq!(sim.parked().len(), 1);
        assert_eq!(Rc::strong_count(&marker), 2);
    }
    assert_eq!(Rc::strong_count(&marker), 1);
}
