use crate::error::{ConfigError, ScenarioError};
use crate::net::NetWorld;
use crate::proto::congestion::TcpVariant;
use crate::queue::QueueLimit;
use crate::scenario::Scenario;
use crate::sim::{SimTime, Simulator};
use crate::topo::bottleneck::BottleneckOpts;
use crate::trace::{TraceEvent, TraceSource};

/// One sender through the 800Kbps/5ms bottleneck with a 10-packet queue,
/// small initial ssthresh so avoidance is reached before the first loss.
fn single_flow(variant: TcpVariant) -> Scenario {
    let mut s = Scenario {
        topology: BottleneckOpts {
            senders: 1,
            ..BottleneckOpts::default()
        },
        data_bytes: 0,
        app_start: SimTime::ZERO,
        app_stop: SimTime::from_millis(4_900),
        sim_stop: SimTime::from_secs(5),
        ..Scenario::default()
    };
    s.tcp.variant = variant;
    s.tcp.init_ssthresh_bytes = 4 * s.tcp.mss as u64;
    s
}

struct Outcome {
    /// cwnd values, in emission order
    cwnd: Vec<u64>,
    /// index into `cwnd` of the first decrease
    first_drop_in_cwnd: usize,
    /// a Drop record precedes the first decreasing cwnd record
    drop_before_decrease: bool,
    world: NetWorld,
}

fn run(variant: TcpVariant) -> Outcome {
    let scenario = single_flow(variant);
    let mut sim = Simulator::new();
    let mut world = NetWorld::default();
    let installed = scenario.install(&mut sim, &mut world).expect("install");
    let conn_id = installed.conn_ids[0];
    world.net.tracer.subscribe(TraceSource::Cwnd(conn_id));
    world
        .net
        .tracer
        .subscribe(TraceSource::QueueDrop(installed.topo.bottleneck));

    sim.run_until(scenario.sim_stop, &mut world);

    let mut cwnd = Vec::new();
    let mut first_drop_in_cwnd = None;
    let mut seen_drop = false;
    let mut drop_before_decrease = false;
    for rec in world.net.tracer.records() {
        match rec.event {
            TraceEvent::Drop { .. } => seen_drop = true,
            TraceEvent::CwndSample { cwnd: v, .. } => {
                if first_drop_in_cwnd.is_none() && cwnd.last().is_some_and(|&p| v < p) {
                    first_drop_in_cwnd = Some(cwnd.len());
                    drop_before_decrease = seen_drop;
                }
                cwnd.push(v);
            }
        }
    }
    let first_drop_in_cwnd = first_drop_in_cwnd.expect("cwnd never decreased");
    Outcome {
        cwnd,
        first_drop_in_cwnd,
        drop_before_decrease,
        world,
    }
}

#[test]
fn newreno_trace_shows_slow_start_avoidance_then_one_sharp_drop() {
    let out = run(TcpVariant::NewReno);
    let k = out.first_drop_in_cwnd;

    assert!(out.cwnd.iter().all(|&v| v >= 1));
    // slow start: +1 per ACK up to ssthresh
    assert_eq!(out.cwnd[..3], [2, 3, 4]);
    // avoidance: several ACKs per whole segment
    assert!(out.cwnd[..k].iter().filter(|&&v| v == 4).count() > 1);
    assert!(out.cwnd[..k].windows(2).all(|w| w[0] <= w[1]));
    let peak = out.cwnd[k - 1];
    assert!(peak > 4, "peak {peak}");
    // fast recovery: ssthresh + 3
    assert!(out.cwnd[k] < peak);
    assert!(out.cwnd[k] >= 5);

    assert!(out.drop_before_decrease);
    assert!(out.world.net.stats.dropped_pkts > 0);

    let conn = out.world.net.tcp.get(1).expect("conn");
    assert!(conn.stats().fast_retransmits >= 1);
    assert!(conn.bytes_acked() > 0);
}

#[test]
fn tahoe_first_loss_resets_cwnd_to_one() {
    let out = run(TcpVariant::Tahoe);
    assert!(out.drop_before_decrease);
    assert_eq!(out.cwnd[out.first_drop_in_cwnd], 1);
    assert!(out.cwnd.iter().all(|&v| v >= 1));
}

#[test]
fn reno_first_loss_enters_fast_recovery() {
    let out = run(TcpVariant::Reno);
    assert!(out.drop_before_decrease);
    assert!(out.cwnd[out.first_drop_in_cwnd] >= 5);
    let conn = out.world.net.tcp.get(1).expect("conn");
    assert!(conn.stats().fast_retransmits >= 1);
}

#[test]
fn finite_transfers_complete_on_the_default_topology() {
    let scenario = Scenario {
        data_bytes: 20_000,
        ..Scenario::default()
    };
    let mut sim = Simulator::new();
    let mut world = NetWorld::default();
    let installed = scenario.install(&mut sim, &mut world).expect("install");
    assert_eq!(installed.conn_ids, vec![1, 2]);
    assert_eq!(installed.topo.senders.len(), 2);
    // TcpStart + TcpStop per sender
    assert_eq!(sim.pending(), 4);

    sim.run_until(scenario.sim_stop, &mut world);
    assert_eq!(sim.now(), scenario.sim_stop);
    for id in installed.conn_ids {
        let conn = world.net.tcp.get(id).expect("conn");
        assert!(conn.is_done(), "conn {id}");
        assert_eq!(conn.bytes_acked(), 20_000);
        assert_eq!(conn.start_time(), Some(scenario.app_start));
    }
    assert_eq!(sim.destroy(), 0);
}

#[test]
fn bottleneck_link_goes_from_router_to_sink() {
    let mut world = NetWorld::default();
    let mut sim = Simulator::new();
    let installed = Scenario::default()
        .install(&mut sim, &mut world)
        .expect("install");
    let topo = &installed.topo;
    let link = world.net.link(topo.bottleneck).expect("link");
    assert_eq!((link.from, link.to), (topo.router, topo.sink));
    assert_eq!(link.bandwidth_bps, 800_000);
    assert_eq!(link.latency, SimTime::from_millis(5));
    assert_eq!(link.queue.limit(), QueueLimit::Packets(10));
    assert_eq!(world.net.node_name(topo.sink), Some("sink"));
    for (route, &src) in topo.routes.iter().zip(&topo.senders) {
        assert_eq!(route, &vec![src, topo.router, topo.sink]);
    }
}

#[test]
fn scenario_json_fills_missing_fields_with_defaults() {
    let s: Scenario = serde_json::from_str(
        r#"{ "data_bytes": 1000, "topology": { "senders": 3 }, "tcp": { "variant": "TcpReno" } }"#,
    )
    .expect("parse");
    assert_eq!(s.data_bytes, 1000);
    assert_eq!(s.topology.senders, 3);
    assert_eq!(s.topology.bottleneck_bps, 800_000);
    assert_eq!(s.tcp.variant, TcpVariant::Reno);
    assert_eq!(s.tcp.mss, 536);
    assert_eq!(s.sim_stop, SimTime::from_millis(10_100));

    assert!(serde_json::from_str::<Scenario>(r#"{ "tcp": { "variant": "TcpVegas" } }"#).is_err());
}

#[test]
fn invalid_scenarios_fail_before_anything_runs() {
    let mut sim = Simulator::new();

    let mut s = Scenario::default();
    s.topology.senders = 0;
    let err = s
        .install(&mut sim, &mut NetWorld::default())
        .expect_err("no senders");
    assert!(matches!(err, ConfigError::NoSenders));

    let mut s = Scenario::default();
    s.topology.bottleneck_bps = 0;
    let err = s
        .install(&mut sim, &mut NetWorld::default())
        .expect_err("zero rate");
    assert!(matches!(err, ConfigError::NonPositiveRate { .. }));

    let mut s = Scenario::default();
    s.topology.queue = QueueLimit::Packets(0);
    let err = s
        .install(&mut sim, &mut NetWorld::default())
        .expect_err("zero queue");
    assert!(matches!(err, ConfigError::ZeroQueueCapacity));

    let mut s = Scenario::default();
    s.tcp.mss = 0;
    let err = s
        .install(&mut sim, &mut NetWorld::default())
        .expect_err("zero mss");
    assert!(matches!(err, ConfigError::ZeroSegmentSize));

    assert_eq!(sim.pending(), 0);
}

#[test]
fn missing_scenario_file_is_an_io_error() {
    let path = std::env::temp_dir().join("bulktcp-rs-no-such-scenario.json");
    let err = Scenario::from_json_file(&path).expect_err("missing file");
    assert!(matches!(err, ScenarioError::Io { .. }));
    assert!(err.to_string().contains("bulktcp-rs-no-such-scenario.json"));
}
