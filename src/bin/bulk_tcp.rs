//! 瓶颈链路上的批量 TCP 实验
//!
//! 两个发送端经 5Mbps/2ms 接入链路汇聚到路由器，再经 800Kbps/5ms 瓶颈链路到达
//! sink。记录第一个发送端的 cwnd 变化（写入 `<out-dir>/<tcpType>-bulk.cwnd`），
//! 并在标准输出逐行报告瓶颈队列的丢包。

use clap::Parser;
use bulktcp_rs::error::ScenarioError;
use bulktcp_rs::net::NetWorld;
use bulktcp_rs::proto::congestion::TcpVariant;
use bulktcp_rs::queue::QueueLimit;
use bulktcp_rs::scenario::Scenario;
use bulktcp_rs::sim::{SimTime, Simulator};
use bulktcp_rs::trace::TraceSource;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "bulk-tcp", about = "瓶颈链路仿真：批量 TCP 传输 + cwnd/丢包追踪")]
struct Args {
    /// TCP versions (TcpTahoe, TcpReno, TcpNewReno(default))
    #[arg(long = "tcpType", alias = "tcp-type")]
    tcp_type: Option<String>,

    /// 场景 JSON 文件；未给出的字段取默认值
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// 发送端个数
    #[arg(long)]
    senders: Option<usize>,

    /// 每个发送端的数据量（MiB）
    #[arg(long)]
    data_mbytes: Option<u64>,

    /// 每个发送端的数据量（字节），优先于 --data-mbytes
    #[arg(long)]
    data_bytes: Option<u64>,

    /// 每条链路的 DropTail 队列容量（包数）
    #[arg(long)]
    queue_pkts: Option<u64>,

    /// 仿真运行到多少毫秒；应用在此前 100ms 停止
    #[arg(long)]
    sim_stop_ms: Option<u64>,

    /// cwnd 追踪文件所在目录
    #[arg(long, default_value = "mylog")]
    out_dir: PathBuf,

    /// 把全部追踪记录写成 JSON
    #[arg(long)]
    trace_json: Option<PathBuf>,
}

fn resolve_variant(arg: Option<&str>, fallback: TcpVariant) -> TcpVariant {
    let Some(name) = arg else {
        return fallback;
    };
    match name.parse() {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "未知的 TCP 变体，改用 NewReno");
            eprintln!("Invalid TCP version, use TCP NewReno");
            TcpVariant::NewReno
        }
    }
}

fn build_scenario(args: &Args) -> Result<Scenario, ScenarioError> {
    let mut scenario = match &args.scenario {
        Some(path) => Scenario::from_json_file(path)?,
        None => Scenario::default(),
    };
    scenario.tcp.variant = resolve_variant(args.tcp_type.as_deref(), scenario.tcp.variant);
    if let Some(n) = args.senders {
        scenario.topology.senders = n;
    }
    if let Some(mb) = args.data_mbytes {
        scenario.data_bytes = mb.saturating_mul(1024 * 1024);
    }
    if let Some(b) = args.data_bytes {
        scenario.data_bytes = b;
    }
    if let Some(p) = args.queue_pkts {
        scenario.topology.queue = QueueLimit::Packets(p);
    }
    if let Some(ms) = args.sim_stop_ms {
        scenario.sim_stop = SimTime::from_millis(ms);
        let app_stop = scenario.sim_stop.saturating_sub(SimTime::from_millis(100));
        scenario.app_stop = scenario.app_stop.min(app_stop);
    }
    Ok(scenario)
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ScenarioError + '_ {
    move |source| ScenarioError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn run(args: Args) -> Result<(), ScenarioError> {
    let scenario = build_scenario(&args)?;
    let variant = scenario.tcp.variant;
    println!("use {variant}");

    let mut sim = Simulator::new();
    let mut world = NetWorld::default();
    let installed = scenario.install(&mut sim, &mut world)?;

    // 瓶颈队列丢包：逐行报告
    world
        .net
        .tracer
        .subscribe_with(TraceSource::QueueDrop(installed.topo.bottleneck), |rec| {
            println!("{rec}")
        });

    // 第一个发送端的 cwnd：在指定时刻才开始追踪
    let traced_conn = installed.conn_ids.first().copied();
    if let Some(conn_id) = traced_conn {
        sim.schedule_fn(scenario.cwnd_trace_at, move |sim, world| {
            if let Some(w) = bulktcp_rs::net::net_world(world) {
                w.net.tracer.subscribe(TraceSource::Cwnd(conn_id));
                info!(conn_id, now = %sim.now(), "开始追踪 cwnd");
            }
        });
    }

    sim.run_until(scenario.sim_stop, &mut world);

    fs::create_dir_all(&args.out_dir).map_err(io_err(&args.out_dir))?;
    let cwnd_path = args.out_dir.join(format!("{variant}-bulk.cwnd"));
    let mut out = BufWriter::new(File::create(&cwnd_path).map_err(io_err(&cwnd_path))?);
    if let Some(conn_id) = traced_conn {
        for rec in world.net.tracer.cwnd_samples(conn_id) {
            writeln!(out, "{rec}").map_err(io_err(&cwnd_path))?;
        }
    }
    out.flush().map_err(io_err(&cwnd_path))?;
    eprintln!("wrote cwnd trace to {}", cwnd_path.display());

    if let Some(path) = &args.trace_json {
        let json = serde_json::to_string_pretty(world.net.tracer.records())?;
        fs::write(path, json).map_err(io_err(path))?;
        eprintln!("wrote trace records to {}", path.display());
    }

    println!("done @ {}", sim.now());
    for id in world.net.tcp.ids() {
        let Some(c) = world.net.tcp.get(id) else {
            continue;
        };
        let cc = c.controller();
        let st = c.stats();
        println!(
            "  tcp{id}: acked_bytes={}, finished={}, cwnd={:.2}, ssthresh={:.2}, segments_sent={}, retransmits={}, fast_retransmits={}, timeouts={}",
            c.bytes_acked(),
            c.is_done(),
            cc.cwnd(),
            cc.ssthresh(),
            st.segments_sent,
            st.retransmits,
            st.fast_retransmits,
            st.timeouts,
        );
    }
    let stats = &world.net.stats;
    println!(
        "  net: delivered_pkts={}, delivered_bytes={}, dropped_pkts={}, dropped_bytes={}",
        stats.delivered_pkts, stats.delivered_bytes, stats.dropped_pkts, stats.dropped_bytes
    );

    sim.destroy();
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "仿真未能启动");
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}
