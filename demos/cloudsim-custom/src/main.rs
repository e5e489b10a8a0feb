use std::time::Instant;

use clap::Parser;
use log::info;
use serde::Serialize;

use dslab_cloudsim::core::characteristics::DatacenterCharacteristics;
use dslab_cloudsim::core::cloudlet::Cloudlet;
use dslab_cloudsim::core::cloudlet_schedulers::time_shared::CloudletSchedulerTimeShared;
use dslab_cloudsim::core::config::SimulationConfig;
use dslab_cloudsim::core::host::Host;
use dslab_cloudsim::core::pe::pe_list;
use dslab_cloudsim::core::utilization_model::{utilization_model_resolver, FullUtilization};
use dslab_cloudsim::core::vm::Vm;
use dslab_cloudsim::core::vm_placement_algorithms::first_fit::FirstFit;
use dslab_cloudsim::core::vm_schedulers::time_shared::VmSchedulerTimeShared;
use dslab_cloudsim::simulation::CloudSimulation;
use dslab_core::simulation::Simulation;

fn init_logger() {
    use env_logger::Builder;
    use std::io::Write;
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// YAML file with datacenters description (two built-in datacenters are used if omitted)
    #[clap(short, long)]
    config: Option<String>,

    /// Number of VMs
    #[clap(long, default_value_t = 10)]
    vms: u32,

    /// Number of cloudlets, cloudlet i is bound to VM (i % vms)
    #[clap(long, default_value_t = 20)]
    cloudlets: u32,

    /// Random seed
    #[clap(long, default_value_t = 123)]
    seed: u64,

    /// Relative deviation of cloudlet length from 100000 MI
    #[clap(long, default_value_t = 0.)]
    length_jitter: f64,

    /// CPU utilization model of cloudlets, e.g. Full or Constant[utilization=0.5]
    #[clap(long, default_value = "Full")]
    cpu_utilization: String,

    /// Path to CSV file with cloudlet results
    #[clap(short, long)]
    output: Option<String>,
}

#[derive(Serialize)]
struct CloudletRecord {
    cloudlet_id: u32,
    status: String,
    datacenter: String,
    vm_id: Option<u32>,
    length: f64,
    start_time: Option<f64>,
    finish_time: Option<f64>,
    cpu_time: Option<f64>,
    cost: f64,
}

fn add_datacenter(cloud_sim: &mut CloudSimulation, name: &str) -> u32 {
    let hosts = [4, 2]
        .iter()
        .enumerate()
        .map(|(id, &pes)| {
            Host::new(
                id as u32,
                pe_list(pes, 2000.),
                4096,
                10000,
                1_000_000,
                Box::new(VmSchedulerTimeShared::new()),
            )
        })
        .collect();
    let characteristics = DatacenterCharacteristics {
        cost_per_storage: 0.1,
        cost_per_bw: 0.1,
        ..DatacenterCharacteristics::default()
    };
    cloud_sim.add_datacenter(name, hosts, characteristics, Box::new(FirstFit::new()))
}

fn build_simulation(args: &Args) -> CloudSimulation {
    let sim = Simulation::new(args.seed);
    match &args.config {
        Some(path) => CloudSimulation::from_config(sim, SimulationConfig::from_file(path)),
        None => {
            let mut cloud_sim = CloudSimulation::new(sim, SimulationConfig::default());
            add_datacenter(&mut cloud_sim, "datacenter0");
            add_datacenter(&mut cloud_sim, "datacenter1");
            cloud_sim
        }
    }
}

fn main() {
    init_logger();
    let args = Args::parse();
    let simulation_start = Instant::now();

    let mut cloud_sim = build_simulation(&args);
    let broker_id = cloud_sim.add_broker("broker");

    let vms = (0..args.vms)
        .map(|id| {
            Vm::new(
                id,
                broker_id,
                1000.,
                1,
                1024,
                1000,
                10000,
                "Xen",
                Box::new(CloudletSchedulerTimeShared::new()),
            )
        })
        .collect();
    let mut cloudlets = Vec::new();
    for id in 0..args.cloudlets {
        let mut length = 100000.;
        if args.length_jitter > 0. {
            length *= 1. + cloud_sim.gen_range(-args.length_jitter..args.length_jitter);
        }
        cloudlets.push(Cloudlet::new(
            id,
            length.max(1.),
            1,
            300,
            300,
            utilization_model_resolver(&args.cpu_utilization),
            Box::new(FullUtilization),
            Box::new(FullUtilization),
        ));
    }

    let broker = cloud_sim.broker(broker_id);
    broker.borrow_mut().submit_vm_list(vms);
    broker.borrow_mut().submit_cloudlet_list(cloudlets);
    if args.vms > 0 {
        for id in 0..args.cloudlets {
            broker.borrow_mut().bind_cloudlet_to_vm(id, id % args.vms);
        }
    }

    let end_time = cloud_sim.start_simulation();

    let mut records = Vec::new();
    for cloudlet in broker.borrow().cloudlet_received_list() {
        let datacenter = cloudlet
            .datacenter_id()
            .map(|id| cloud_sim.datacenter(id).borrow().name().to_string())
            .unwrap_or_else(|| "-".to_string());
        records.push(CloudletRecord {
            cloudlet_id: cloudlet.id,
            status: cloudlet.status().to_string(),
            datacenter,
            vm_id: cloudlet.vm_id(),
            length: cloudlet.length(),
            start_time: cloudlet.start_time(),
            finish_time: cloudlet.finish_time(),
            cpu_time: cloudlet.actual_cpu_time(),
            cost: cloudlet.processing_cost(),
        });
    }

    let fmt_time = |time: Option<f64>| time.map_or("-".to_string(), |t| format!("{:.2}", t));
    info!("========== OUTPUT ==========");
    info!(
        "{:>10} {:>9} {:>12} {:>5} {:>10} {:>10} {:>10} {:>10}",
        "Cloudlet", "Status", "Datacenter", "VM", "Time", "Start", "Finish", "Cost"
    );
    for record in records.iter() {
        info!(
            "{:>10} {:>9} {:>12} {:>5} {:>10} {:>10} {:>10} {:>10.2}",
            record.cloudlet_id,
            record.status,
            record.datacenter,
            record.vm_id.map_or("-".to_string(), |id| id.to_string()),
            fmt_time(record.cpu_time),
            fmt_time(record.start_time),
            fmt_time(record.finish_time),
            record.cost,
        );
    }
    info!(
        "Finished at {:.2} after {} events, {} of {} VMs created",
        end_time,
        cloud_sim.event_count(),
        broker.borrow().created_vm_ids().len(),
        args.vms
    );

    if let Some(path) = &args.output {
        let mut writer = csv::Writer::from_path(path).unwrap();
        for record in records {
            writer.serialize(record).unwrap();
        }
        writer.flush().unwrap();
    }

    println!("Simulation process time {:.2?}", simulation_start.elapsed());
}
