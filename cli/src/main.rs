//! scsim - run a supply chain simulation from a JSON configuration
//!
//! Usage:
//!   scsim <config.json> [--trace-csv <path>] [--snapshots-json <path>]
//!
//! Runs the full horizon, reconciles the cost trace against the daily P&L,
//! prints the summary, and optionally exports the cost trace as CSV and
//! the daily snapshots as JSON.

use std::env;
use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::process;

use supply_simulator_core_rs::models::SimulationConfig;
use supply_simulator_core_rs::{result_digest, CostEntry, Simulation};

struct Args {
    config_path: String,
    trace_csv: Option<String>,
    snapshots_json: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = env::args().skip(1);
    let config_path = args.next().ok_or_else(usage)?;
    let mut trace_csv = None;
    let mut snapshots_json = None;
    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--trace-csv" => {
                trace_csv = Some(args.next().ok_or("--trace-csv requires a path")?);
            }
            "--snapshots-json" => {
                snapshots_json = Some(args.next().ok_or("--snapshots-json requires a path")?);
            }
            other => return Err(format!("unknown argument: {}\n{}", other, usage())),
        }
    }
    Ok(Args {
        config_path,
        trace_csv,
        snapshots_json,
    })
}

fn usage() -> String {
    "usage: scsim <config.json> [--trace-csv <path>] [--snapshots-json <path>]".to_string()
}

fn write_trace_csv(path: &str, trace: &[CostEntry]) -> Result<(), Box<dyn Error>> {
    let mut writer = csv::Writer::from_path(path)?;
    for entry in trace {
        writer.serialize(entry)?;
    }
    writer.flush()?;
    println!("Exported {} trace rows to '{}'", trace.len(), path);
    Ok(())
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let file = File::open(&args.config_path)?;
    let config: SimulationConfig = serde_json::from_reader(BufReader::new(file))?;

    let mut sim = Simulation::new(config)?;
    let (snapshots, profit_loss) = sim.run();
    sim.assert_pl_equals_trace_totals()?;

    let summary = sim.compute_summary();
    println!("=== Simulation Summary ===");
    println!("Days simulated:     {}", summary.planning_days);
    println!("Fill rate:          {:.4}", summary.fill_rate);
    println!("Store demand:       {:.1}", summary.store_demand_total);
    println!("Store sales:        {:.1}", summary.store_sales_total);
    println!("Customer shortage:  {:.1}", summary.customer_shortage_total);
    println!("Network shortage:   {:.1}", summary.network_shortage_total);
    println!(
        "Backorder peak:     {:.1} (day {})",
        summary.backorder_peak, summary.backorder_peak_day
    );
    println!("Revenue total:      {:.2}", summary.revenue_total);
    println!("Cost total:         {:.2}", summary.cost_total);
    println!("Profit total:       {:.2}", summary.profit_total);
    println!("Profit per day:     {:.2}", summary.profit_per_day_avg);
    if !summary.top_shortage_items.is_empty() {
        println!("Top shortage items:");
        for entry in &summary.top_shortage_items {
            println!("  {}: {:.1}", entry.item, entry.shortage);
        }
    }
    println!(
        "Result digest:      {}",
        result_digest(&snapshots, &profit_loss)?
    );

    if let Some(path) = &args.trace_csv {
        write_trace_csv(path, sim.cost_trace())?;
    }
    if let Some(path) = &args.snapshots_json {
        serde_json::to_writer_pretty(File::create(path)?, &snapshots)?;
        println!("Exported {} snapshots to '{}'", snapshots.len(), path);
    }

    Ok(())
}

fn main() {
    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            process::exit(2);
        }
    };
    if let Err(error) = run(args) {
        eprintln!("Error: {}", error);
        process::exit(1);
    }
}
