//! Snapshot statistics command.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use vq_curves::snapshot::Dataset;
use vq_curves::stats::Summary;

pub fn run(input: &Path) -> Result<()> {
    let datasets = super::load_datasets(input)?;

    println!("Datasets: {}", datasets.len());
    println!();

    let mut by_metric: BTreeMap<String, Vec<&Dataset>> = BTreeMap::new();
    for dataset in &datasets {
        by_metric.entry(dataset.metric.to_string()).or_default().push(dataset);
    }

    for (metric, group) in &by_metric {
        println!("{}:", metric);
        println!("{:-<60}", "");

        let mut sets: BTreeMap<u8, usize> = BTreeMap::new();
        for dataset in group {
            *sets.entry(dataset.set).or_default() += 1;
        }
        for (set, count) in &sets {
            println!("  set {}: {} curves", set, count);
        }

        let points: Vec<f64> = group.iter().map(|d| d.points.len() as f64).collect();
        if let Some(summary) = Summary::compute(&points) {
            println!("Points per curve:");
            println!("  Mean: {:.1}, Median: {:.1}", summary.mean, summary.median);
            println!("  Min: {:.0}, Max: {:.0}", summary.min, summary.max);
        }

        let low: Vec<f64> = group.iter().filter_map(|d| d.points.first().map(|p| p.y)).collect();
        let high: Vec<f64> = group.iter().filter_map(|d| d.points.last().map(|p| p.y)).collect();
        if let (Some(low), Some(high)) = (Summary::compute(&low), Summary::compute(&high)) {
            println!("Quality at lowest bitrate:");
            println!("  Median: {:.3}, P5: {:.3}, P95: {:.3}", low.median, low.p5, low.p95);
            println!("Quality at highest bitrate:");
            println!("  Median: {:.3}, P5: {:.3}, P95: {:.3}", high.median, high.p5, high.p95);
        }

        let bitrates: Vec<f64> = group.iter().flat_map(|d| d.points.iter().map(|p| p.x)).collect();
        if let Some(summary) = Summary::compute(&bitrates) {
            println!("Bitrate (kbps):");
            println!("  Min: {:.0}, Max: {:.0}", summary.min, summary.max);
        }
        println!();
    }

    Ok(())
}
