
//! Bandwidth amplification aggregator: merges per-rank MPI output logs and
//! reports the PCDN/CDN traffic ratio at the last observed timestamp.
//!
//! Input line format (anything else is skipped): `<time>s <class> <value>MB`
//! where `<class>` is PCDN, CDN or CLIENT. Values are summed per
//! (time, class) across all rank files.
//!
//! A zero CDN total at the final timestamp prints an explicit `undefined`
//! verdict instead of dividing by zero.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::process::ExitCode;

use clap::Parser;
use log::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "amplification",
    about = "Aggregates MPI rank logs and computes the PCDN/CDN bandwidth amplification ratio"
)]
struct Args {
    /// Number of MPI rank output files to aggregate (rank indices 0..N)
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    mpiproc: u32,

    /// Filename format string with a `{}` placeholder for the rank index
    /// (`.txt` is appended)
    #[arg(long, default_value = "output/MytestCountsMesh-part-{}")]
    prefix: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TrafficClass {
    Pcdn,
    Cdn,
    Client,
}

impl TrafficClass {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "PCDN" => Some(TrafficClass::Pcdn),
            "CDN" => Some(TrafficClass::Cdn),
            "CLIENT" => Some(TrafficClass::Client),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            TrafficClass::Pcdn => "PCDN",
            TrafficClass::Cdn => "CDN",
            TrafficClass::Client => "CLIENT",
        }
    }
}

/// Megabytes per class at one timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ClassTotals {
    pcdn: f64,
    cdn: f64,
    client: f64,
}

impl ClassTotals {
    fn add(&mut self, class: TrafficClass, value: f64) {
        match class {
            TrafficClass::Pcdn => self.pcdn += value,
            TrafficClass::Cdn => self.cdn += value,
            TrafficClass::Client => self.client += value,
        }
    }
}

/// Per-timestamp sums across all rank files.
#[derive(Debug, Default)]
struct Aggregate {
    totals: HashMap<u64, ClassTotals>,
    max_time: Option<u64>,
}

impl Aggregate {
    fn record(&mut self, time_s: u64, class: TrafficClass, value: f64) {
        self.totals.entry(time_s).or_default().add(class, value);
        self.max_time = Some(self.max_time.map_or(time_s, |t| t.max(time_s)));
    }

    fn at_max_time(&self) -> Option<(u64, ClassTotals)> {
        let t = self.max_time?;
        Some((t, self.totals.get(&t).copied().unwrap_or_default()))
    }
}

/// `"86s PCDN 12.5MB"` -> `(86, Pcdn, 12.5)`; any other shape is `None`.
fn parse_line(line: &str) -> Option<(u64, TrafficClass, f64)> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 3 {
        return None;
    }
    let time_s = fields[0].strip_suffix('s')?.parse().ok()?;
    let class = TrafficClass::parse(fields[1])?;
    let value = fields[2].strip_suffix("MB")?.parse().ok()?;
    Some((time_s, class, value))
}

/// Reads all rank files named by `prefix` (placeholder replaced with the
/// rank index, `.txt` appended) and sums their per-timestamp values.
/// A missing rank file aborts the run: a partial aggregate would silently
/// understate one class.
fn aggregate_files(mpiproc: u32, prefix: &str) -> std::io::Result<Aggregate> {
    let mut agg = Aggregate::default();

    for rank in 0..mpiproc {
        let path = format!("{}.txt", prefix.replace("{}", &rank.to_string()));
        let file = File::open(&path)?;
        info!("reading {path}");

        for line in BufReader::new(file).lines() {
            let line = line?;
            if let Some((time_s, class, value)) = parse_line(&line) {
                agg.record(time_s, class, value);
            }
        }
    }

    Ok(agg)
}

fn report(agg: &Aggregate) {
    let Some((time_s, totals)) = agg.at_max_time() else {
        warn!("no parsable lines found in any rank file");
        println!("no data");
        return;
    };

    println!("totals at {time_s}s:");
    for (class, value) in [
        (TrafficClass::Pcdn, totals.pcdn),
        (TrafficClass::Cdn, totals.cdn),
        (TrafficClass::Client, totals.client),
    ] {
        println!("{} : {}MB", class.name(), value);
    }

    match amplification_ratio(&totals) {
        Some(ratio) => println!(
            "amplification = {} / {} = {}",
            totals.pcdn, totals.cdn, ratio
        ),
        None => println!("amplification = undefined (CDN total is 0)"),
    }
}

/// `PCDN / CDN`, or `None` when the CDN total is zero.
fn amplification_ratio(totals: &ClassTotals) -> Option<f64> {
    if totals.cdn == 0.0 {
        None
    } else {
        Some(totals.pcdn / totals.cdn)
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match aggregate_files(args.mpiproc, &args.prefix) {
        Ok(agg) => {
            report(&agg);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("failed to read rank output: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_well_formed_triples_only() {
        assert_eq!(parse_line("86s PCDN 12.5MB"), Some((86, TrafficClass::Pcdn, 12.5)));
        assert_eq!(parse_line("3s CLIENT 0MB"), Some((3, TrafficClass::Client, 0.0)));
        assert_eq!(parse_line("86s UNKNOWN 12.5MB"), None);
        assert_eq!(parse_line("86 PCDN 12.5MB"), None); // no 's' suffix
        assert_eq!(parse_line("86s PCDN 12.5"), None); // no 'MB' suffix
        assert_eq!(parse_line("some unrelated log line"), None);
        assert_eq!(parse_line(""), None);
    }

    #[test]
    fn sums_per_time_and_class_across_rank_files() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("part-{}").display().to_string();

        let mut f0 = File::create(dir.path().join("part-0.txt")).unwrap();
        writeln!(f0, "1s PCDN 10MB").unwrap();
        writeln!(f0, "2s PCDN 5MB").unwrap();
        writeln!(f0, "2s CDN 4MB").unwrap();
        writeln!(f0, "noise line").unwrap();

        let mut f1 = File::create(dir.path().join("part-1.txt")).unwrap();
        writeln!(f1, "2s PCDN 3MB").unwrap();
        writeln!(f1, "2s CDN 2MB").unwrap();
        writeln!(f1, "2s CLIENT 1MB").unwrap();

        let agg = aggregate_files(2, &prefix).unwrap();
        let (time_s, totals) = agg.at_max_time().unwrap();
        assert_eq!(time_s, 2);
        assert_eq!(totals.pcdn, 8.0);
        assert_eq!(totals.cdn, 6.0);
        assert_eq!(totals.client, 1.0);
    }

    #[test]
    fn missing_rank_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("nope-{}").display().to_string();
        assert!(aggregate_files(1, &prefix).is_err());
    }

    #[test]
    fn zero_cdn_total_is_a_guarded_outcome() {
        let mut agg = Aggregate::default();
        agg.record(10, TrafficClass::Pcdn, 42.0);
        let (_, totals) = agg.at_max_time().unwrap();
        assert_eq!(amplification_ratio(&totals), None);

        agg.record(10, TrafficClass::Cdn, 21.0);
        let (_, totals) = agg.at_max_time().unwrap();
        assert_eq!(amplification_ratio(&totals), Some(2.0));
    }
}
