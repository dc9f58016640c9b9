//! Batch Elites CLI - Tune validation batch parameters from a JSON config.
//!
//! Wires the engine to a self-contained synthetic validation workload:
//! record validation against a data-driven field-spec list, timed in
//! micro-batches, with a type-check-only pass as the baseline comparator.

use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Instant;

use rand::Rng;

use batch_elites::{
    compute::ScalingController,
    schema::{Individual, TunerConfig, WorkloadProfile},
    workload::Workload,
};

/// Ordered field descriptions derived from a profile. Validators are
/// driven by this data, never by synthesized types.
#[derive(Debug, Clone)]
enum FieldSpec {
    Text {
        min_len: Option<usize>,
        max_len: Option<usize>,
        require_at: bool,
    },
    Number {
        min: Option<i64>,
        max: Option<i64>,
    },
}

#[derive(Debug, Clone)]
enum FieldValue {
    Text(String),
    Number(i64),
}

/// Generated records plus the specs they are validated against.
struct SyntheticDataset {
    specs: Vec<FieldSpec>,
    records: Vec<Vec<FieldValue>>,
}

/// Synthetic validation engine used by the demo binary.
struct SyntheticValidation;

impl SyntheticValidation {
    fn field_specs(profile: &WorkloadProfile) -> Vec<FieldSpec> {
        let complex = profile.constraint_complexity;
        let mut specs = Vec::with_capacity(profile.field_count as usize);

        // Base fields: name, age, email.
        if complex > 0.5 {
            specs.push(FieldSpec::Text {
                min_len: Some(3),
                max_len: Some(40),
                require_at: false,
            });
            specs.push(FieldSpec::Number {
                min: Some(18),
                max: Some(90),
            });
            specs.push(FieldSpec::Text {
                min_len: Some(3),
                max_len: None,
                require_at: true,
            });
        } else {
            specs.push(FieldSpec::Text {
                min_len: None,
                max_len: None,
                require_at: false,
            });
            specs.push(FieldSpec::Number {
                min: None,
                max: None,
            });
            specs.push(FieldSpec::Text {
                min_len: None,
                max_len: None,
                require_at: false,
            });
        }

        // Extra fields alternate string/number, constrained only for the
        // most complex profiles.
        for i in 3..profile.field_count as usize {
            if i % 2 == 0 {
                specs.push(FieldSpec::Text {
                    min_len: (complex > 0.7).then_some(1),
                    max_len: (complex > 0.7).then_some(100),
                    require_at: false,
                });
            } else {
                specs.push(FieldSpec::Number {
                    min: (complex > 0.7).then_some(0),
                    max: (complex > 0.7).then_some(1_000_000),
                });
            }
        }

        specs
    }

    fn validate(specs: &[FieldSpec], record: &[FieldValue]) -> bool {
        if specs.len() != record.len() {
            return false;
        }
        specs.iter().zip(record).all(|(spec, value)| match (spec, value) {
            (
                FieldSpec::Text {
                    min_len,
                    max_len,
                    require_at,
                },
                FieldValue::Text(s),
            ) => {
                min_len.is_none_or(|min| s.len() >= min)
                    && max_len.is_none_or(|max| s.len() <= max)
                    && (!require_at || s.contains('@'))
            }
            (FieldSpec::Number { min, max }, FieldValue::Number(n)) => {
                min.is_none_or(|min| *n >= min) && max.is_none_or(|max| *n <= max)
            }
            _ => false,
        })
    }

    fn type_check(record: &[FieldValue], specs: &[FieldSpec]) -> bool {
        specs.len() == record.len()
            && specs.iter().zip(record).all(|(spec, value)| {
                matches!(
                    (spec, value),
                    (FieldSpec::Text { .. }, FieldValue::Text(_))
                        | (FieldSpec::Number { .. }, FieldValue::Number(_))
                )
            })
    }
}

impl Workload for SyntheticValidation {
    type Dataset = SyntheticDataset;

    fn generate(&self, profile: &WorkloadProfile, items: usize) -> SyntheticDataset {
        let specs = Self::field_specs(profile);
        let mut rng = rand::thread_rng();
        let string_len = profile.avg_string_length.max(1.0) as usize;

        let records = (0..items)
            .map(|_| {
                let mut record = Vec::with_capacity(specs.len());
                record.push(FieldValue::Text("A".repeat(string_len)));
                record.push(FieldValue::Number(rng.gen_range(18..=80)));
                record.push(FieldValue::Text("user@example.com".to_string()));
                for i in 3..profile.field_count as usize {
                    if i % 2 == 0 {
                        record.push(FieldValue::Text("X".repeat(string_len / 2)));
                    } else {
                        record.push(FieldValue::Number(rng.gen_range(0..=1_000_000)));
                    }
                }
                record
            })
            .collect();

        SyntheticDataset { specs, records }
    }

    fn throughput(
        &self,
        individual: &Individual,
        _profile: &WorkloadProfile,
        dataset: &SyntheticDataset,
    ) -> f64 {
        let start = Instant::now();
        let mut total = 0usize;

        for chunk in dataset.records.chunks(individual.micro_batch_size as usize) {
            for record in chunk {
                let _ = SyntheticValidation::validate(&dataset.specs, record);
            }
            total += chunk.len();
        }

        let elapsed = start.elapsed().as_secs_f64();
        if elapsed > 0.0 { total as f64 / elapsed } else { 0.0 }
    }

    fn baseline(&self, _profile: &WorkloadProfile, dataset: &SyntheticDataset) -> f64 {
        let start = Instant::now();
        for record in &dataset.records {
            let _ = SyntheticValidation::type_check(record, &dataset.specs);
        }
        let elapsed = start.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            dataset.records.len() as f64 / elapsed
        } else {
            0.0
        }
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json>", args[0]);
        eprintln!();
        eprintln!("Run MAP-Elites batch-parameter tuning from a JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to tuner configuration file");
        eprintln!();
        eprintln!("An example configuration is printed with --example.");
        process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        process::exit(1);
    });
    let config: TunerConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        process::exit(1);
    });

    println!("Batch Elites Tuning");
    println!("===================");
    println!("Profiles: {}", config.profiles.len());
    println!("Scales:   {:?}", config.scales);
    println!("Runs:     {} per profile per scale", config.runs);
    println!();

    let mut controller = ScalingController::new(config, Arc::new(SyntheticValidation))
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            process::exit(1);
        });

    let outcome = controller.run().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        process::exit(1);
    });

    let report = &outcome.report;
    println!();
    println!("Final state ({:?}):", outcome.phase);
    println!("  Archive size:      {} elite configurations", report.archive_size);
    println!("  Total evaluations: {}", report.total_evaluations);
    println!("  Failed tasks:      {}", report.failed_evaluations);
    println!(
        "  Avg ratio:         {:.3}x baseline",
        report.summary.overall.ratio_mean
    );
    println!(
        "  Best ratio:        {:.3}x baseline",
        report.summary.overall.best_ratio
    );
    println!(
        "  Max throughput:    {:.0} items/s",
        report.summary.overall.throughput_max
    );
    println!();
    println!("Scale performance:");
    for (scale, stats) in &report.summary.by_scale {
        println!(
            "  {:>12} items: {:.3}x +/- {:.3} ({} samples)",
            scale, stats.ratio_mean, stats.ratio_std, stats.samples
        );
    }
}

fn print_example_config() {
    let config = TunerConfig {
        profiles: vec![
            WorkloadProfile {
                field_count: 3,
                avg_string_length: 10.0,
                constraint_complexity: 0.0,
                object_size_kb: 0.1,
            },
            WorkloadProfile {
                field_count: 8,
                avg_string_length: 15.0,
                constraint_complexity: 0.4,
                object_size_kb: 0.35,
            },
            WorkloadProfile {
                field_count: 20,
                avg_string_length: 30.0,
                constraint_complexity: 0.9,
                object_size_kb: 1.2,
            },
        ],
        scales: vec![1_000_000, 5_000_000, 10_000_000],
        ..Default::default()
    };

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error rendering example config: {}", e);
            process::exit(1);
        }
    }
}
