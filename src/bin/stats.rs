//! Canonical-map statistics and data-integrity report for a dataset.

use anyhow::{Context, Result};
use clap::Parser;
use famtree::integrity::check_invariants;
use famtree::pipeline::build_canonical;
use famtree::source::load_path;
use famtree::{Config, Gender};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "stats")]
#[command(about = "Show canonical family statistics and integrity issues for a dataset")]
struct Args {
    /// TEI file or directory of TEI files (overrides dataset.path)
    input: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct Report {
    records: usize,
    persons: usize,
    by_gender: BTreeMap<String, usize>,
    parent_links: usize,
    partner_pairs: usize,
    parent_pairs: usize,
    issues_by_kind: BTreeMap<String, usize>,
    issues: Vec<String>,
    invariant_violations: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", config.general.log_level.as_str()),
    )
    .init();

    if let Some(input) = args.input {
        config.dataset.path = input;
    }

    let source = load_path(config.dataset_path())
        .with_context(|| format!("Failed to load dataset {}", config.dataset_path().display()))?;
    let (map, issues) = build_canonical(&source);

    let mut by_gender: BTreeMap<String, usize> = BTreeMap::new();
    let mut parent_links = 0;
    let mut partner_pairs = BTreeSet::new();
    let mut parent_pairs = BTreeSet::new();
    for person in map.persons() {
        let gender = match person.gender {
            Gender::Unknown => "unknown".to_string(),
            g => g.to_string(),
        };
        *by_gender.entry(gender).or_default() += 1;
        parent_links += person.mothers.len() + person.fathers.len();
        for partner in &person.partners {
            let pair = if partner < &person.id {
                (partner.clone(), person.id.clone())
            } else {
                (person.id.clone(), partner.clone())
            };
            partner_pairs.insert(pair);
        }
        for mother in &person.mothers {
            for father in &person.fathers {
                parent_pairs.insert((mother.clone(), father.clone()));
            }
        }
    }

    let mut issues_by_kind: BTreeMap<String, usize> = BTreeMap::new();
    for issue in &issues {
        *issues_by_kind.entry(issue.kind().to_string()).or_default() += 1;
    }

    let report = Report {
        records: source.len(),
        persons: map.len(),
        by_gender,
        parent_links,
        partner_pairs: partner_pairs.len(),
        parent_pairs: parent_pairs.len(),
        issues_by_kind,
        issues: issues.iter().map(|i| i.to_string()).collect(),
        invariant_violations: check_invariants(&map),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\n=== Family Dataset Statistics ===\n");
    println!("{:<28} {:>8}", "Source records", report.records);
    println!("{:<28} {:>8}", "Canonical persons", report.persons);
    for (gender, count) in &report.by_gender {
        println!("  {:<26} {:>8}", gender, count);
    }
    println!("{:<28} {:>8}", "Parent links", report.parent_links);
    println!("{:<28} {:>8}", "Partner pairs", report.partner_pairs);
    println!("{:<28} {:>8}", "Mother/father pairs", report.parent_pairs);

    println!("\n{:-<40}", "");
    if report.issues.is_empty() {
        println!("No data integrity issues.");
    } else {
        println!("Data integrity issues:");
        for (kind, count) in &report.issues_by_kind {
            println!("  {:<26} {:>8}", kind, count);
        }
        println!();
        for issue in &report.issues {
            println!("  - {}", issue);
        }
    }

    if !report.invariant_violations.is_empty() {
        println!("\nInvariant violations:");
        for violation in &report.invariant_violations {
            println!("  - {}", violation);
        }
    }

    Ok(())
}
