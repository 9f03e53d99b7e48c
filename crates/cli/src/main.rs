use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use urc_core::{
    Applied, CoreConfig, CorrectiveAction, IdentificationInput, IdentificationOutcome,
    ReadingOutcome, ReadingResult, SurveillanceService,
};
use urc_records::{
    confidence_percent, CollectionPoint, NonEmptyText, RecordId, RiskTier, SampleType,
    SurveillanceRecordData,
};

#[derive(Parser)]
#[command(name = "urc")]
#[command(about = "URC cleanroom microbiological surveillance CLI")]
struct Cli {
    /// Directory holding the collection files
    #[arg(long, global = true, env = "URC_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the taxonomy grouped by risk tier
    Organisms {
        /// Only this tier (1-5)
        #[arg(long)]
        tier: Option<u8>,
    },
    /// Match an organism name against the taxonomy
    Match {
        /// Name as typed, e.g. "E.coli"
        query: String,
    },
    /// Show the alert/action profile of every tier
    Thresholds,
    /// List collection points
    Points,
    /// Register a collection point
    AddPoint {
        label: String,
        /// air or surface
        sample_type: String,
        #[arg(long, default_value = "")]
        room_class: String,
        #[arg(long, default_value = "")]
        medium: String,
    },
    /// Record a sample and schedule its J2 and J7 readings
    Collect {
        /// Collection point label
        point: String,
        operator: String,
        /// Collection date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List readings that can be resolved today
    Due {
        /// Reference date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Resolve a due reading with its colony count (0 = negative)
    Resolve {
        reading_id: String,
        colony_count: u32,
        #[arg(long)]
        today: Option<NaiveDate>,
        #[arg(long, default_value = "")]
        operator: String,
        #[arg(long, default_value = "")]
        remark: String,
    },
    /// List pending identifications
    Pending,
    /// Complete a pending identification with the organism seen
    Identify {
        identification_id: String,
        organism: String,
        #[arg(long, default_value = "")]
        operator: String,
        #[arg(long, default_value = "")]
        remark: String,
    },
    /// Reopen an identification and put its reading back to pending
    Reopen { identification_id: String },
    /// Show ledger records, most recent first
    Ledger {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show ledger counts by outcome
    Stats,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("urc_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => urc_core::config::data_dir_from_env_value(None),
    };
    let cfg = Arc::new(CoreConfig::with_data_dir(data_dir)?);
    let mut service = SurveillanceService::open_data_dir(cfg)?;
    let today = chrono::Local::now().date_naive();

    match cli.command {
        Commands::Organisms { tier } => {
            let only = tier.map(|t| RiskTier::new(i64::from(t))).transpose()?;
            for (tier, organisms) in service.organisms_by_tier() {
                if only.is_some_and(|o| o != tier) {
                    continue;
                }
                println!("Tier {} ({})", tier, tier.label());
                for organism in organisms {
                    println!("  {} [{}]", organism.name, organism.origin());
                }
            }
        }
        Commands::Match { query } => {
            let report = service.match_organism(&query);
            match report.candidate {
                Some(organism) => println!(
                    "{} (tier {}, {}) {}",
                    organism.name,
                    organism.risk_tier,
                    confidence_percent(report.score),
                    if report.accepted { "accepted" } else { "below acceptance floor" }
                ),
                None => println!("No candidate."),
            }
        }
        Commands::Thresholds => {
            for (tier, profile) in service.thresholds() {
                println!(
                    "Tier {} ({}): alert >= {}, action >= {}",
                    tier,
                    tier.label(),
                    profile.alert_count,
                    profile.action_count
                );
            }
        }
        Commands::Points => {
            let points = service.collection_points();
            if points.is_empty() {
                println!("No collection points.");
            }
            for point in points {
                println!(
                    "{} ({}) class {} medium {}",
                    point.label,
                    point.sample_type.as_str(),
                    point.room_class,
                    point.growth_medium
                );
            }
        }
        Commands::AddPoint {
            label,
            sample_type,
            room_class,
            medium,
        } => {
            let point = CollectionPoint {
                label: NonEmptyText::new(&label)?,
                sample_type: SampleType::parse(&sample_type)?,
                room_class,
                growth_medium: medium,
            };
            let applied = service.add_collection_point(point)?;
            println!("Registered {}", applied.value.label);
            report_save(&applied);
        }
        Commands::Collect {
            point,
            operator,
            date,
        } => {
            let applied = service.collect_sample(&point, &operator, date.unwrap_or(today))?;
            println!("Sample {} collected at {}", applied.value.sample.id, point);
            for reading in &applied.value.readings {
                println!("  {} {} due {}", reading.when, reading.id, reading.due_date);
            }
            report_save(&applied);
        }
        Commands::Due { today: at } => {
            let due = service.eligible_readings(at.unwrap_or(today));
            if due.is_empty() {
                println!("No readings due.");
            }
            for item in due {
                println!(
                    "{} {} {} (due {}, collected {} by {})",
                    item.reading.id,
                    item.reading.when,
                    item.sample.label(),
                    item.reading.due_date,
                    item.sample.collection_date,
                    item.sample.operator
                );
            }
        }
        Commands::Resolve {
            reading_id,
            colony_count,
            today: at,
            operator,
            remark,
        } => {
            let id = parse_id(&reading_id)?;
            let applied = service.resolve_reading(
                id,
                ReadingResult::from_colony_count(colony_count),
                at.unwrap_or(today),
                &operator,
                &remark,
            )?;
            match &applied.value {
                ReadingOutcome::Negative {
                    sample_archived, ..
                } => {
                    println!("Negative reading recorded.");
                    if *sample_archived {
                        println!("Sample archived.");
                    }
                }
                ReadingOutcome::Positive { identification } => println!(
                    "Positive: {} UFC, identification {} pending",
                    identification.colony_count, identification.id
                ),
            }
            report_save(&applied);
        }
        Commands::Pending => {
            let pending = service.identifications(true);
            if pending.is_empty() {
                println!("No pending identifications.");
            }
            for identification in pending {
                println!(
                    "{} {} {} UFC on {}",
                    identification.id,
                    identification.when,
                    identification.colony_count,
                    identification.date
                );
            }
        }
        Commands::Identify {
            identification_id,
            organism,
            operator,
            remark,
        } => {
            let id = parse_id(&identification_id)?;
            let applied = service.identify(
                id,
                IdentificationInput {
                    organism_text: organism,
                    operator,
                    remark,
                },
            )?;
            match &applied.value {
                IdentificationOutcome::Unresolved {
                    best_candidate,
                    score,
                } => println!(
                    "Unrecognised organism (best: {}, {}). Nothing recorded.",
                    best_candidate.as_deref().unwrap_or("none"),
                    confidence_percent(*score)
                ),
                IdentificationOutcome::Recorded {
                    record,
                    organism,
                    corrective_action,
                    ..
                } => {
                    println!(
                        "{} (tier {}) -> {}",
                        organism.name, organism.risk_tier, record.status
                    );
                    print_checklist(corrective_action);
                }
            }
            report_save(&applied);
        }
        Commands::Reopen { identification_id } => {
            let id = parse_id(&identification_id)?;
            let applied = service.reopen_identification(id)?;
            println!(
                "{} reading {} is pending again",
                applied.value.when, applied.value.id
            );
            report_save(&applied);
        }
        Commands::Ledger { limit } => {
            let records = service.recent_records(limit);
            if records.is_empty() {
                println!("Ledger is empty.");
            }
            for record in records {
                print_record(record);
            }
        }
        Commands::Stats => {
            let stats = service.ledger_stats();
            println!(
                "total {} / ok {} / alert {} / action {}",
                stats.total, stats.conforming, stats.alerts, stats.actions
            );
        }
    }

    Ok(())
}

fn parse_id(raw: &str) -> anyhow::Result<RecordId> {
    RecordId::parse(raw).with_context(|| format!("invalid id '{raw}'"))
}

fn report_save<T>(applied: &Applied<T>) {
    if let Some(e) = &applied.save_error {
        eprintln!("warning: change applied but not saved: {e}");
    }
}

fn print_checklist(action: &CorrectiveAction) {
    match action {
        CorrectiveAction::NotRequired => {}
        CorrectiveAction::NoConfiguredMeasure => println!("  No configured measure."),
        CorrectiveAction::Measures(measures) => {
            for measure in measures {
                println!("  [ ] {} {}", measure.id, measure.text);
            }
        }
    }
}

fn print_record(record: &SurveillanceRecordData) {
    let row = record.to_row();
    println!(
        "{} {} {} {} {} UFC {} {}",
        row.date,
        row.sample_label,
        if row.matched_name.is_empty() { "-" } else { row.matched_name.as_str() },
        row.confidence,
        row.colony_count,
        row.status,
        row.operator
    );
}
