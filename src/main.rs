mod carousel;
mod chart;
mod config;
mod domain;
mod form;
mod paths;
mod storage;
mod store;
mod ui;
mod window;

use std::error::Error;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use chrono::DateTime;
use clap::{Parser, Subcommand};
use rand::Rng;

use crate::chart::chart_points;
use crate::config::{AppConfig, LogConfig, load_config, save_config};
use crate::domain::{DAY_MS, Mood, Reading, ReadingPatch, distress_score, format_timestamp, now_ms};
use crate::paths::{default_log_path, resolve_config_path, resolve_data_path};
use crate::storage::JsonFileBackend;
use crate::store::{Persistence, RecordKey, RecordStore};
use crate::ui::run_dashboard;
use crate::window::TimeWindow;

#[derive(Debug, Parser)]
#[command(name = "vitals-ledger", about = "Terminal-first blood pressure and heart-rate log")]
struct Cli {
	#[arg(long)]
	data: Option<PathBuf>,
	#[arg(long)]
	config: Option<PathBuf>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	Init,
	Dashboard,
	Add {
		#[arg(long)]
		sys: Option<u16>,
		#[arg(long)]
		dia: Option<u16>,
		#[arg(long)]
		hr: Option<u16>,
		#[arg(long)]
		notes: Option<String>,
		#[arg(long)]
		mood: Option<String>,
		#[arg(long = "symptom")]
		symptoms: Vec<String>,
		#[arg(long = "med")]
		medications: Vec<String>,
		/// RFC 3339 time of the reading; defaults to now.
		#[arg(long)]
		at: Option<String>,
	},
	/// Patch an existing reading; `0` clears a vital.
	Edit {
		id: i64,
		#[arg(long)]
		sys: Option<u16>,
		#[arg(long)]
		dia: Option<u16>,
		#[arg(long)]
		hr: Option<u16>,
		#[arg(long)]
		notes: Option<String>,
		#[arg(long)]
		mood: Option<String>,
	},
	List {
		#[arg(long, default_value_t = 20)]
		limit: usize,
	},
	Window {
		#[arg(long)]
		days: Option<u32>,
	},
	Seed {
		#[arg(long, default_value_t = 14)]
		days: u32,
	},
	Clear {
		#[arg(long)]
		yes: bool,
	},
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();

	let config_path = resolve_config_path(cli.config);
	let config = load_config(&config_path)?;
	init_logging(&config.log);

	let data_path = resolve_data_path(cli.data);
	let backend = JsonFileBackend::new(&data_path).with_naming(config.storage.field_naming);
	let mut store = RecordStore::new(Box::new(backend));
	if let Err(err) = store.initialize() {
		eprintln!("warning: readings unavailable, changes stay in memory: {err}");
	}

	match cli.command.unwrap_or(Command::Dashboard) {
		Command::Init => {
			if !config_path.exists() {
				save_config(&config_path, &AppConfig::default())?;
			}
			if !data_path.exists() {
				store.clear();
			}
			println!("config at {}", config_path.display());
			println!("readings at {}", data_path.display());
		}
		Command::Dashboard => {
			run_dashboard(&mut store, &config)?;
		}
		Command::Add {
			sys,
			dia,
			hr,
			notes,
			mood,
			symptoms,
			medications,
			at,
		} => {
			let timestamp = match at {
				Some(raw) => DateTime::parse_from_rfc3339(&raw)?.timestamp_millis(),
				None => now_ms(),
			};
			let mut reading = Reading::vitals(
				timestamp,
				sys.filter(|value| *value > 0),
				dia.filter(|value| *value > 0),
				hr.filter(|value| *value > 0),
			);
			reading.notes = notes.unwrap_or_default().trim().to_string();
			if let Some(raw) = mood {
				reading.mood = Some(Mood::parse(&raw).ok_or_else(|| format!("unknown mood: {raw}"))?);
			}
			reading.symptoms = symptoms.into_iter().map(|tag| tag.trim().to_string()).collect();
			if !reading.symptoms.is_empty() {
				reading.set_distress(Some(distress_score(&reading.symptoms)), None);
			}
			for name in &medications {
				reading.add_medication(name, timestamp);
			}

			let stored = store.add(reading)?;
			println!("recorded reading at {}", format_timestamp(stored.timestamp));
			warn_if_memory_only(&store);
		}
		Command::Edit {
			id,
			sys,
			dia,
			hr,
			notes,
			mood,
		} => {
			let patch = ReadingPatch {
				systolic: sys.map(|value| (value > 0).then_some(value)),
				diastolic: dia.map(|value| (value > 0).then_some(value)),
				heart_rate: hr.map(|value| (value > 0).then_some(value)),
				notes: notes.map(|value| value.trim().to_string()),
				mood: mood
					.map(|raw| match raw.trim() {
						"" | "none" => Ok(None),
						tag => Mood::parse(tag).map(Some).ok_or_else(|| format!("unknown mood: {raw}")),
					})
					.transpose()?,
				..ReadingPatch::default()
			};
			if patch.is_empty() {
				return Err("nothing to change: pass at least one field".into());
			}

			let updated = store.update(RecordKey::Id(id), &patch)?;
			println!(
				"updated reading at {}: {} {}",
				format_timestamp(updated.timestamp),
				updated.blood_pressure_label(),
				updated.heart_rate_label()
			);
			warn_if_memory_only(&store);
		}
		Command::List { limit } => {
			print_readings(&mut store, limit);
		}
		Command::Window { days } => {
			print_window(&mut store, days.unwrap_or(config.chart.default_days));
		}
		Command::Seed { days } => {
			let count = seed_readings(&mut store, days)?;
			println!("added {count} demo readings");
			warn_if_memory_only(&store);
		}
		Command::Clear { yes } => {
			if !yes {
				return Err("refusing to delete every reading without --yes".into());
			}
			store.clear();
			println!("cleared all readings");
			warn_if_memory_only(&store);
		}
	}

	Ok(())
}

fn init_logging(config: &LogConfig) {
	let mut builder = env_logger::Builder::new();
	builder.parse_filters(&config.level);
	if let Ok(filters) = std::env::var("RUST_LOG") {
		builder.parse_filters(&filters);
	}

	let path = config.file.clone().unwrap_or_else(default_log_path);
	if let Some(parent) = path.parent() {
		let _ = fs::create_dir_all(parent);
	}
	match OpenOptions::new().create(true).append(true).open(&path) {
		Ok(file) => {
			builder.target(env_logger::Target::Pipe(Box::new(file)));
		}
		Err(err) => {
			eprintln!("warning: failed to open log file {}: {err}", path.display());
			builder.filter_level(log::LevelFilter::Error);
		}
	}

	if builder.try_init().is_ok() {
		log::info!("vitals-ledger starting up");
	}
}

fn warn_if_memory_only(store: &RecordStore) {
	if let Persistence::MemoryOnly { reason } = store.persistence() {
		eprintln!("warning: changes were not saved to disk ({reason})");
	}
}

fn print_readings(store: &mut RecordStore, limit: usize) {
	let readings = store.get_all();
	if readings.is_empty() {
		println!("no readings yet");
		return;
	}

	for reading in readings.iter().rev().take(limit) {
		let mut columns = vec![
			format_timestamp(reading.timestamp),
			reading.blood_pressure_label(),
			reading.heart_rate_label(),
		];
		if let Some(mood) = reading.mood {
			columns.push(mood.label().to_string());
		}
		if !reading.symptoms.is_empty() {
			let tags = reading.symptoms.iter().cloned().collect::<Vec<_>>();
			columns.push(tags.join(","));
		}
		if let Some(distress) = reading.distress_final {
			columns.push(format!("distress {distress}"));
		}
		if !reading.medications.is_empty() {
			let names = reading
				.medications
				.iter()
				.map(|event| event.name.clone())
				.collect::<Vec<_>>();
			columns.push(format!("meds {}", names.join(",")));
		}
		if !reading.notes.is_empty() {
			columns.push(reading.notes.clone());
		}
		println!("{}", columns.join(" | "));
	}
}

fn print_window(store: &mut RecordStore, days: u32) {
	let points = chart_points(&store.get_all());
	let mut window = TimeWindow::new(days);
	let Some(range) = window.compute_window(points.iter().map(|point| point.ts)) else {
		println!("no readings with vitals yet");
		return;
	};

	let visible = points.iter().filter(|point| range.contains(point.ts)).count();
	println!(
		"{} -> {} ({} days requested, {})",
		format_timestamp(range.start),
		format_timestamp(range.end),
		window.days(),
		if range.windowed { "windowed" } else { "full range" }
	);
	println!("{visible} of {} readings visible", points.len());
}

fn seed_readings(store: &mut RecordStore, days: u32) -> Result<usize, Box<dyn Error>> {
	let mut rng = rand::thread_rng();
	let now = now_ms();
	let mut count = 0;

	for day in (0..i64::from(days)).rev() {
		for hour in [8, 20] {
			let timestamp = now - day * DAY_MS - (12 - hour) * 3_600_000 + rng.gen_range(0..1_800_000);
			if timestamp > now {
				continue;
			}
			let systolic = rng.gen_range(112..=148);
			let diastolic = rng.gen_range(70..=94).min(systolic - 20);
			let mut reading = Reading::vitals(
				timestamp,
				Some(systolic),
				Some(diastolic),
				Some(rng.gen_range(58..=92)),
			);
			if rng.gen_bool(0.2) {
				reading.mood = Some(Mood::ALL[rng.gen_range(0..Mood::ALL.len())]);
			}
			store.add(reading)?;
			count += 1;
		}
	}

	Ok(count)
}
