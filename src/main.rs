use chargeslot::cache::AvailabilityCache;
use chargeslot::config::parse_zone;
use chargeslot::engine::slots::Slot;
use chargeslot::scenario::Scenario;
use chargeslot::time::{MINUTES_PER_DAY, civil_date};
use chargeslot::{AvailabilityEngine, DayAvailability, Minutes};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use clap::Parser;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::{Context, Editor, Helper, Highlighter, Hinter, Validator};
use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tabled::Tabled;
use tabled::settings::Style;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
struct Args {
    /// Path to the JSON scenario file
    #[arg(short, long, value_name = "FILE", default_value = "data/station.json")]
    scenario: PathBuf,

    /// Buffer in minutes kept around every reservation
    #[arg(short, long)]
    buffer: Option<u32>,

    /// Station civil zone as an offset, e.g. +05:45
    #[arg(short, long)]
    zone: Option<String>,

    /// Freeze the clock at this RFC 3339 instant instead of reading it live
    #[arg(long, value_name = "INSTANT")]
    now: Option<DateTime<Utc>>,

    /// Seconds a computed day stays cached
    #[arg(long, value_name = "SECS", default_value_t = 120)]
    cache_ttl: i64,
}

#[derive(Helper, Hinter, Highlighter, Validator)]
pub struct CompleteHelper {
    pub commands: Vec<String>,
}

impl Completer for CompleteHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, _pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let candidates = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: format!("{} ", cmd),
            })
            .collect();

        Ok((0, candidates))
    }
}

#[derive(Tabled)]
struct PortRow {
    #[tabled(rename = "Port")]
    id: String,
    #[tabled(rename = "Reservations")]
    reservations: usize,
}

#[derive(Tabled)]
struct SlotRow {
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Max")]
    max: String,
    #[tabled(rename = "Conflicts")]
    conflicts: String,
}

impl From<&Slot> for SlotRow {
    fn from(slot: &Slot) -> Self {
        SlotRow {
            start: slot.start.to_string(),
            status: if slot.is_available {
                "available".green().to_string()
            } else {
                "taken".red().to_string()
            },
            max: format!("{}m", slot.max_continuous),
            conflicts: slot
                .conflicts
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

fn paginate(content: String) {
    let pager = Command::new("less")
        .arg("-R")
        .stdin(Stdio::piped())
        .spawn()
        // Fallback to 'more' if 'less' isn't available
        .or_else(|_| Command::new("more").stdin(Stdio::piped()).spawn());

    let Ok(mut pager) = pager else {
        println!("{}", content);
        return;
    };

    if let Some(mut stdin) = pager.stdin.take() {
        if let Err(e) = stdin.write_all(content.as_bytes()) {
            // Broken pipe is common if the user quits the pager early
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                eprintln!("Error writing to pager: {}", e);
            }
        }
    }

    let _ = pager.wait();
}

fn print_table<T: Tabled>(rows: &[T]) {
    let mut table = tabled::Table::new(rows);
    table.with(Style::rounded());
    table.with(tabled::settings::Alignment::left());
    if rows.len() > 20 {
        paginate(table.to_string());
    } else {
        println!("{}", table);
    }
}

// HH:MM+1 is a start after midnight in a window that runs into the next day
fn parse_start(input: &str) -> Result<Minutes, Box<dyn Error>> {
    match input.strip_suffix("+1") {
        Some(clock) => Ok(Minutes::parse_clock(clock)? + MINUTES_PER_DAY),
        None => Ok(Minutes::parse_clock(input)?),
    }
}

struct Session {
    scenario: Scenario,
    engine: AvailabilityEngine,
    cache: AvailabilityCache,
    frozen_now: Option<DateTime<Utc>>,
}

impl Session {
    fn now(&self) -> DateTime<Utc> {
        self.frozen_now.unwrap_or_else(Utc::now)
    }

    fn parse_date(&self, input: &str) -> Result<NaiveDate, Box<dyn Error>> {
        let today = civil_date(self.now(), self.engine.config().zone);
        match input {
            "today" => Ok(today),
            "tomorrow" => today.succ_opt().ok_or_else(|| "date out of range".into()),
            "yesterday" => today.pred_opt().ok_or_else(|| "date out of range".into()),
            _ => Ok(NaiveDate::parse_from_str(input, "%Y-%m-%d")?),
        }
    }

    fn day(&mut self, port: &str, date: NaiveDate) -> Result<&DayAvailability, Box<dyn Error>> {
        let port_id = self
            .scenario
            .store
            .port(port)
            .cloned()
            .ok_or_else(|| format!("unknown port {}", port))?;
        let now = self.now();
        let (engine, store, hours) = (&self.engine, &self.scenario.store, &self.scenario.station.hours);
        Ok(self.cache.get_or_compute(&port_id, date, now, || {
            let window = engine.window(hours, date);
            let reservations = store.reservations_in_window(port, date, &window, engine);
            engine.compute(hours, date, &reservations, now)
        }))
    }

    fn ports(&self) {
        let rows = self
            .scenario
            .store
            .port_ids()
            .into_iter()
            .map(|id| PortRow {
                id: id.to_string(),
                reservations: self.scenario.store.reservation_count(id),
            })
            .collect::<Vec<_>>();
        print_table(&rows);
    }

    fn slots(&mut self, port: &str, date: &str, show_all: bool) -> Result<(), Box<dyn Error>> {
        let date = self.parse_date(date)?;
        let day = self.day(port, date)?;
        let rows = day
            .slots
            .iter()
            .filter(|s| show_all || s.is_available)
            .map(SlotRow::from)
            .collect::<Vec<_>>();
        if rows.is_empty() {
            println!("No bookable slots on {}.", date);
        } else {
            println!(
                "{} on {}: open {} - {}",
                port, date, day.window.open, day.window.close
            );
            print_table(&rows);
        }
        Ok(())
    }

    fn durations(&mut self, port: &str, date: &str, start: &str) -> Result<(), Box<dyn Error>> {
        let date = self.parse_date(date)?;
        let start = parse_start(start)?;
        let engine = self.engine.clone();
        let day = self.day(port, date)?;
        let slot = day
            .slot_at(start)
            .ok_or_else(|| format!("no slot starts at {}", start))?;
        let options = engine.durations(slot);
        if options.is_empty() {
            println!("Nothing bookable from {}.", start);
            return Ok(());
        }
        let labels = options
            .iter()
            .map(|o| {
                if o.is_max {
                    format!("{}m (max)", o.minutes).bold().to_string()
                } else {
                    format!("{}m", o.minutes)
                }
            })
            .collect::<Vec<_>>();
        println!("{}", labels.join("  "));
        Ok(())
    }

    fn check(&mut self, port: &str, date: &str, start: &str, minutes: &str) -> Result<(), Box<dyn Error>> {
        let date = self.parse_date(date)?;
        let start = parse_start(start)?;
        let minutes = minutes.parse::<u32>()?;
        let engine = self.engine.clone();
        let day = self.day(port, date)?;
        match engine.check(day, start, minutes) {
            Ok(()) => println!("{}", format!("{} for {}m is bookable.", start, minutes).green()),
            Err(e) => println!("{}", e.to_string().red()),
        }
        Ok(())
    }

    fn book(&mut self, port: &str, date: &str, start: &str, minutes: &str) -> Result<(), Box<dyn Error>> {
        let date = self.parse_date(date)?;
        let start = parse_start(start)?;
        let minutes = minutes.parse::<u32>()?;
        let now = self.now();
        let (id, filed) = self.scenario.store.commit(
            &self.engine,
            &self.scenario.station.hours,
            port,
            date,
            start,
            minutes,
            now,
        )?;
        // each filed day and the day before it (its window may run into this one)
        for day in &filed {
            self.cache.invalidate(port, *day);
            if let Some(previous) = day.pred_opt() {
                self.cache.invalidate(port, previous);
            }
        }
        let dates = filed.iter().map(|d| d.to_string()).collect::<Vec<_>>();
        println!("Booked {} for {}m on {} ({}).", start, minutes, dates.join(" and "), id);
        Ok(())
    }

    fn set_now(&mut self, input: Option<&str>) -> Result<(), Box<dyn Error>> {
        match input {
            Some("live") => self.frozen_now = None,
            Some(instant) => self.frozen_now = Some(instant.parse::<DateTime<Utc>>()?),
            None => {}
        }
        let zone = self.engine.config().zone;
        println!(
            "Now: {}{}",
            self.now().with_timezone(&zone).format("%Y-%m-%d %H:%M %:z"),
            if self.frozen_now.is_some() { " (frozen)" } else { "" }
        );
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let path = args
        .scenario
        .to_str()
        .ok_or("scenario path is not valid UTF-8")?;
    let mut scenario = Scenario::load_from_file(path)?;
    if let Some(buffer) = args.buffer {
        scenario.config.buffer = buffer;
    }
    if let Some(zone) = &args.zone {
        scenario.config.zone = parse_zone(zone)?;
    }
    scenario.config.validate()?;

    println!(
        "Station {} online. Loaded {} ports from {}",
        scenario.station.name.as_deref().unwrap_or(&scenario.station.id),
        scenario.store.port_ids().len(),
        args.scenario.display()
    );

    let mut session = Session {
        engine: AvailabilityEngine::new(scenario.config.clone()),
        scenario,
        cache: AvailabilityCache::new(TimeDelta::seconds(args.cache_ttl)),
        frozen_now: args.now,
    };

    let config = rustyline::Config::builder()
        .history_ignore_space(true)
        .completion_type(rustyline::CompletionType::List)
        .build();

    let helper = CompleteHelper {
        commands: ["ports", "slots", "durations", "check", "book", "now", "help", "exit"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
    };

    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(helper));

    loop {
        let readline = rl.readline(">> ");
        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() { continue; }

                rl.add_history_entry(trimmed)?;

                let parts: Vec<&str> = trimmed.split_whitespace().collect();
                let result = match parts.as_slice() {
                    ["ports"] => {
                        session.ports();
                        Ok(())
                    },
                    ["slots", port, date] => session.slots(port, date, false),
                    ["slots", port, date, "all"] => session.slots(port, date, true),
                    ["durations", port, date, start] => session.durations(port, date, start),
                    ["check", port, date, start, minutes] => session.check(port, date, start, minutes),
                    ["book", port, date, start, minutes] => session.book(port, date, start, minutes),
                    ["now"] => session.set_now(None),
                    ["now", instant] => session.set_now(Some(*instant)),
                    ["help"] | ["?"] => {
                        println!("\nAvailable Commands:");
                        println!("  ports                          - List ports and their reservation counts");
                        println!("  slots <port> <date> [all]      - Show bookable start times (all: include taken ones)");
                        println!("  durations <port> <date> <t>    - Offer durations for the slot starting at <t> (HH:MM, HH:MM+1)");
                        println!("  check <port> <date> <t> <m>    - Check whether <m> minutes from <t> can be booked");
                        println!("  book <port> <date> <t> <m>     - Book <m> minutes from <t>");
                        println!("  now [<instant>|live]           - Show, freeze or unfreeze the clock");
                        println!("  help / ?                       - Show this help menu");
                        println!("  exit / quit                    - Exit\n");
                        println!("  <date> is YYYY-MM-DD, yesterday, today or tomorrow\n");
                        Ok(())
                    },
                    ["exit"] | ["quit"] => break,
                    _ => {
                        println!("Unknown command: {} (try help)", trimmed);
                        Ok(())
                    },
                };
                if let Err(e) = result {
                    println!("{}", format!("Error: {}", e).red());
                }
            },
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            },
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            },
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    Ok(())
}
