use std::io::BufRead;
use std::sync::mpsc::{self, Sender};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use clap::Args;
use drawdown_core::{
    Command, Config, Event, LoopExit, Notifier, PollLoop, PollOutcome, Session, Snapshot,
    SplitNotifier, SystemClock, TerminalNotifier, WebhookNotifier,
};
use tracing::{debug, warn};

use super::InputArgs;

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub inputs: InputArgs,
    /// Send a message this many seconds before the target
    #[arg(long)]
    pub lead_time: Option<f64>,
    /// Phone number for SMS-gateway messages
    #[arg(long)]
    pub phone: Option<String>,
    /// Phone carrier (see `drawdown carriers`)
    #[arg(long)]
    pub carrier: Option<String>,
    /// Relay URL that delivers outbound messages
    #[arg(long)]
    pub webhook: Option<String>,
    /// Wait for `s` instead of starting immediately
    #[arg(long)]
    pub paused: bool,
}

/// Map one stdin line to a command.
fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_ascii_lowercase().as_str() {
        "s" | "start" | "resume" => Some(Command::Start),
        "p" | "pause" => Some(Command::Pause),
        "r" | "reset" => Some(Command::Reset),
        "q" | "quit" | "exit" => Some(Command::Quit),
        _ => None,
    }
}

fn spawn_stdin_reader(tx: Sender<Command>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Some(command) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => eprintln!("commands: s = start/resume, p = pause, r = reset, q = quit"),
            }
        }
        debug!("stdin closed");
    });
}

fn apply_overrides(config: &mut Config, args: &RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(lead) = args.lead_time {
        config.alerts.lead_time_secs = Some(lead);
    }
    if let Some(ref phone) = args.phone {
        config.notifications.phone = Some(phone.clone());
    }
    if let Some(ref carrier) = args.carrier {
        config.notifications.carrier = Some(carrier.clone());
    }
    if let Some(ref url) = args.webhook {
        config.notifications.webhook_url = Some(url.clone());
    }
    config.validate()?;
    Ok(())
}

fn build_notifier(config: &Config) -> Box<dyn Notifier> {
    let terminal = TerminalNotifier::new(config.notifications.audible_cue);
    match config.notifications.webhook_url.as_deref() {
        Some(url) if config.notifications.enabled => {
            Box::new(SplitNotifier::new(terminal, WebhookNotifier::new(url)))
        }
        _ => Box::new(terminal),
    }
}

fn status_line(snapshot: &Snapshot) -> String {
    let target = snapshot
        .target_duration_secs
        .map(|t| format!("{t:.1}"))
        .unwrap_or_else(|| "-".into());
    let remaining = snapshot
        .remaining_secs
        .map(|r| format!("{r:.1}"))
        .unwrap_or_else(|| "-".into());
    let zone = snapshot.zone.map(|z| z.as_str()).unwrap_or("-");
    format!(
        "[{:?}] elapsed {:.1} / {target} s, remaining {remaining} s, zone {zone}",
        snapshot.status, snapshot.elapsed_secs
    )
}

fn describe(event: &Event) -> Option<String> {
    match event {
        Event::TimerStarted { .. } => Some("started".into()),
        Event::TimerResumed { elapsed_secs, .. } => Some(format!("resumed at {elapsed_secs:.1} s")),
        Event::TimerPaused { elapsed_secs, .. } => Some(format!("paused at {elapsed_secs:.1} s")),
        Event::TimerFinished { elapsed_secs, .. } => Some(format!("finished at {elapsed_secs:.1} s")),
        Event::TimerReset { .. } => Some("reset".into()),
        Event::TargetChanged {
            target_duration_secs, ..
        } => Some(match target_duration_secs {
            Some(secs) => format!("target is now {secs:.1} s"),
            None => "no target".into(),
        }),
        Event::ZoneChanged { .. } | Event::StateSnapshot(_) => None,
    }
}

/// Prints event lines, banners on zone changes, delivery failures, rejected
/// inputs and a throttled status line.
struct Printer {
    interval: chrono::Duration,
    last_status: Option<DateTime<Utc>>,
}

impl Printer {
    fn lines(&mut self, outcome: &PollOutcome) -> Vec<String> {
        let mut lines = Vec::new();
        for event in &outcome.events {
            if let Some(line) = describe(event) {
                lines.push(line);
            }
            if let Event::ZoneChanged { .. } = event {
                if let Some(ref banner) = outcome.snapshot.banner_text {
                    lines.push(format!(">> {banner}"));
                }
            }
        }
        if let Some(ref e) = outcome.input_error {
            lines.push(format!("inputs rejected: {e}"));
        }
        for failure in &outcome.failures {
            lines.push(format!("message not delivered: {failure}"));
        }

        let at = outcome.snapshot.at;
        let due = self.last_status.map_or(true, |last| at - last >= self.interval);
        if !lines.is_empty() || due {
            lines.push(status_line(&outcome.snapshot));
            self.last_status = Some(at);
        }
        lines
    }

    fn observe(&mut self, outcome: &PollOutcome) {
        for line in self.lines(outcome) {
            println!("{line}");
        }
    }
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load_or_default();
    apply_overrides(&mut config, &args)?;

    let destination = if config.notifications.enabled {
        config.sms_destination()?
    } else {
        None
    };
    if destination.is_none() && config.alerts.lead_time_secs.is_some() {
        warn!("lead time set but no phone/carrier configured; messages will be skipped");
    }

    let mut session = Session::new(config.alerts.clone());
    let inputs = args.inputs.resolve(config.inputs);
    let result = session.set_inputs(inputs)?;
    println!(
        "Removing {:.2} at {:.2} per min",
        result.mass_to_remove, result.mass_removal_rate
    );

    let interval = StdDuration::from_millis(config.timer.poll_interval_ms);
    let poll = PollLoop::new(SystemClock, build_notifier(&config), interval).with_destination(destination);

    let (tx, rx) = mpsc::channel();
    if !args.paused {
        tx.send(Command::Start)?;
    }
    spawn_stdin_reader(tx);

    let mut printer = Printer {
        interval: drawdown_core::timer::duration_from_secs(config.timer.status_interval_secs),
        last_status: None,
    };
    match poll.run(&mut session, &rx, |outcome| printer.observe(outcome)) {
        LoopExit::Finished => println!("Target mass removed."),
        LoopExit::Quit => println!("quit"),
        LoopExit::Disconnected => debug!("input closed while not running"),
    }
    Ok(())
}
