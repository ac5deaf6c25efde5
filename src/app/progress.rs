use std::io::{IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    cursor, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use tokio::time::Instant;

use crate::shutdown::ShutdownSender;
use crate::vu::PoolStats;

const REFRESH_INTERVAL: Duration = Duration::from_millis(250);

/// What the progress line needs to know about the run.
pub(crate) struct ProgressSource {
    pub total: Duration,
    pub max_vus: u64,
    pub stats: Arc<PoolStats>,
}

/// Draws a one-line progress bar on stderr until shutdown. Does nothing when
/// stderr is not a terminal.
pub(crate) fn setup_progress_indicator(
    source: ProgressSource,
    run_start: Instant,
    no_color: bool,
    shutdown_tx: &ShutdownSender,
) -> tokio::task::JoinHandle<()> {
    let mut shutdown_rx = shutdown_tx.subscribe();
    let style = ProgressStyle::new(30);

    tokio::spawn(async move {
        if !std::io::stderr().is_terminal() {
            return;
        }

        let mut ticker = tokio::time::interval(REFRESH_INTERVAL);
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    let snapshot = Snapshot::read(&source, source.total);
                    if render_progress_line(&style, &snapshot, no_color).is_err() {
                        break;
                    }
                    if finish_progress_line().is_err() {
                        break;
                    }
                    break;
                }
                _ = ticker.tick() => {
                    let snapshot = Snapshot::read(&source, run_start.elapsed());
                    if render_progress_line(&style, &snapshot, no_color).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

struct Snapshot {
    elapsed: Duration,
    total: Duration,
    active: u64,
    max_vus: u64,
    iterations: u64,
}

impl Snapshot {
    fn read(source: &ProgressSource, elapsed: Duration) -> Self {
        Self {
            elapsed: elapsed.min(source.total),
            total: source.total,
            active: source.stats.active(),
            max_vus: source.max_vus,
            iterations: source.stats.iterations(),
        }
    }
}

fn render_progress_line(
    style: &ProgressStyle,
    snapshot: &Snapshot,
    no_color: bool,
) -> Result<(), std::io::Error> {
    let line = build_progress_line(style, snapshot, no_color);

    let mut out = std::io::stderr();
    queue!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine))?;
    for segment in line {
        if let Some(color) = segment.color {
            queue!(
                out,
                SetForegroundColor(color),
                Print(&segment.text),
                ResetColor
            )?;
        } else {
            queue!(out, Print(&segment.text))?;
        }
    }
    out.flush()?;
    Ok(())
}

fn finish_progress_line() -> Result<(), std::io::Error> {
    let mut out = std::io::stderr();
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

fn build_progress_line(
    style: &ProgressStyle,
    snapshot: &Snapshot,
    no_color: bool,
) -> Vec<ProgressSegment> {
    let size = style.size.max(1);
    let goal_ms = snapshot.total.as_millis().max(1);
    let elapsed_ms = snapshot.elapsed.as_millis().min(goal_ms);
    let size_u128 = u128::from(u64::try_from(size).unwrap_or(u64::MAX));

    let scaled = elapsed_ms
        .saturating_mul(size_u128)
        .checked_div(goal_ms)
        .unwrap_or(0);
    let complete_size = usize::try_from(scaled).unwrap_or(size).min(size);
    let incomplete_size = size.saturating_sub(complete_size);

    let percent_x100 = elapsed_ms
        .saturating_mul(10_000)
        .checked_div(goal_ms)
        .unwrap_or(0);
    let percent_text = format!(
        " {}.{:02}%",
        percent_x100.checked_div(100).unwrap_or(0),
        percent_x100.checked_rem(100).unwrap_or(0)
    );

    let elapsed_tenths = elapsed_ms.checked_div(100).unwrap_or(0);
    let time_text = format!(
        " | {}.{}s / {}s",
        elapsed_tenths.checked_div(10).unwrap_or(0),
        elapsed_tenths.checked_rem(10).unwrap_or(0),
        snapshot.total.as_secs()
    );
    let vus_text = format!(
        " | vus {}/{} | iterations {}",
        snapshot.active, snapshot.max_vus, snapshot.iterations
    );

    let progress_bar = format!(
        "{}{}{}{}",
        style.begin,
        style.fill.repeat(complete_size),
        style.empty.repeat(incomplete_size),
        style.end
    );

    if no_color {
        vec![
            ProgressSegment::plain(progress_bar),
            ProgressSegment::plain(percent_text),
            ProgressSegment::plain(time_text),
            ProgressSegment::plain(vus_text),
        ]
    } else {
        vec![
            ProgressSegment::plain(progress_bar),
            ProgressSegment::colored(percent_text, Color::Cyan),
            ProgressSegment::colored(time_text, Color::Yellow),
            ProgressSegment::colored(vus_text, Color::Green),
        ]
    }
}

struct ProgressStyle {
    size: usize,
    begin: String,
    end: String,
    fill: String,
    empty: String,
}

impl ProgressStyle {
    fn new(size: usize) -> Self {
        Self {
            size,
            begin: "[".to_owned(),
            end: "]".to_owned(),
            fill: "#".to_owned(),
            empty: "-".to_owned(),
        }
    }
}

struct ProgressSegment {
    text: String,
    color: Option<Color>,
}

impl ProgressSegment {
    const fn plain(text: String) -> Self {
        Self { text, color: None }
    }

    const fn colored(text: String, color: Color) -> Self {
        Self {
            text,
            color: Some(color),
        }
    }
}
