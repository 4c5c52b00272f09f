use super::ui;
use crate::core::config::DefaultsConfig;
use crate::core::{CanonicalSeries, Getter, TimeToken};
use anyhow::{Context, Result, anyhow};
use comfy_table::{Cell, CellAlignment, Color};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};

/// An `INTERVAL:PERIOD` pair such as `1wk:1y`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub interval: TimeToken,
    pub period: TimeToken,
}

impl FromStr for RequestSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (interval, period) = s
            .split_once(':')
            .ok_or_else(|| anyhow!("expected INTERVAL:PERIOD such as 1d:1y, got '{s}'"))?;
        Ok(RequestSpec {
            interval: interval.parse()?,
            period: period.parse()?,
        })
    }
}

impl Display for RequestSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.interval, self.period)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FetchArgs {
    pub symbols: Vec<String>,
    /// Data source label. Falls back to the configured default.
    pub source: Option<String>,
    /// Falls back to the configured default interval and period when empty.
    pub requests: Vec<RequestSpec>,
    /// Rows to print per series, from the end.
    pub tail: usize,
    pub dump_cache: bool,
}

struct FetchResult {
    symbol: String,
    request: RequestSpec,
    series: Result<Arc<CanonicalSeries>>,
}

/// Runs every request for every symbol through `getter`, in order, and
/// prints a summary. Later requests are answered from the cache when possible.
pub fn run(getter: &mut Getter, args: &FetchArgs, defaults: &DefaultsConfig) -> Result<()> {
    let requests = if args.requests.is_empty() {
        vec![RequestSpec {
            interval: defaults.interval.parse().context("Invalid default interval")?,
            period: defaults.period.parse().context("Invalid default period")?,
        }]
    } else {
        args.requests.clone()
    };

    if args.symbols.is_empty() {
        println!("No symbols given.");
        return Ok(());
    }

    info!(
        source = getter.label(),
        symbols = args.symbols.len(),
        requests = requests.len(),
        "Fetching series"
    );

    let pb = ui::new_progress_bar((args.symbols.len() * requests.len()) as u64, true);
    let mut results = Vec::with_capacity(args.symbols.len() * requests.len());
    for symbol in &args.symbols {
        for request in &requests {
            pb.set_message(format!("{symbol} {request}"));
            let series = getter
                .get_data(symbol, request.interval.as_str(), request.period.as_str())
                .map_err(anyhow::Error::from);
            if let Err(e) = &series {
                error!(symbol = %symbol, request = %request, error = %e, "Fetch failed");
            }
            results.push(FetchResult {
                symbol: symbol.clone(),
                request: request.clone(),
                series,
            });
            pb.inc(1);
        }
    }
    pb.finish_and_clear();

    print_summary(getter.label(), &results);
    if args.tail > 0 {
        for result in &results {
            if let Ok(series) = &result.series {
                print_tail(result, series, args.tail);
            }
        }
    }

    if args.dump_cache {
        let dump = getter.cache().to_json()?;
        println!("{}", serde_json::to_string_pretty(&dump)?);
    }

    if results.iter().all(|r| r.series.is_err()) {
        anyhow::bail!("All {} request(s) failed", results.len());
    }
    Ok(())
}

fn print_summary(source: &str, results: &[FetchResult]) {
    println!(
        "\nSource: {}",
        ui::style_text(source, ui::StyleType::Title)
    );

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Interval"),
        ui::header_cell("Period"),
        ui::header_cell("Rows"),
        ui::header_cell("From"),
        ui::header_cell("To"),
        ui::header_cell("Last Open"),
        ui::header_cell("Dividends"),
    ]);

    let mut errors = Vec::new();
    for result in results {
        let mut row = vec![
            Cell::new(&result.symbol),
            Cell::new(&result.request.interval),
            Cell::new(&result.request.period),
        ];
        match &result.series {
            Ok(series) => {
                let date = |ts: Option<chrono::DateTime<chrono::Utc>>| {
                    ts.map_or(ui::na_cell(false), |ts| Cell::new(ts.format("%Y-%m-%d %H:%M")))
                };
                row.push(Cell::new(series.len()).set_alignment(CellAlignment::Right));
                row.push(date(series.first().map(|r| r.timestamp)));
                row.push(date(series.last().map(|r| r.timestamp)));
                row.push(
                    series
                        .last()
                        .map_or(ui::na_cell(false), |r| ui::price_cell(r.price)),
                );
                row.push(ui::dividend_cell(series.dividends().sum()));
            }
            Err(e) => {
                row.push(Cell::new("0").fg(Color::Red).set_alignment(CellAlignment::Right));
                for _ in 0..4 {
                    row.push(ui::na_cell(true));
                }
                errors.push(format!("{} {}: {e:#}", result.symbol, result.request));
            }
        }
        table.add_row(row);
    }
    println!("{table}");

    for e in errors {
        println!("{}", ui::style_text(&e, ui::StyleType::Error));
    }
}

fn print_tail(result: &FetchResult, series: &CanonicalSeries, tail: usize) {
    println!(
        "\n{} {}",
        ui::style_text(&result.symbol, ui::StyleType::Title),
        ui::style_text(&result.request.to_string(), ui::StyleType::Subtle)
    );

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Timestamp"),
        ui::header_cell("Open"),
        ui::header_cell("Dividend"),
    ]);
    let skip = series.len().saturating_sub(tail);
    for row in &series.rows()[skip..] {
        table.add_row(vec![
            Cell::new(row.timestamp.format("%Y-%m-%d %H:%M")),
            ui::price_cell(row.price),
            ui::dividend_cell(row.dividend),
        ]);
    }
    println!("{table}");
}
