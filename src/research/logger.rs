use colored::Colorize;
use serde::Serialize;

use crate::{
    Booster,
    Dataset,
    error::Result,
};

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

pub(super) const DEFAULT_ROUND: usize = 100;
pub(super) const DEFAULT_TIMELIMIT_MILLIS: u128 = u128::MAX;
const WIDTH: usize = 8;
const PREC_WIDTH: usize = 5;
const FULL_WIDTH: usize = 60;
const STAT_WIDTH: usize = (FULL_WIDTH - 4) / 2;
const HEADER: &str = "round,objective,millis\n";


/// One row of the trace recorded by [`Logger`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoundRecord {
    /// One-based round number.
    pub round: usize,
    /// Objective value after the round, `NaN` if the driver has none.
    pub objective: f64,
    /// Cumulative running time in milliseconds.
    pub millis: u128,
}


/// Struct `Logger` drives a [`Booster`] round by round,
/// recording the objective value and the running time of each round.
pub struct Logger<'a, B> {
    pub(super) booster: B,
    pub(super) train: &'a Dataset,
    pub(super) time_limit: u128,
    pub(super) round: usize,
    pub(super) trace: Vec<RoundRecord>,
}


impl<'a, B> Logger<'a, B> {
    /// Create a new instance of `Logger`.
    pub fn new(booster: B, train: &'a Dataset) -> Self {
        Self {
            booster,
            train,
            time_limit: DEFAULT_TIMELIMIT_MILLIS,
            round: DEFAULT_ROUND,
            trace: Vec::new(),
        }
    }


    /// The trace of the last run.
    pub fn trace(&self) -> &[RoundRecord] {
        &self.trace[..]
    }
}


impl<B: Booster> Logger<'_, B> {
    /// Set the time limit for boosting algorithm as milliseconds.
    /// If the boosting algorithm reaches this limit,
    /// breaks immediately.
    #[inline(always)]
    pub fn time_limit_as_millis(mut self, time_limit: u128) -> Self {
        self.time_limit = time_limit;
        self
    }


    /// Set the time limit for boosting algorithm as seconds.
    #[inline(always)]
    pub fn time_limit_as_secs(mut self, time_limit: u64) -> Self {
        self.time_limit = (time_limit as u128).saturating_mul(1_000);
        self
    }


    /// Set the interval to print the current status.
    /// By default, the method `run` prints its status every `100` rounds.
    /// If you don't want to print the log,
    /// set `usize::MAX`.
    #[inline(always)]
    pub fn print_every(mut self, round: usize) -> Self {
        self.round = round;
        self
    }


    #[inline(always)]
    fn print_log_header(&self) {
        println!(
            "      {:>WIDTH$}\t\t{:>WIDTH$}\t{:>WIDTH$}",
            "".bold().red(),
            "OBJ.".bold().blue(),
            "ACC.".bold().cyan(),
        );
        println!(
            "      {:>WIDTH$}\t\t{:>WIDTH$}\t{:>WIDTH$}\n",
            "ROUND".bold().red(),
            "VALUE".bold().blue(),
            "TIME".bold().cyan(),
        );
    }


    /// print current settings.
    #[inline(always)]
    fn print_stats(&self) {
        let limit = if self.time_limit != u128::MAX {
            time_format(self.time_limit)
        } else {
            "Nothing".into()
        };
        let header = format!(
            "{:=>FULL_WIDTH$}\n{:^FULL_WIDTH$}\n{:->FULL_WIDTH$}",
            "", "STATS".bold(), "",
        );
        println!(
            "\n{header}\n\
            + {:<STAT_WIDTH$}\t{:>STAT_WIDTH$}",
            "Booster".bold(),
            self.booster.name().bold().green(),
        );

        if let Some(info) = self.booster.info() {
            let line = info.into_iter()
                .map(|(key, val)| {
                    format!(
                        "    + {:<STAT_WIDTH$}\t{:>width$}",
                        key,
                        val.bold().yellow(),
                        width = STAT_WIDTH - 8
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            println!("{line}");
        }
        println!(
            "\
            + {:<STAT_WIDTH$}\t{:>STAT_WIDTH$}\n\
            {:=^FULL_WIDTH$}\n\
            ",
            "Time Limit".bold(),
            limit.bold().green(),
            "".bold(),
        );
    }


    /// Run the booster with logging.
    /// This method is almost the same as [`Booster::run`],
    /// but measures running time per round.
    pub fn run(&mut self) -> Result<B::Output> {
        self.drive(None)
    }


    /// Same as [`Logger::run`],
    /// but also writes the trace to `filename` as CSV
    /// with columns `round,objective,millis`.
    pub fn run_with_csv<P: AsRef<Path>>(&mut self, filename: P)
        -> Result<B::Output>
    {
        let mut file = BufWriter::new(File::create(filename)?);
        file.write_all(HEADER.as_bytes())?;
        let f = self.drive(Some(&mut file))?;
        file.flush()?;
        Ok(f)
    }


    fn drive(&mut self, mut file: Option<&mut BufWriter<File>>)
        -> Result<B::Output>
    {
        // ---------------------------------------------------------------------
        // Pre-processing
        self.booster.initialize(self.train)?;
        self.print_stats();
        self.trace.clear();

        // Cumulative time
        let mut time_acc = 0;

        // ---------------------------------------------------------------------
        // Boosting step
        if self.round != usize::MAX { self.print_log_header(); }
        for iter in 1_usize.. {
            let now = Instant::now();

            let flow = self.booster.step()?;

            time_acc += now.elapsed().as_millis();

            let obj = self.booster.objective().unwrap_or(f64::NAN);
            self.trace.push(RoundRecord { round: iter, objective: obj, millis: time_acc });

            if let Some(file) = file.as_deref_mut() {
                writeln!(file, "{iter},{obj},{time_acc}")?;
            }

            if time_acc > self.time_limit {
                println!(
                    "{} {}\t\t{}\t{}\n",
                    "[TLE]".bold().bright_red(),
                    format!("{:>WIDTH$}", iter).bold().red(),
                    format!("{:>WIDTH$.PREC_WIDTH$}", obj).bold().blue(),
                    time_format(time_acc).bold().cyan(),
                );
                break;
            }

            if self.round != usize::MAX && iter % self.round == 0 {
                println!(
                    "{} {}\t\t{}\t{}",
                    "[LOG]".bold().magenta(),
                    format!("{:>WIDTH$}", iter).red(),
                    format!("{:>WIDTH$.PREC_WIDTH$}", obj).blue(),
                    time_format(time_acc).bold().cyan(),
                );
            }

            if flow.is_break() {
                if self.round != usize::MAX {
                    println!(
                        "{} {}\t\t{}\t{}\n",
                        "[FIN]".bold().bright_green(),
                        format!("{:>WIDTH$}", iter).red(),
                        format!("{:>WIDTH$.PREC_WIDTH$}", obj).bold().blue(),
                        time_format(time_acc).bold().cyan(),
                    );
                }
                break;
            }
        }

        self.booster.finalize()
    }
}


fn time_format(millisec: u128) -> String {
    if millisec < 1_000 {
        return format!("  0.{:0>3}s", millisec);
    }
    let sec = millisec / 1_000;
    let millisec = millisec % 1_000;
    if sec < 60 {
        return format!(" {:0>2}.{:0>3}s", sec, millisec);
    }
    let min = sec / 60;
    let sec = sec % 60;
    if min < 60 {
        return format!(" {:0>2}m {:0>2}s", min, sec);
    }
    let hours = min / 60;
    let min = min % 60;
    format!(" {:0>2}h {:0>2}m", hours, min)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AdditiveRegression, Attribute, Instance, Schema};

    #[test]
    fn time_is_formatted_by_magnitude() {
        assert_eq!(time_format(42), "  0.042s");
        assert_eq!(time_format(61_000), " 01m 01s");
    }

    #[test]
    fn csv_trace_has_one_row_per_round() {
        let schema = Schema::new(
            "line",
            vec![Attribute::numeric("x")],
            Attribute::numeric("y"),
        ).unwrap();
        let instances = (0..10)
            .map(|i| Instance::new(vec![i as f64], 2.0 * i as f64))
            .collect();
        let data = Dataset::from_instances(schema, instances).unwrap();

        let booster = AdditiveRegression::default().num_iterations(5);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.csv");
        let mut logger = Logger::new(booster.driver(), &data)
            .print_every(usize::MAX);
        let f = logger.run_with_csv(&path).unwrap();

        let csv = std::fs::read_to_string(&path).unwrap();
        let lines = csv.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "round,objective,millis");
        assert_eq!(lines.len(), logger.trace().len() + 1);
        assert_eq!(f.measure_num_iterations(), 5);
    }
}
