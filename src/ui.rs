// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Terminal reporting of run results.

use owo_colors::OwoColorize;
use std::time::Duration;

use crate::executor::RunResult;

/// Format a Duration into a human-readable string
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs_f64();

    if total_seconds < 1.0 {
        format!("{:.1} ms", duration.as_secs_f64() * 1000.0)
    } else if total_seconds < 60.0 {
        format!("{total_seconds:.2} s")
    } else {
        let minutes = duration.as_secs() / 60;
        let seconds = duration.as_secs() % 60;
        if seconds == 0 {
            format!("{minutes}m")
        } else {
            format!("{minutes}m {seconds}s")
        }
    }
}

pub struct OutputFormatter;

impl OutputFormatter {
    /// Render the end-of-run summary: failed hosts with reasons, skipped
    /// hosts, then the counts.
    pub fn format_summary(run: &RunResult, elapsed: Duration) -> String {
        let mut output = String::new();

        for failure in &run.failures {
            let symbol = if failure.reason.is_cancelled() {
                "●".yellow().to_string()
            } else {
                "●".red().to_string()
            };
            output.push_str(&format!(
                "{} {}: {}\n",
                symbol,
                failure.host.bold(),
                failure.reason.to_string().dimmed()
            ));
        }

        for host in &run.not_started {
            output.push_str(&format!(
                "{} {}: {}\n",
                "○".dimmed(),
                host.bold(),
                "not started (run cancelled)".dimmed()
            ));
        }

        let status = if run.is_success() {
            "●".green().to_string()
        } else {
            "●".red().to_string()
        };
        output.push_str(&format!(
            "{} {} succeeded, {} failed",
            status,
            run.succeeded.to_string().green(),
            run.failed().to_string().red()
        ));
        if !run.not_started.is_empty() {
            output.push_str(&format!(
                ", {} not started",
                run.not_started.len().to_string().yellow()
            ));
        }
        output.push_str(&format!(" in {}\n", format_duration(elapsed)));

        output
    }

    pub fn print_summary(run: &RunResult, elapsed: Duration) {
        eprint!("{}", Self::format_summary(run, elapsed));
    }
}
