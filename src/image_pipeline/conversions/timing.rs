use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use tracing::debug;

/// Stages of one negative conversion, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    ReadInput,
    Decode,
    Merge,
    Calibrate,
    Transform,
    Profile,
    Header,
    Write,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Step::ReadInput => "read_input",
            Step::Decode => "decode",
            Step::Merge => "merge",
            Step::Calibrate => "calibrate",
            Step::Transform => "transform",
            Step::Profile => "profile",
            Step::Header => "header",
            Step::Write => "write",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StepTiming {
    pub step: Step,
    pub duration: Duration,
}

/// Wall-clock time spent in each step of one run. A step may be recorded
/// more than once; lookups return the accumulated time.
#[derive(Debug, Default)]
pub struct PipelineTimings {
    steps: Vec<StepTiming>,
    totals: HashMap<Step, Duration>,
}

impl PipelineTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(&mut self, step: Step, duration: Duration) {
        self.steps.push(StepTiming { step, duration });
        *self.totals.entry(step).or_insert(Duration::ZERO) += duration;
    }

    pub fn record(&mut self, timer: Timer) {
        let (step, duration) = timer.stop();
        self.add_step(step, duration);
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.duration).sum()
    }

    pub fn get_step(&self, step: Step) -> Option<Duration> {
        self.totals.get(&step).copied()
    }

    pub fn steps(&self) -> &[StepTiming] {
        &self.steps
    }

    pub fn log_summary(&self) {
        let total = self.total_duration().as_secs_f64();
        for timing in &self.steps {
            let seconds = timing.duration.as_secs_f64();
            let share = if total > 0.0 { seconds / total * 100.0 } else { 0.0 };
            debug!(step = %timing.step, "{:>12.3}ms ({:>5.1}%)", seconds * 1000.0, share);
        }
        debug!("total {:>12.3}ms", total * 1000.0);
    }
}

/// Measures one step from `start` until it is recorded.
pub struct Timer {
    started: Instant,
    step: Step,
}

impl Timer {
    pub fn start(step: Step) -> Self {
        Self {
            started: Instant::now(),
            step,
        }
    }

    pub fn stop(self) -> (Step, Duration) {
        (self.step, self.started.elapsed())
    }
}
