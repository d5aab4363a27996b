//! Mock model implementations for testing
//!
//! These models don't denoise anything. They honour the model contract
//! (silence in, silence out, output at the model output rate) and record how
//! they were called, so the session's locking and lifecycle can be verified.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::model::{expected_output_len, DenoiseModel, ModelType};
use crate::error::{DenoiseError, Result};

/// One recorded call into a mock model or loader
#[derive(Debug, Clone)]
pub struct CallSpan {
    pub label: String,
    pub operation: &'static str,
    pub enter: Instant,
    pub exit: Instant,
}

impl CallSpan {
    pub fn overlaps(&self, other: &CallSpan) -> bool {
        self.enter < other.exit && other.enter < self.exit
    }
}

/// Shared log of call intervals
#[derive(Debug, Clone, Default)]
pub struct CallJournal {
    spans: Arc<Mutex<Vec<CallSpan>>>,
}

impl CallJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f`, recording when it started and finished
    pub fn record<T>(&self, label: &str, operation: &'static str, f: impl FnOnce() -> T) -> T {
        let enter = Instant::now();
        let result = f();
        let exit = Instant::now();

        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CallSpan {
                label: label.to_string(),
                operation,
                enter,
                exit,
            });

        result
    }

    pub fn spans(&self) -> Vec<CallSpan> {
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// First pair of recorded calls whose intervals intersect
    pub fn find_overlap(&self) -> Option<(CallSpan, CallSpan)> {
        let spans = self.spans();
        for (i, a) in spans.iter().enumerate() {
            for b in &spans[i + 1..] {
                if a.overlaps(b) {
                    return Some((a.clone(), b.clone()));
                }
            }
        }
        None
    }
}

/// Call counters shared between a mock model and the test holding it
#[derive(Debug, Default)]
pub struct MockStats {
    pub process_calls: AtomicUsize,
    pub reset_calls: AtomicUsize,
    pub close_calls: AtomicUsize,
}

impl MockStats {
    pub fn processed(&self) -> usize {
        self.process_calls.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.reset_calls.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

/// Configurable mock model
pub struct MockModel {
    label: String,
    delay: Duration,
    fail_process: bool,
    fail_reset: bool,
    output_len_override: Option<usize>,
    journal: Option<CallJournal>,
    stats: Arc<MockStats>,
}

impl MockModel {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            delay: Duration::ZERO,
            fail_process: false,
            fail_reset: false,
            output_len_override: None,
            journal: None,
            stats: Arc::new(MockStats::default()),
        }
    }

    /// Sleep this long inside every `process` call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_journal(mut self, journal: CallJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn failing_process(mut self) -> Self {
        self.fail_process = true;
        self
    }

    pub fn failing_reset(mut self) -> Self {
        self.fail_reset = true;
        self
    }

    /// Return this many samples regardless of input, breaking the contract
    pub fn with_output_len(mut self, len: usize) -> Self {
        self.output_len_override = Some(len);
        self
    }

    pub fn stats(&self) -> Arc<MockStats> {
        Arc::clone(&self.stats)
    }

    fn run_process(&self, input: &[f32]) -> Result<Vec<f32>> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if self.fail_process {
            return Err(DenoiseError::inference(format!(
                "{} failed on {} samples (MOCK)",
                self.label,
                input.len()
            )));
        }

        let len = self
            .output_len_override
            .unwrap_or_else(|| expected_output_len(input.len()));

        // Sample-and-hold upsampling keeps silence silent
        let mut output = Vec::with_capacity(len);
        for i in 0..len {
            let source = if input.is_empty() {
                0.0
            } else {
                input[(i * input.len() / len.max(1)).min(input.len() - 1)]
            };
            output.push(source);
        }
        Ok(output)
    }
}

impl DenoiseModel for MockModel {
    fn name(&self) -> &str {
        &self.label
    }

    fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        self.stats.process_calls.fetch_add(1, Ordering::SeqCst);
        match &self.journal {
            Some(journal) => journal.record(&self.label, "process", || self.run_process(input)),
            None => self.run_process(input),
        }
    }

    fn reset(&mut self) -> Result<()> {
        self.stats.reset_calls.fetch_add(1, Ordering::SeqCst);
        let run = || {
            if self.fail_reset {
                return Err(DenoiseError::inference(format!(
                    "{} reset failed (MOCK)",
                    self.label
                )));
            }
            Ok(())
        };
        match &self.journal {
            Some(journal) => journal.record(&self.label, "reset", run),
            None => run(),
        }
    }

    fn close(&mut self) {
        self.stats.close_calls.fetch_add(1, Ordering::SeqCst);
        // releasing takes as long as a process call, so a swap has a visible span
        let run = || {
            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
        };
        match &self.journal {
            Some(journal) => journal.record(&self.label, "close", run),
            None => run(),
        }
    }
}

/// Loader producing mock models, recording each load in a journal
///
/// Loads of types listed in `failing` return `ModelLoad`.
pub struct MockLoader {
    journal: CallJournal,
    load_delay: Duration,
    process_delay: Duration,
    failing: Vec<ModelType>,
    loads: AtomicUsize,
    produced: Mutex<Vec<Arc<MockStats>>>,
}

impl MockLoader {
    pub fn new(journal: CallJournal) -> Self {
        Self {
            journal,
            load_delay: Duration::ZERO,
            process_delay: Duration::ZERO,
            failing: Vec::new(),
            loads: AtomicUsize::new(0),
            produced: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delays(mut self, load: Duration, process: Duration) -> Self {
        self.load_delay = load;
        self.process_delay = process;
        self
    }

    pub fn failing_for(mut self, model_type: ModelType) -> Self {
        self.failing.push(model_type);
        self
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Stats of every model this loader produced, in load order
    pub fn produced(&self) -> Vec<Arc<MockStats>> {
        self.produced
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl super::loader::ModelLoader for MockLoader {
    fn load(&self, model_type: ModelType) -> Result<Box<dyn DenoiseModel>> {
        self.journal.record(model_type.as_str(), "load", || {
            if !self.load_delay.is_zero() {
                std::thread::sleep(self.load_delay);
            }
            self.loads.fetch_add(1, Ordering::SeqCst);

            if self.failing.contains(&model_type) {
                return Err(DenoiseError::model_load(
                    model_type.file_stem(),
                    "weights unavailable (MOCK)",
                ));
            }

            let model = MockModel::new(model_type.as_str())
                .with_delay(self.process_delay)
                .with_journal(self.journal.clone());
            self.produced
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(model.stats());

            Ok(Box::new(model) as Box<dyn DenoiseModel>)
        })
    }
}
