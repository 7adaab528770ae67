//! Presentation state for the triage front end.
//!
//! [`ViewModel`] is a small state machine over two views, [`View::Landing`] and
//! [`View::Classifying`], driven by discrete [`ShellEvent`]s. It reaches the inference core only
//! through [`EmailClassifier`], so any front end (terminal, web, tests) can drive it.

use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use log::warn;
use serde::Serialize;

use crate::classifier::{ClassificationResult, ClassifierError, EmailClassifier};
use crate::confidence::ConfidenceTier;
use crate::routing::DepartmentRoute;
use crate::runtime::Device;

/// A canned email for quick testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleEmail {
    pub title: &'static str,
    pub subject: &'static str,
    pub body: &'static str,
}

pub const SAMPLE_EMAILS: [SampleEmail; 5] = [
    SampleEmail {
        title: "Admission Inquiry",
        subject: "Application for Computer Science Program",
        body: "Hello, I would like to know the admission requirements for the Computer Science program. \
               What are the deadlines for the next semester? I have completed my A-levels and would like \
               to apply. Thank you.",
    },
    SampleEmail {
        title: "Fees Payment Issue",
        subject: "Payment Not Reflecting",
        body: "I need urgent help with my school fees payment. I made a payment yesterday through the \
               online portal but it's not reflecting in my account. My student ID is 2024001. Please \
               assist as soon as possible.",
    },
    SampleEmail {
        title: "Grade Issue",
        subject: "Error in Semester Results",
        body: "There seems to be an error in my semester results. My grade for Mathematics doesn't match \
               what I expected based on my continuous assessment scores. Can you please review this? My \
               registration number is ENG/2023/456.",
    },
    SampleEmail {
        title: "Hostel Accommodation",
        subject: "Hostel Allocation Request",
        body: "I would like to request accommodation in the school hostel for next semester. What is the \
               application process and what documents do I need to submit? Also, what are the \
               accommodation fees?",
    },
    SampleEmail {
        title: "Transcript Request",
        subject: "Urgent Transcript Request",
        body: "I need my official transcript for a job application. The deadline is in two weeks. How long \
               does it take to process and what are the fees? Please let me know the fastest way to get \
               this done.",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Landing,
    Classifying,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    GoHome,
    OpenClassifier,
    /// Fills subject and body from `SAMPLE_EMAILS[i]`
    PickSample(usize),
    SetSubject(String),
    SetBody(String),
    Clear,
    Submit,
}

/// Everything rendered for one successful classification.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    #[serde(flatten)]
    pub result: ClassificationResult,
    pub route: DepartmentRoute,
    pub tier: ConfidenceTier,
    pub labels: Vec<String>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl Report {
    pub fn new(result: ClassificationResult, labels: Vec<String>, elapsed: Duration) -> Self {
        Self {
            route: result.route(),
            tier: result.tier(),
            result,
            labels,
            elapsed,
        }
    }

    /// Plain-text result card with a probability chart of the top `top` classes.
    pub fn render(&self, top: usize) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} {}", self.route.icon, self.result.category);
        let _ = writeln!(
            out,
            "  Confidence: {:.1}% ({})",
            self.result.confidence * 100.0,
            self.tier
        );
        let _ = writeln!(out, "  Route to:   {}", self.route.department);
        let _ = writeln!(out, "              {}", self.route.description);
        let _ = writeln!(out, "  Processed in {} ms", self.elapsed.as_millis());
        let _ = writeln!(out, "  Probabilities:");
        for (label, p) in self.result.ranked(&self.labels).into_iter().take(top) {
            let bar = "█".repeat((p * 30.0).round() as usize);
            let _ = writeln!(out, "    {:<24} {:>5.1}% {}", label, p * 100.0, bar);
        }
        out
    }
}

/// Message shown instead of, or next to, the last report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Both fields were blank; ask for text
    EmptyInput,
    /// The classify attempt failed but may succeed on retry; the previous report, if any, is kept
    Failed(String),
    /// The classifier is unusable (missing artifacts, broken label registry)
    Unavailable(String),
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Self::EmptyInput => "Please enter a subject or email body before classifying.".to_string(),
            Self::Failed(reason) => format!("Classification failed: {}", reason),
            Self::Unavailable(reason) => format!("Classifier unavailable: {}", reason),
        }
    }
}

#[derive(Debug)]
pub struct ViewModel {
    view: View,
    subject: String,
    body: String,
    report: Option<Report>,
    notice: Option<Notice>,
}

impl Default for ViewModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewModel {
    pub fn new() -> Self {
        Self {
            view: View::Landing,
            subject: String::new(),
            body: String::new(),
            report: None,
            notice: None,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Applies one user event. Editing and submitting only act in the classifier view.
    pub fn handle(&mut self, event: ShellEvent, classifier: &dyn EmailClassifier) {
        match (self.view, event) {
            (_, ShellEvent::GoHome) => self.view = View::Landing,
            (_, ShellEvent::OpenClassifier) => self.view = View::Classifying,
            (View::Landing, _) => {}
            (View::Classifying, ShellEvent::PickSample(i)) => match SAMPLE_EMAILS.get(i) {
                Some(sample) => {
                    self.subject = sample.subject.to_string();
                    self.body = sample.body.to_string();
                }
                None => warn!("No sample email at index {}", i),
            },
            (View::Classifying, ShellEvent::SetSubject(subject)) => self.subject = subject,
            (View::Classifying, ShellEvent::SetBody(body)) => self.body = body,
            (View::Classifying, ShellEvent::Clear) => {
                self.subject.clear();
                self.body.clear();
                self.report = None;
                self.notice = None;
            }
            (View::Classifying, ShellEvent::Submit) => self.submit(classifier),
        }
    }

    fn submit(&mut self, classifier: &dyn EmailClassifier) {
        let start = Instant::now();
        let outcome = classifier
            .classify(&self.subject, &self.body)
            .and_then(|result| Ok((result, classifier.class_labels()?)));
        match outcome {
            Ok((result, labels)) => {
                self.report = Some(Report::new(result, labels, start.elapsed()));
                self.notice = None;
            }
            Err(ClassifierError::EmptyInputError) => self.notice = Some(Notice::EmptyInput),
            Err(e) if e.is_recoverable() => self.notice = Some(Notice::Failed(e.to_string())),
            Err(e) => self.notice = Some(Notice::Unavailable(e.to_string())),
        }
    }
}

type CpuLoader = Box<dyn Fn() -> Result<Arc<dyn EmailClassifier>, ClassifierError> + Send + Sync>;

/// Retries a failed forward pass once on a CPU-only classifier when the primary runs on an
/// accelerator.
///
/// The CPU classifier is loaded on the first failure and reused afterwards. A failed CPU load
/// is remembered and reported as an `InferenceError` on later failures too.
pub struct CpuFallback<P> {
    primary: P,
    device: Device,
    load_cpu: CpuLoader,
    cpu: OnceLock<Result<Arc<dyn EmailClassifier>, String>>,
}

impl<P: EmailClassifier> CpuFallback<P> {
    /// Wraps `primary`, which runs on `device`. `load_cpu` builds the CPU classifier on demand.
    pub fn new<F>(primary: P, device: Device, load_cpu: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn EmailClassifier>, ClassifierError> + Send + Sync + 'static,
    {
        Self {
            primary,
            device,
            load_cpu: Box::new(load_cpu),
            cpu: OnceLock::new(),
        }
    }

    fn retry(&self, subject: &str, body: &str) -> Result<ClassificationResult, ClassifierError> {
        let cpu = self.cpu.get_or_init(|| {
            warn!("Loading CPU fallback classifier");
            (self.load_cpu)().map_err(|e| e.to_string())
        });
        match cpu {
            Ok(classifier) => classifier.classify(subject, body),
            Err(e) => Err(ClassifierError::InferenceError(format!("CPU fallback unavailable: {}", e))),
        }
    }
}

impl<P: EmailClassifier> EmailClassifier for CpuFallback<P> {
    fn classify(&self, subject: &str, body: &str) -> Result<ClassificationResult, ClassifierError> {
        match self.primary.classify(subject, body) {
            Err(ClassifierError::InferenceError(reason)) if self.device != Device::Cpu => {
                warn!("Inference failed on {} ({}), retrying on CPU", self.device, reason);
                self.retry(subject, body)
            }
            other => other,
        }
    }

    fn class_labels(&self) -> Result<Vec<String>, ClassifierError> {
        self.primary.class_labels()
    }
}
