pub mod cancel;
pub mod classifier;
pub mod error;
pub mod generator;
pub mod limiter;
pub mod prober;
pub mod recursion;
pub mod result;
pub mod scanner;
pub mod scheduler;
pub mod state;
pub mod target;
pub mod wordlist;

pub use cancel::CancelSignal;
pub use classifier::{Baseline, Classifier, InterestingStatus};
pub use error::{NetworkError, NetworkErrorKind, ScanError};
pub use generator::{Candidate, CandidateKind, CandidateSources, Generator, Origin};
pub use prober::{ProbeMethod, ProbeOutcome, Prober, ProberOptions, RawResponse};
pub use recursion::{DirState, RecursionController};
pub use result::{Classification, ProbeResult, ScanEvent, ScanReport, ScanWarning};
pub use scanner::{ScanConfig, Scanner};
pub use scheduler::Scheduler;
pub use state::{RunSnapshot, RunState};
pub use target::Target;
pub use wordlist::{DirectorySet, ExtensionSet, Wordlist};
