pub mod checker;
pub mod compile;
pub mod config;
pub mod generator;
pub mod program;
pub mod report;
pub mod session;
pub mod stream;
pub mod verify;

pub use checker::{ACCEPTED, token_checker, with_streams};
pub use compile::{CompileCache, CompileError, Preset, compile};
pub use config::GauntletConfig;
pub use generator::{buffered, from_program, random_ints};
pub use program::{Program, RunError};
pub use session::{LiveStream, Session};
pub use stream::{DEFAULT_DELIMITERS, Scan, ScanValue, Stream, StreamError, StringStream};
pub use verify::{ProfileReport, StressOutcome, profile, stress_test};
