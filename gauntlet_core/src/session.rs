use crate::program::{Program, RunError};
use crate::stream::{Stream, StreamError};
use std::io::{self, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

/// A [`Stream`] over the live stdout of a running process.
///
/// A dedicated reader thread pumps the pipe one byte at a time into an mpsc
/// channel; this view pulls from the receiving end. `peek_char` blocks until
/// a character is available. The stream is exhausted once the process has
/// closed its stdout and every buffered character has been consumed.
#[derive(Debug)]
pub struct LiveStream {
    rx: Receiver<char>,
    head: Option<char>,
}

impl LiveStream {
    fn new(rx: Receiver<char>) -> Self {
        LiveStream { rx, head: None }
    }
}

impl Stream for LiveStream {
    fn has_more(&mut self) -> bool {
        if self.head.is_some() {
            return true;
        }
        match self.rx.try_recv() {
            Ok(c) => {
                self.head = Some(c);
                true
            }
            // Producer still alive: more may come, though peek_char may
            // block waiting for it.
            Err(TryRecvError::Empty) => true,
            Err(TryRecvError::Disconnected) => false,
        }
    }

    fn peek_char(&mut self) -> Result<char, StreamError> {
        match self.head {
            Some(c) => Ok(c),
            None => {
                let c = self.rx.recv().map_err(|_| StreamError::Exhausted)?;
                self.head = Some(c);
                Ok(c)
            }
        }
    }

    fn pop_char(&mut self) {
        self.head = None;
    }
}

fn pump_stdout(mut stdout: impl Read + Send + 'static, tx: Sender<char>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut byte = [0u8; 1];
        loop {
            match stdout.read(&mut byte) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if tx.send(byte[0] as char).is_err() {
                        break;
                    }
                }
            }
        }
        // Dropping the sender here is the exhaustion signal.
    })
}

fn forward_stderr(mut stderr: impl Read + Send + 'static, tag: String) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut buf = [0u8; 1024];
        let mut at_line_start = true;
        loop {
            let n = match stderr.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            let chunk = String::from_utf8_lossy(&buf[..n]);
            if at_line_start {
                eprint!("[{tag}] ");
            }
            eprint!("{chunk}");
            at_line_start = chunk.ends_with('\n');
            let _ = io::stderr().flush();
        }
    })
}

/// A running child process bundled with its background I/O threads.
///
/// Constructed through [`Program::interact`], which scopes the session to a
/// closure: when the closure returns, normally or by panic, the child is
/// terminated if still running and both threads are joined.
#[derive(Debug)]
pub struct Session {
    label: String,
    child: Child,
    stdin: Option<ChildStdin>,
    output: LiveStream,
    stdout_pump: Option<JoinHandle<()>>,
    stderr_pump: Option<JoinHandle<()>>,
}

impl Session {
    /// Spawns the program with all three standard streams redirected and
    /// starts the stdout pump and stderr forwarder.
    pub fn spawn(program: &Program) -> Result<Session, RunError> {
        let label = program.path().display().to_string();
        let mut child = Command::new(program.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RunError::Launch {
                program: label.clone(),
                source,
            })?;

        let stdin = child.stdin.take();
        let missing_pipe = |child: &mut Child, which: &str| {
            let _ = child.kill();
            let _ = child.wait();
            RunError::Io {
                program: label.clone(),
                source: io::Error::other(format!("{which} pipe missing after spawn")),
            }
        };
        let stdout = match child.stdout.take() {
            Some(pipe) => pipe,
            None => return Err(missing_pipe(&mut child, "stdout")),
        };
        let stderr = match child.stderr.take() {
            Some(pipe) => pipe,
            None => return Err(missing_pipe(&mut child, "stderr")),
        };

        let (tx, rx) = mpsc::channel();
        let stdout_pump = pump_stdout(stdout, tx);
        let stderr_pump = forward_stderr(stderr, label.clone());

        Ok(Session {
            label,
            child,
            stdin,
            output: LiveStream::new(rx),
            stdout_pump: Some(stdout_pump),
            stderr_pump: Some(stderr_pump),
        })
    }

    /// Writes one line to the child's stdin and flushes immediately.
    pub fn send_line(&mut self, line: &str) -> Result<(), RunError> {
        let stdin = self.stdin.as_mut().ok_or_else(|| RunError::Io {
            program: self.label.clone(),
            source: io::Error::other("child stdin already closed"),
        })?;
        let write = writeln!(stdin, "{line}").and_then(|_| stdin.flush());
        write.map_err(|source| RunError::Io {
            program: self.label.clone(),
            source,
        })
    }

    /// The live view over the child's stdout.
    pub fn output(&mut self) -> &mut LiveStream {
        &mut self.output
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Closing stdin first lets a well-behaved child finish on its own.
        self.stdin.take();
        if !matches!(self.child.try_wait(), Ok(Some(_))) {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
        if let Some(pump) = self.stdout_pump.take() {
            let _ = pump.join();
        }
        if let Some(pump) = self.stderr_pump.take() {
            let _ = pump.join();
        }
    }
}

impl Program {
    /// Runs `body` against an interactive session of this program.
    ///
    /// The session lives exactly as long as the closure: on any exit path,
    /// including a panic inside `body`, the child is terminated and both
    /// background threads are joined before control leaves this function.
    pub fn interact<R>(&self, body: impl FnOnce(&mut Session) -> R) -> Result<R, RunError> {
        let mut session = Session::spawn(self)?;
        Ok(body(&mut session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::test_target;
    use crate::stream::DEFAULT_DELIMITERS;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    #[test]
    fn session_round_trips_a_line() {
        let program = Program::new(test_target("greeter.sh"));
        let greeting = program
            .interact(|session| {
                session.send_line("world").unwrap();
                let out = session.output();
                let first = out.next_token(DEFAULT_DELIMITERS, true);
                let second = out.next_token(DEFAULT_DELIMITERS, true);
                (first, second)
            })
            .unwrap();
        assert_eq!(greeting, ("hello".to_string(), "world".to_string()));
    }

    #[test]
    fn session_supports_adaptive_exchanges() {
        let program = Program::new(test_target("greeter.sh"));
        program
            .interact(|session| {
                for name in ["ada", "grace"] {
                    session.send_line(name).unwrap();
                    let out = session.output();
                    assert_eq!(out.next_token(DEFAULT_DELIMITERS, true), "hello");
                    assert_eq!(out.next_token(DEFAULT_DELIMITERS, true), name);
                }
            })
            .unwrap();
    }

    #[test]
    fn live_stream_exhausts_when_process_closes_stdout() {
        let program = Program::new(test_target("hello.sh"));
        program
            .interact(|session| {
                let out = session.output();
                assert_eq!(out.next_token(DEFAULT_DELIMITERS, true), "hello");
                assert_eq!(out.next_token(DEFAULT_DELIMITERS, true), "world");
                // The script has exited; the pump drains and disconnects.
                assert_eq!(out.next_token(DEFAULT_DELIMITERS, true), "");
                assert_eq!(out.peek_char(), Err(StreamError::Exhausted));
                assert!(!out.has_more());
            })
            .unwrap();
    }

    #[test]
    fn live_stream_parses_integers() {
        let program = Program::new(test_target("numbers.sh"));
        let value = program
            .interact(|session| session.output().next_int(true))
            .unwrap();
        assert_eq!(value, Ok(42));
    }

    #[test]
    fn session_cleans_up_when_the_closure_panics() {
        let program = Program::new(test_target("greeter.sh"));
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let _ = program.interact(|session| {
                session.send_line("boom").unwrap();
                panic!("caller gave up");
            });
        }));
        assert!(outcome.is_err());
        // The process and threads are gone; a fresh session must work.
        program
            .interact(|session| {
                session.send_line("again").unwrap();
                assert_eq!(
                    session.output().next_token(DEFAULT_DELIMITERS, true),
                    "hello"
                );
            })
            .unwrap();
    }

    #[test]
    fn spawn_failure_is_a_launch_error() {
        let program = Program::new("./definitely_not_here_31415");
        match Session::spawn(&program) {
            Err(RunError::Launch { .. }) => {}
            other => panic!("expected a launch error, got {other:?}"),
        }
    }
}
