use crate::stream::{DEFAULT_DELIMITERS, Stream, StreamError, StringStream};

/// The acceptance threshold: any score strictly below this is a mismatch
/// that stops a stress-test campaign.
pub const ACCEPTED: f64 = 1.0;

/// Lifts a checker written against streams into the plain string shape the
/// verification engine expects.
///
/// The wrapped function sees the trial input, the reference output, and the
/// candidate output as [`StringStream`]s. Any stream error it lets escape
/// becomes a zero score.
pub fn with_streams<F>(check: F) -> impl Fn(&str, &str, &str) -> f64
where
    F: Fn(&mut StringStream, &mut StringStream, &mut StringStream) -> Result<f64, StreamError>,
{
    move |input, expected, actual| {
        let mut input = StringStream::new(input);
        let mut expected = StringStream::new(expected);
        let mut actual = StringStream::new(actual);
        check(&mut input, &mut expected, &mut actual).unwrap_or(0.0)
    }
}

/// The built-in checker: token-by-token equality of the reference and
/// candidate outputs (the trial input is ignored).
///
/// Scores 1.0 iff both outputs yield the same token sequence and exhaust
/// together; any differing token, or one output ending before the other,
/// scores 0.0.
pub fn token_checker(_input: &str, expected: &str, actual: &str) -> f64 {
    let mut expected = StringStream::new(expected);
    let mut actual = StringStream::new(actual);
    loop {
        let want = expected.next_token(DEFAULT_DELIMITERS, true);
        let got = actual.next_token(DEFAULT_DELIMITERS, true);
        match (want.is_empty(), got.is_empty()) {
            (true, true) => return 1.0,
            (false, false) if want == got => continue,
            _ => return 0.0,
        }
    }
}
