use thiserror::Error;

/// Whitespace characters skipped by the `skip_whitespace` flavor of the
/// derived parsing helpers.
const WHITESPACE: &str = " \t\r\n";

/// Decimal digits accepted by [`Stream::next_int`].
const NUMERIC: &str = "0123456789";

/// Delimiters used by token parsing when callers have no special needs.
pub const DEFAULT_DELIMITERS: &str = " \t\n";

/// Errors that can occur while pulling characters or decoded values from a
/// [`Stream`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    /// The stream ended before the requested character or value could be read.
    ///
    /// Callers expecting optional trailing fields may recover from this;
    /// inside a checker it is converted to a zero score.
    #[error("stream exhausted while reading")]
    Exhausted,

    /// An integer was requested but no digits were present at the cursor.
    #[error("expected an integer, found no digits")]
    MalformedInt,

    /// A digit run parsed fine but its value does not fit in an `i64`.
    #[error("integer out of range")]
    IntOutOfRange,
}

/// A pull-based sequential character source.
///
/// Implementors provide the three primitives (`has_more`, `peek_char`,
/// `pop_char`); every derived helper is built solely on those, so it behaves
/// identically whether the source is an in-memory string
/// ([`StringStream`](crate::stream::StringStream)) or a live process
/// ([`LiveStream`](crate::session::LiveStream)). The two differ only in
/// blocking behavior: a live stream's `peek_char` may block until the child
/// process produces output.
pub trait Stream {
    /// Returns true if the stream might still contain characters.
    ///
    /// A true answer does not promise that `peek_char` returns promptly; on a
    /// live stream it may block until the producing process writes or exits.
    fn has_more(&mut self) -> bool;

    /// Returns the next character without consuming it, or
    /// [`StreamError::Exhausted`] if none remain.
    fn peek_char(&mut self) -> Result<char, StreamError>;

    /// Removes the character last returned by a successful `peek_char`.
    ///
    /// Calling this without a preceding successful peek is a programming
    /// error, not a parse failure.
    fn pop_char(&mut self);

    /// Returns true iff the next character exists and is in `charset`.
    fn is_next_char_in(&mut self, charset: &str) -> bool {
        self.has_more() && matches!(self.peek_char(), Ok(c) if charset.contains(c))
    }

    /// Returns true iff the next character exists and is not in `charset`.
    fn is_next_char_not_in(&mut self, charset: &str) -> bool {
        self.has_more() && matches!(self.peek_char(), Ok(c) if !charset.contains(c))
    }

    /// Consumes a run of whitespace (space, tab, CR, newline), if any.
    fn skip_whitespace(&mut self) {
        while self.is_next_char_in(WHITESPACE) {
            self.pop_char();
        }
    }

    /// Returns the next character and removes it from the stream.
    fn next_char(&mut self) -> Result<char, StreamError> {
        let c = self.peek_char()?;
        self.pop_char();
        Ok(c)
    }

    /// Parses a signed decimal integer from the stream.
    ///
    /// Accepts an optional leading `-` followed by a maximal run of digits.
    /// Leading zeros are parsed numerically, not rejected. Fails with
    /// [`StreamError::Exhausted`] if the stream ended before any digit, or
    /// [`StreamError::MalformedInt`] if positioned on a non-digit.
    fn next_int(&mut self, skip_whitespace: bool) -> Result<i64, StreamError> {
        if skip_whitespace {
            self.skip_whitespace();
        }
        let negative = if self.is_next_char_in("-") {
            self.pop_char();
            true
        } else {
            false
        };
        let mut digits = String::new();
        while self.is_next_char_in(NUMERIC) {
            digits.push(self.next_char()?);
        }
        if digits.is_empty() {
            return if self.has_more() {
                Err(StreamError::MalformedInt)
            } else {
                Err(StreamError::Exhausted)
            };
        }
        // digits is all 0-9, so the only way this parse fails is overflow.
        let magnitude: i128 = digits.parse().map_err(|_| StreamError::IntOutOfRange)?;
        let value = if negative { -magnitude } else { magnitude };
        i64::try_from(value).map_err(|_| StreamError::IntOutOfRange)
    }

    /// Parses a token: a maximal run of characters not in `delimiters`,
    /// consuming exactly one trailing delimiter if present (the delimiter is
    /// not part of the returned token).
    ///
    /// Returns an empty token when the stream starts on a delimiter (with
    /// whitespace-skipping off) or is exhausted.
    fn next_token(&mut self, delimiters: &str, skip_whitespace: bool) -> String {
        if skip_whitespace {
            self.skip_whitespace();
        }
        let mut token = String::new();
        while self.is_next_char_not_in(delimiters) {
            match self.next_char() {
                Ok(c) => token.push(c),
                Err(_) => break,
            }
        }
        if self.is_next_char_in(delimiters) {
            self.pop_char();
        }
        token
    }

    /// Consumes and returns a maximal run of characters drawn from `charset`.
    /// May return an empty string.
    fn next_run(&mut self, charset: &str, skip_whitespace: bool) -> String {
        if skip_whitespace {
            self.skip_whitespace();
        }
        let mut run = String::new();
        while self.is_next_char_in(charset) {
            match self.next_char() {
                Ok(c) => run.push(c),
                Err(_) => break,
            }
        }
        run
    }

    /// Starts a [`Scan`] cursor for chained multi-field extraction.
    fn scan(&mut self) -> Scan<'_, Self>
    where
        Self: Sized,
    {
        Scan::new(self)
    }
}

/// One value decoded by a [`Scan`] cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanValue {
    Char(char),
    Int(i64),
    Token(String),
}

impl ScanValue {
    pub fn as_char(&self) -> Option<char> {
        match self {
            ScanValue::Char(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ScanValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_token(&self) -> Option<&str> {
        match self {
            ScanValue::Token(t) => Some(t),
            _ => None,
        }
    }
}

/// A chained parse cursor over a [`Stream`].
///
/// Each combinator consumes the cursor and returns a new one with one more
/// decoded value appended, so a row of fields reads as a single expression:
///
/// ```
/// use gauntlet_core::stream::{Stream, StringStream};
///
/// let mut stream = StringStream::new("3 4 apples");
/// let values = stream.scan().int().unwrap().int().unwrap().token().into_values();
/// assert_eq!(values.len(), 3);
/// ```
#[derive(Debug)]
pub struct Scan<'s, S: Stream> {
    stream: &'s mut S,
    values: Vec<ScanValue>,
}

impl<'s, S: Stream> Scan<'s, S> {
    fn new(stream: &'s mut S) -> Self {
        Scan {
            stream,
            values: Vec::new(),
        }
    }

    /// Decodes one character and appends it to the cursor.
    pub fn char(mut self) -> Result<Self, StreamError> {
        let c = self.stream.next_char()?;
        self.values.push(ScanValue::Char(c));
        Ok(self)
    }

    /// Decodes one whitespace-separated integer and appends it to the cursor.
    pub fn int(mut self) -> Result<Self, StreamError> {
        let v = self.stream.next_int(true)?;
        self.values.push(ScanValue::Int(v));
        Ok(self)
    }

    /// Decodes one whitespace-delimited token and appends it to the cursor.
    pub fn token(mut self) -> Self {
        let t = self.stream.next_token(DEFAULT_DELIMITERS, true);
        self.values.push(ScanValue::Token(t));
        self
    }

    /// Returns the decoded values in the order they were read.
    pub fn into_values(self) -> Vec<ScanValue> {
        self.values
    }
}

impl<S: Stream> IntoIterator for Scan<'_, S> {
    type Item = ScanValue;
    type IntoIter = std::vec::IntoIter<ScanValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// A finite, never-blocking [`Stream`] over an in-memory string.
///
/// Used for static text: generated inputs and captured batch output.
#[derive(Debug, Clone)]
pub struct StringStream {
    chars: Vec<char>,
    cursor: usize,
}

impl StringStream {
    pub fn new(text: &str) -> Self {
        StringStream {
            chars: text.chars().collect(),
            cursor: 0,
        }
    }
}

impl Stream for StringStream {
    fn has_more(&mut self) -> bool {
        self.cursor < self.chars.len()
    }

    fn peek_char(&mut self) -> Result<char, StreamError> {
        self.chars
            .get(self.cursor)
            .copied()
            .ok_or(StreamError::Exhausted)
    }

    fn pop_char(&mut self) {
        debug_assert!(
            self.cursor < self.chars.len(),
            "pop_char without a preceding successful peek"
        );
        self.cursor += 1;
    }
}
