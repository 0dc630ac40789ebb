//! Per-call parse configuration.

/// Default limit on nested rule invocations.
pub const DEFAULT_MAX_DEPTH: usize = 1000;

/// Options for a single parse call.
///
/// # Examples
///
/// ```rust
/// use peggy::runtime::ParseOptions;
/// let options = ParseOptions::default()
///     .with_entry("expr")
///     .with_partial(true)
///     .with_max_depth(64);
/// assert!(options.memoize);
/// assert_eq!(options.entry.as_deref(), Some("expr"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Enables the packrat cache. Results are identical either way.
    pub memoize: bool,
    /// Maximum nested rule invocations before failing with `RecursionLimit`.
    pub max_depth: usize,
    /// Accept an entry match that does not consume the whole input.
    pub allow_partial: bool,
    /// Entry rule override; `None` means `main`.
    pub entry: Option<String>,
    /// Name given to the input in diagnostics.
    pub source_name: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            memoize: true,
            max_depth: DEFAULT_MAX_DEPTH,
            allow_partial: false,
            entry: None,
            source_name: "input".to_string(),
        }
    }
}

impl ParseOptions {
    pub fn with_memoize(mut self, memoize: bool) -> Self {
        self.memoize = memoize;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_partial(mut self, allow_partial: bool) -> Self {
        self.allow_partial = allow_partial;
        self
    }

    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = Some(entry.into());
        self
    }

    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }
}
