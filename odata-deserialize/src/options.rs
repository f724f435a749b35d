/// Knobs for a decode operation.
///
/// ```
/// use odata_deserialize::DecodeOptions;
///
/// let options = DecodeOptions::new()
///     .max_depth(16)
///     .case_insensitive_properties(false);
/// assert_eq!(options.max_depth, 16);
/// assert!(options.backfill_keys_from_id);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// How many resources and resource sets may nest inside each other
    /// before decoding fails with
    /// [`RecursionTooDeep`](crate::DecodeErrorKind::RecursionTooDeep).
    pub max_depth: usize,

    /// Fall back to a case-insensitive match when a payload property name
    /// matches no declared property exactly.
    pub case_insensitive_properties: bool,

    /// Recover missing key properties of an entity from its `@odata.id`.
    pub backfill_keys_from_id: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: 64,
            case_insensitive_properties: true,
            backfill_keys_from_id: true,
        }
    }
}

impl DecodeOptions {
    /// The default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the nesting limit.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Enable or disable case-insensitive property resolution.
    pub fn case_insensitive_properties(mut self, enabled: bool) -> Self {
        self.case_insensitive_properties = enabled;
        self
    }

    /// Enable or disable id-to-key backfill.
    pub fn backfill_keys_from_id(mut self, enabled: bool) -> Self {
        self.backfill_keys_from_id = enabled;
        self
    }
}
