use thiserror::Error;

// ---------------------------------------------------------------------------
// Loading errors
// ---------------------------------------------------------------------------

/// Failures while pulling a submodel's data out of a results source.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(
        "submodel {submodel} is neither a thermal nor fluid submodel\n\
         valid submodel names are:\n\
         thermal submodels: {thermal:?}\n\
         fluid submodels: {fluid:?}"
    )]
    UnknownSubmodel {
        submodel: String,
        thermal: Vec<String>,
        fluid: Vec<String>,
    },

    #[error("{kind} submodel {submodel} has no {subtype} data")]
    SubtypeUnavailable {
        kind: String,
        submodel: String,
        subtype: String,
    },

    #[error("no data subtypes available for submodel {0}")]
    NoSubtypes(String),

    #[error("{subtype} of {submodel}: {detail}")]
    Shape {
        submodel: String,
        subtype: String,
        detail: String,
    },
}

// ---------------------------------------------------------------------------
// Comparison errors
// ---------------------------------------------------------------------------

/// Failures while aligning a test dataset against a canonical one.
#[derive(Debug, Error)]
pub enum CompareError {
    #[error(
        "both datasets being compared are canonical; \
         only one of the datasets being compared can be canonical"
    )]
    BothCanonical,

    #[error(
        "neither dataset being compared is canonical; \
         exactly one of the datasets being compared must be canonical"
    )]
    NeitherCanonical,

    #[error(
        "data subtypes of canonical dataset do not match those of the test dataset\n\
         canonical dataset subtypes: {canonical:?}\n\
         test dataset subtypes: {test:?}"
    )]
    SubtypeMismatch {
        canonical: Vec<String>,
        test: Vec<String>,
    },

    #[error(
        "data subtypes requested for comparison are not available in the dataset\n\
         requested for comparison: {requested:?}\n\
         available in dataset: {available:?}"
    )]
    UnavailableSubtypes {
        requested: Vec<String>,
        available: Vec<String>,
    },

    #[error(
        "submodels for comparison of {subtype} are not equal\n\
         canonical submodel: {canonical}\n\
         test submodel: {test}"
    )]
    SubmodelMismatch {
        subtype: String,
        canonical: String,
        test: String,
    },

    #[error(
        "{subtype}: canonical data is {canonical_rows}x{canonical_cols} \
         but test data is {test_rows}x{test_cols}"
    )]
    ShapeMismatch {
        subtype: String,
        canonical_rows: usize,
        canonical_cols: usize,
        test_rows: usize,
        test_cols: usize,
    },

    #[error("tolerance must be a non-negative number, got {0}")]
    InvalidTolerance(f64),

    #[error(transparent)]
    Malformed(#[from] LoadError),
}
