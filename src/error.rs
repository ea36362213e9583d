//! Rich diagnostic error types for the litrank pipeline.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so users know exactly what went wrong and
//! how to fix it. Per-item failures (a single search, a single identifier) are
//! represented as values at the processing boundary and never appear here; these
//! types cover infrastructure failures that may terminate a run.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the litrank pipeline.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, source chains) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum LitrankError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Ident(#[from] IdentError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Kb(#[from] KbError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Table(#[from] TableError),
}

// ---------------------------------------------------------------------------
// Identifier errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum IdentError {
    #[error("empty identifier: input was empty or whitespace-only")]
    #[diagnostic(
        code(litrank::ident::empty),
        help(
            "Identifiers must contain at least one non-whitespace character. \
             Check the upstream record for a missing prefix or short name."
        )
    )]
    Empty,
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    #[error("failed to read registry dump: {path}")]
    #[diagnostic(
        code(litrank::registry::io),
        help("Ensure the registry dump file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse registry dump: {path}: {message}")]
    #[diagnostic(
        code(litrank::registry::parse),
        help(
            "The registry dump must be a JSON array of resource records. \
             Check that the file is complete and not truncated."
        )
    )]
    Parse { path: String, message: String },
}

// ---------------------------------------------------------------------------
// Knowledge-base errors
// ---------------------------------------------------------------------------

/// Errors from the knowledge-base query collaborator.
///
/// These are infrastructure failures: the endpoint being unreachable or
/// returning something other than a SPARQL JSON results envelope terminates
/// the run. An empty result set is *not* an error.
#[derive(Debug, Error, Diagnostic)]
pub enum KbError {
    #[error("knowledge base returned HTTP {status}")]
    #[diagnostic(
        code(litrank::kb::http),
        help(
            "The query endpoint rejected the request. Check the endpoint URL in \
             the config, and whether the service is rate-limiting you."
        )
    )]
    Http { status: u16, body: String },

    #[error("transport error querying knowledge base: {message}")]
    #[diagnostic(
        code(litrank::kb::transport),
        help("Check network connectivity and the configured endpoint URL.")
    )]
    Transport { message: String },

    #[error("malformed knowledge-base response: {message}")]
    #[diagnostic(
        code(litrank::kb::format),
        help(
            "The response was not a SPARQL JSON results document. \
             Verify the endpoint speaks application/sparql-results+json."
        )
    )]
    Format { message: String },
}

// ---------------------------------------------------------------------------
// Search errors
// ---------------------------------------------------------------------------

/// Errors from the search-count collaborator.
///
/// Callers catch these per candidate: a failed count degrades to
/// "count unknown for this run" and never aborts the enrichment loop.
#[derive(Debug, Error, Diagnostic)]
pub enum SearchError {
    #[error("search endpoint returned HTTP {status}")]
    #[diagnostic(
        code(litrank::search::http),
        help("The search service rejected the request; it may be rate-limiting. Retry later.")
    )]
    Http { status: u16 },

    #[error("transport error during search: {message}")]
    #[diagnostic(
        code(litrank::search::transport),
        help("Check network connectivity and the configured search endpoint.")
    )]
    Transport { message: String },

    #[error("malformed search response: {message}")]
    #[diagnostic(
        code(litrank::search::format),
        help("The response did not contain a parseable result count.")
    )]
    Format { message: String },
}

// ---------------------------------------------------------------------------
// Table errors
// ---------------------------------------------------------------------------

/// Errors from the persisted frequency table.
///
/// Checkpoint failures are fatal: the table is the authoritative progress
/// record, and continuing past a failed write would silently break the
/// resume guarantee.
#[derive(Debug, Error, Diagnostic)]
pub enum TableError {
    #[error("failed to write table: {path}")]
    #[diagnostic(
        code(litrank::table::io),
        help(
            "A checkpoint write failed. Check disk space and permissions on the \
             data directory; the run cannot continue without durable checkpoints."
        )
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed table row in {path}: {message}")]
    #[diagnostic(
        code(litrank::table::format),
        help(
            "The persisted table could not be parsed. It may have been edited by \
             hand or truncated; restore it from a backup or delete it to start over."
        )
    )]
    Format { path: String, message: String },

    #[error("duplicate key \"{key}\" in persisted table: {path}")]
    #[diagnostic(
        code(litrank::table::duplicate_key),
        help(
            "The table must contain at most one row per key. A duplicate means \
             the file was written by something other than this tool; deduplicate \
             it manually before resuming."
        )
    )]
    DuplicateKey { path: String, key: String },
}

/// Convenience alias for functions returning litrank results.
pub type LitrankResult<T> = std::result::Result<T, LitrankError>;
