/*!
 * # resumeflow - streaming text transformation client
 *
 * A Rust library for submitting a text to a long-running, multi-stage
 * transformation service and following its progress until the final result
 * arrives.
 *
 * ## Features
 *
 * - One-shot handshake that creates a job and returns its session id
 * - Server-sent event stream with named progress and snapshot events
 * - Explicit session state machine with a single deadline and cancellation
 * - Typed failure taxonomy with user-facing messages
 * - Best-effort saving of results to a remote service or a local database
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `protocol`: SSE framing and typed stream events
 * - `session`: the session state machine and its drivers:
 *   - `session::initiator`: handshake
 *   - `session::connector`: one event-stream connection
 *   - `session::dispatch`: pure `dispatch(state, signal) -> Transition`
 *   - `session::client`: at most one active session per client
 * - `transport`: handshake/stream traits and their HTTP implementation
 * - `persistence`: record store for finished results
 * - `app_config`: Configuration management
 * - `app_controller`: Main application controller
 * - `language_utils`: Language catalog
 * - `file_utils`: Input and output files
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod persistence;
pub mod protocol;
pub mod session;
pub mod transport;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{AppError, ErrorKind, PersistenceError, SessionError, TransportError};
pub use language_utils::LanguageCatalog;
pub use session::{SessionClient, SessionPhase, SessionReport, SessionState, TransformRequest};
