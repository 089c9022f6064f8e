/*!
 * Wire protocol of the transformation event stream.
 *
 * - `sse`: incremental `text/event-stream` framing
 * - `events`: the closed set of event labels, pipeline stages and the
 *   typed events decoded from frames
 */

pub mod events;
pub mod sse;

pub use events::{DecodeError, EventLabel, Stage, StreamEvent};
pub use sse::{SseFrame, SseParser};
