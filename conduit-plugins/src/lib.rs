//! The three reference plugins from `spec.md` §4.5: a JSON body decoder, a
//! context-property setter, and a request logger. Concrete plugins beyond
//! these are explicitly out of this crate's scope — see `spec.md` §1.

mod context_setter;
mod json_decoder;
mod logger;

pub use context_setter::ContextSetter;
pub use json_decoder::JsonDecoder;
pub use logger::{LineLogger, Logger, TracingLogger};
