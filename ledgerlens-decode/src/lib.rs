mod decode;
mod repair;

pub use decode::{PrefixDecoder, RawCompletion};
pub use repair::{parse_completion, Repaired};
