mod errors;
pub mod preference;
mod properties;
mod random;
pub(crate) mod trail;

pub use errors::*;
pub use properties::Properties;
pub use random::Random;
#[cfg(test)]
pub(crate) use random::tests::TestRandom;
pub(crate) use trail::Trail;
