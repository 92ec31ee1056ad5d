use std::io::Write;

use crate::Result;

pub use crate::selection::{IntoKsize, Selection};
pub use crate::signature::{Signature, SigsTrait};
pub use crate::sketch::frozen::FrozenMinHash;
pub use crate::sketch::minhash::KmerMinHash;
pub use crate::sketch::Sketch;

pub trait ToWriter {
    fn to_writer<W>(&self, writer: &mut W) -> Result<()>
    where
        W: Write;
}
