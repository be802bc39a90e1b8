pub mod fasta;
pub mod sequence;
pub mod subseq;

pub use fasta::{FastaReader, FastaWriter, DEFAULT_LINE_WIDTH};
pub use sequence::Sequence;
pub use subseq::SubseqName;
