#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod index;
pub mod tokenize;

pub use index::{Bm25Params, InvertedIndex};
pub use tokenize::{tokenize, Stemmer, SuffixStemmer};
