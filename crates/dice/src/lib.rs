//! Dice notation for chat commands.
//!
//! Two grammars share one scanner: [`evaluate_single`] accepts one dice or
//! advantage term with trailing modifiers (`4d6kh3+2`, `dis-1`), while
//! [`evaluate_expression`] sums any number of signed terms left to right
//! (`2d20kh1 + 1d6 - 2`). Both roll with a caller-supplied or thread-local
//! RNG and render every die, kept dice in bold.

mod error;
mod eval;
pub mod tokenizer;

pub use error::DiceError;
pub use eval::{
    Roll, evaluate_expression, evaluate_expression_with, evaluate_single, evaluate_single_with,
};
pub use tokenizer::{RollToken, tokenize};
