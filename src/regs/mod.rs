//! Static hardware tables of the LPC43xx-based capture board.

pub mod cgu;
pub mod memory;
pub mod led;
