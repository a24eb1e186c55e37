//! Cross-module tests: full builds over temporary folders.

mod helpers;
