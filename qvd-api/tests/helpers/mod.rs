//! Test Helper Utilities
//!
//! Shared utilities for testing qvd-api

#![allow(dead_code)]

pub mod fakes;
pub mod fixtures;

pub use fakes::{FakeGenerator, FakeImageStore, GatedGenerator};
pub use fixtures::{
    choices_of, explanation_of, seeded_file_pool, seeded_pool, status_of, verification_rows,
    CAPITAL_QUESTION, LETTER_QUESTION, PAIR_QUESTION,
};
