//! End-to-end packaging tests driving the `warble` binary.

mod common;
mod jar_tests;
mod war_tests;
