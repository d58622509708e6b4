//! Unit tests for the worker session state machine.

mod support;
