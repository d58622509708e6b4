//! Unit tests for task domain rules, adapters, and services.

mod support;
