//! Engine builder tests for turborepo-lib.
//!
//! The actual EngineBuilder implementation lives in turborepo-engine.
//! This module contains integration tests that use turborepo-lib specific
//! types.
