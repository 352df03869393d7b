//! Tests for token service


mod signer_tests;
