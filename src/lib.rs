//! Host package for the cross-crate integration tests under `tests/`.
