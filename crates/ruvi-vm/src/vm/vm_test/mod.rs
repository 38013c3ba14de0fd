// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! Interpreter tests, driven end to end over hand-assembled images.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod literal_test;

pub(crate) use crate::testutil::{IrepBuilder, Lit, run_image};
