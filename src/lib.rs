// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

mod otel;

pub mod binding;
pub mod config;
pub mod errors;
pub mod exchange;
pub mod headers;
pub mod management;
pub mod message;
pub mod queue;
pub mod registry;
pub mod router;
pub mod topic;
