// Copyright (c) 2025 pricewatch
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod crawler_config;
pub mod crawler_raw;
pub mod job;
pub mod job_error;
