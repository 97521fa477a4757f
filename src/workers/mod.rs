// Copyright (c) 2025 pricewatch
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod crawl_scheduler;

#[cfg(test)]
mod crawl_scheduler_test;
