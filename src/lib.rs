// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

pub mod analytics;
pub mod api;
pub mod catalog;
pub mod classification;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod report;
pub mod visualizations;
