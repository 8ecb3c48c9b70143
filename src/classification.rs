// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Threshold rules mapping fundamental ratios to qualitative buckets.

use std::collections::BTreeMap;

use crate::models::{Classification, FundamentalSnapshot, Metric, PriceTargetSignal};

/// One side of a threshold rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cut {
    Below(f64),
    Above(f64),
    AtLeast(f64),
}

impl Cut {
    pub fn matches(&self, value: f64) -> bool {
        match *self {
            Cut::Below(limit) => value < limit,
            Cut::Above(limit) => value > limit,
            Cut::AtLeast(limit) => value >= limit,
        }
    }
}

/// Good is tested first, then review; anything else is stable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricRule {
    pub metric: Metric,
    pub good: Cut,
    pub review: Cut,
}

// Dividend yield, ROE and net margin are higher-is-better.
pub const RULES: [MetricRule; 7] = [
    MetricRule {
        metric: Metric::Pe,
        good: Cut::Below(10.0),
        review: Cut::Above(25.0),
    },
    MetricRule {
        metric: Metric::Peg,
        good: Cut::Below(1.0),
        review: Cut::AtLeast(1.0),
    },
    MetricRule {
        metric: Metric::EvEbitda,
        good: Cut::Below(6.0),
        review: Cut::Above(12.0),
    },
    MetricRule {
        metric: Metric::Pb,
        good: Cut::Below(1.0),
        review: Cut::Above(3.0),
    },
    MetricRule {
        metric: Metric::DivYield,
        good: Cut::Above(5.0),
        review: Cut::Below(2.0),
    },
    MetricRule {
        metric: Metric::Roe,
        good: Cut::Above(20.0),
        review: Cut::Below(10.0),
    },
    MetricRule {
        metric: Metric::NetMargin,
        good: Cut::Above(15.0),
        review: Cut::Below(5.0),
    },
];

pub fn rule_for(metric: Metric) -> Option<&'static MetricRule> {
    RULES.iter().find(|rule| rule.metric == metric)
}

pub fn classify(metric: Metric, value: Option<f64>) -> Classification {
    let (Some(rule), Some(value)) = (rule_for(metric), value) else {
        return Classification::Unknown;
    };
    if value.is_nan() {
        return Classification::Unknown;
    }

    if rule.good.matches(value) {
        Classification::Good
    } else if rule.review.matches(value) {
        Classification::Review
    } else {
        Classification::Stable
    }
}

/// Same as [`classify`], keyed by metric code such as `"EV_EBITDA"`.
pub fn classify_named(metric_name: &str, value: Option<f64>) -> Classification {
    match Metric::from_code(metric_name) {
        Some(metric) => classify(metric, value),
        None => Classification::Unknown,
    }
}

pub fn classify_snapshot(snapshot: &FundamentalSnapshot) -> BTreeMap<Metric, Classification> {
    Metric::RATIOS
        .into_iter()
        .map(|metric| (metric, classify(metric, snapshot.get(metric))))
        .collect()
}

pub fn price_target_signal(current: Option<f64>, target: Option<f64>) -> PriceTargetSignal {
    match (current, target) {
        (Some(current), Some(target)) if current < target => PriceTargetSignal::PotentialUpside,
        (Some(_), Some(_)) => PriceTargetSignal::AboveTarget,
        _ => PriceTargetSignal::NoData,
    }
}

pub fn snapshot_price_target(snapshot: &FundamentalSnapshot) -> PriceTargetSignal {
    price_target_signal(
        snapshot.get(Metric::CurrentPrice),
        snapshot.get(Metric::TargetMeanPrice),
    )
}
