//! Criteria predicates evaluated against display properties and measurements.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CriterionCondition {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    Between,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CriterionKind {
    String,
    Number,
}

/// The literal operand(s) of a criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CriterionValue {
    Text(String),
    Number(f64),
    /// Inclusive bounds, for `Between`.
    Range(f64, f64),
}

/// One predicate: `metric <condition> value`, evaluated against the
/// environment's display properties and measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub metric: String,
    pub condition: CriterionCondition,
    pub kind: CriterionKind,
    pub value: CriterionValue,
}

/// The environment a criterion is evaluated against: string display
/// properties merged with numeric measurements, as a single metric
/// namespace (§4.6 step 4: `env.display_properties ∪ env.measurements`).
pub struct CriteriaEnv<'a> {
    pub display_properties: &'a HashMap<String, String>,
    pub measurements: &'a HashMap<String, f64>,
}

impl Criterion {
    /// Evaluate this criterion against the environment.
    ///
    /// An unknown metric evaluates to `false` (spec's explicit resolution
    /// of an ambiguity in the source).
    pub fn evaluate(&self, env: &CriteriaEnv<'_>) -> bool {
        match self.kind {
            CriterionKind::Number => self.evaluate_number(env),
            CriterionKind::String => self.evaluate_string(env),
        }
    }

    fn evaluate_number(&self, env: &CriteriaEnv<'_>) -> bool {
        let Some(&actual) = env.measurements.get(&self.metric) else {
            return false;
        };
        match (&self.condition, &self.value) {
            (CriterionCondition::Equals, CriterionValue::Number(v)) => (actual - v).abs() < f64::EPSILON,
            (CriterionCondition::NotEquals, CriterionValue::Number(v)) => (actual - v).abs() >= f64::EPSILON,
            (CriterionCondition::GreaterThan, CriterionValue::Number(v)) => actual > *v,
            (CriterionCondition::LessThan, CriterionValue::Number(v)) => actual < *v,
            (CriterionCondition::Between, CriterionValue::Range(lo, hi)) => actual >= *lo && actual <= *hi,
            _ => false,
        }
    }

    fn evaluate_string(&self, env: &CriteriaEnv<'_>) -> bool {
        let Some(actual) = env.display_properties.get(&self.metric) else {
            return false;
        };
        match (&self.condition, &self.value) {
            (CriterionCondition::Equals, CriterionValue::Text(v)) => actual == v,
            (CriterionCondition::NotEquals, CriterionValue::Text(v)) => actual != v,
            (CriterionCondition::Contains, CriterionValue::Text(v)) => actual.contains(v.as_str()),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(props: &HashMap<String, String>, meas: &HashMap<String, f64>) -> CriteriaEnv<'_> {
        CriteriaEnv {
            display_properties: props,
            measurements: meas,
        }
    }

    #[test]
    fn unknown_metric_is_false() {
        let c = Criterion {
            metric: "temperature".into(),
            condition: CriterionCondition::GreaterThan,
            kind: CriterionKind::Number,
            value: CriterionValue::Number(20.0),
        };
        let props = HashMap::new();
        let meas = HashMap::new();
        assert!(!c.evaluate(&env(&props, &meas)));
    }

    #[test]
    fn between_is_inclusive() {
        let c = Criterion {
            metric: "temperature".into(),
            condition: CriterionCondition::Between,
            kind: CriterionKind::Number,
            value: CriterionValue::Range(10.0, 20.0),
        };
        let props = HashMap::new();
        let mut meas = HashMap::new();
        meas.insert("temperature".to_string(), 20.0);
        assert!(c.evaluate(&env(&props, &meas)));
    }

    #[test]
    fn string_contains() {
        let c = Criterion {
            metric: "tags".into(),
            condition: CriterionCondition::Contains,
            kind: CriterionKind::String,
            value: CriterionValue::Text("lobby".into()),
        };
        let mut props = HashMap::new();
        props.insert("tags".to_string(), "lobby,entrance".to_string());
        let meas = HashMap::new();
        assert!(c.evaluate(&env(&props, &meas)));
    }
}
