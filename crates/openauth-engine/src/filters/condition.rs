//! Condition filter: compares request metadata against expected values.

use axum::http::HeaderName;
use tracing::debug;

use openauth_core::{Condition, ConditionFilterSpec, ConditionSubject};

use crate::error::RejectReason;
use crate::filters::FilterOutcome;
use crate::request::RequestView;

/// Evaluates its conditions in order and stops at the first that fails.
#[derive(Debug, Clone)]
pub struct ConditionFilter {
    name: String,
    conditions: Vec<Condition>,
}

impl ConditionFilter {
    /// Build from a spec.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if a condition has an empty key
    /// or a header condition names an invalid header.
    pub fn new(name: String, spec: &ConditionFilterSpec) -> Result<Self, String> {
        for (i, condition) in spec.conditions.iter().enumerate() {
            if condition.key.is_empty() {
                return Err(format!("condition {i} has an empty key"));
            }
            if condition.subject == ConditionSubject::Header
                && HeaderName::from_bytes(condition.key.as_bytes()).is_err()
            {
                return Err(format!(
                    "condition {i} names invalid header `{}`",
                    condition.key
                ));
            }
        }

        Ok(Self {
            name,
            conditions: spec.conditions.clone(),
        })
    }

    /// Filter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluate the conditions against a request. An absent value fails.
    #[must_use]
    pub fn evaluate(&self, req: &RequestView) -> FilterOutcome {
        for (index, condition) in self.conditions.iter().enumerate() {
            let actual = match condition.subject {
                ConditionSubject::Header => req.header(&condition.key),
                ConditionSubject::Query => req.query_param(&condition.key),
                ConditionSubject::PathParam => req.path_param(&condition.key),
            };

            let holds = actual.is_some_and(|a| condition.operator.apply(a, &condition.value));
            if !holds {
                debug!(filter = %self.name, index, condition = %condition, "Condition failed");
                return FilterOutcome::Reject(RejectReason::ConditionFailed {
                    index,
                    condition: condition.to_string(),
                });
            }
        }

        FilterOutcome::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue, Method};
    use openauth_core::ConditionOperator;
    use std::collections::HashMap;

    fn condition(subject: ConditionSubject, operator: ConditionOperator, key: &str, value: &str) -> Condition {
        Condition {
            subject,
            operator,
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    fn filter(conditions: Vec<Condition>) -> ConditionFilter {
        ConditionFilter::new(
            "test".to_string(),
            &ConditionFilterSpec {
                name: None,
                conditions,
            },
        )
        .unwrap()
    }

    fn with_header(value: &'static str) -> RequestView {
        let mut headers = HeaderMap::new();
        headers.insert("X-Test-Header", HeaderValue::from_static(value));
        RequestView::new(Method::POST, "/signup").with_headers(headers)
    }

    #[test]
    fn header_equals() {
        let f = filter(vec![condition(
            ConditionSubject::Header,
            ConditionOperator::Equals,
            "X-Test-Header",
            "X-Test-Header",
        )]);

        assert!(f.evaluate(&with_header("X-Test-Header")).is_allow());
        assert!(!f.evaluate(&with_header("wrong-value")).is_allow());
    }

    #[test]
    fn absent_value_fails() {
        let f = filter(vec![condition(
            ConditionSubject::Query,
            ConditionOperator::Contains,
            "scope",
            "",
        )]);
        assert!(!f.evaluate(&RequestView::new(Method::GET, "/")).is_allow());
    }

    #[test]
    fn empty_list_passes() {
        assert!(filter(vec![])
            .evaluate(&RequestView::new(Method::GET, "/"))
            .is_allow());
    }

    #[test]
    fn reports_first_failing_index() {
        let f = filter(vec![
            condition(ConditionSubject::Header, ConditionOperator::Prefix, "X-Test-Header", "X-"),
            condition(ConditionSubject::PathParam, ConditionOperator::Equals, "id", "42"),
            condition(ConditionSubject::Header, ConditionOperator::Equals, "missing", "x"),
        ]);

        let mut req = with_header("X-Value");
        req.params = HashMap::from([("id".to_string(), "7".to_string())]);

        match f.evaluate(&req) {
            FilterOutcome::Reject(RejectReason::ConditionFailed { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected condition failure, got {other:?}"),
        }
    }

    #[test]
    fn query_and_path_params() {
        let f = filter(vec![
            condition(ConditionSubject::Query, ConditionOperator::Suffix, "email", "@example.com"),
            condition(ConditionSubject::PathParam, ConditionOperator::Equals, "tenant", "acme"),
        ]);

        let mut req = RequestView::new(Method::GET, "/t/acme")
            .with_query(HashMap::from([("email".to_string(), "a@example.com".to_string())]));
        req.params = HashMap::from([("tenant".to_string(), "acme".to_string())]);
        assert!(f.evaluate(&req).is_allow());
    }

    #[test]
    fn rejects_bad_keys() {
        let empty = ConditionFilterSpec {
            name: None,
            conditions: vec![condition(ConditionSubject::Query, ConditionOperator::Equals, "", "x")],
        };
        assert!(ConditionFilter::new("c".to_string(), &empty).is_err());

        let bad_header = ConditionFilterSpec {
            name: None,
            conditions: vec![condition(ConditionSubject::Header, ConditionOperator::Equals, "bad header", "x")],
        };
        assert!(ConditionFilter::new("c".to_string(), &bad_header).is_err());
    }
}
