//! Builds the access-control predicates applied to every search and purge.
//!
//! Both execution paths (direct Qdrant and the vector gateway) go through
//! these functions, so visibility semantics cannot diverge between them.
//! Expiry is evaluated lazily against these predicates: expired points stay
//! in the store, invisible to searches, until a purge reclaims them.

use qdrant_client::qdrant::{
    condition::ConditionOneOf, r#match::MatchValue, Condition, FieldCondition, Filter, Match,
    Range,
};

use crate::domain::entities::{document_point::PointScope, tenant_id::TenantId};

const TENANT_ID_KEY: &str = "tenant_id";
const SCOPE_KEY: &str = "scope";
const SESSION_ID_KEY: &str = "session_id";
const EXPIRES_AT_KEY: &str = "expires_at";

/// Predicate restricting which points are visible to a search
///
/// The tenant condition is always present. A `permanent` scope adds only the
/// scope condition. A `temporary` scope further restricts to the caller's
/// session and to points still alive at `now` (`expires_at >= now`). With no
/// scope, visible points are the tenant's permanent points or the session's
/// live temporary points.
pub fn search_filter(
    tenant_id: &TenantId,
    scope: Option<PointScope>,
    session_id: &str,
    now: i64,
) -> Filter {
    let tenant_condition = keyword_condition(TENANT_ID_KEY, tenant_id.as_ref());

    match scope {
        Some(PointScope::Permanent) => Filter {
            must: vec![tenant_condition, permanent_condition()],
            ..Default::default()
        },
        Some(PointScope::Temporary) => {
            let mut must = vec![tenant_condition];
            must.extend(live_temporary_conditions(session_id, now));

            Filter {
                must,
                ..Default::default()
            }
        }
        None => {
            let permanent = Filter {
                must: vec![permanent_condition()],
                ..Default::default()
            };
            let temporary = Filter {
                must: live_temporary_conditions(session_id, now),
                ..Default::default()
            };

            Filter {
                must: vec![tenant_condition],
                should: vec![nested_condition(permanent), nested_condition(temporary)],
                ..Default::default()
            }
        }
    }
}

/// Predicate selecting the points a purge may delete
///
/// Session-agnostic on purpose: purge reclaims every strictly expired
/// (`expires_at < now`) temporary point of the tenant, whichever session
/// created it. Permanent points never match.
pub fn purge_filter(tenant_id: &TenantId, now: i64) -> Filter {
    Filter {
        must: vec![
            keyword_condition(TENANT_ID_KEY, tenant_id.as_ref()),
            keyword_condition(SCOPE_KEY, PointScope::Temporary.as_str()),
            range_condition(
                EXPIRES_AT_KEY,
                Range {
                    lt: Some(now as f64),
                    ..Default::default()
                },
            ),
        ],
        ..Default::default()
    }
}

fn permanent_condition() -> Condition {
    keyword_condition(SCOPE_KEY, PointScope::Permanent.as_str())
}

fn live_temporary_conditions(session_id: &str, now: i64) -> Vec<Condition> {
    vec![
        keyword_condition(SCOPE_KEY, PointScope::Temporary.as_str()),
        keyword_condition(SESSION_ID_KEY, session_id),
        range_condition(
            EXPIRES_AT_KEY,
            Range {
                gte: Some(now as f64),
                ..Default::default()
            },
        ),
    ]
}

fn keyword_condition(key: &str, value: &str) -> Condition {
    Condition {
        condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
            key: key.to_string(),
            r#match: Some(Match {
                match_value: Some(MatchValue::Keyword(value.to_string())),
            }),
            ..Default::default()
        })),
    }
}

fn range_condition(key: &str, range: Range) -> Condition {
    Condition {
        condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
            key: key.to_string(),
            range: Some(range),
            ..Default::default()
        })),
    }
}

fn nested_condition(filter: Filter) -> Condition {
    Condition {
        condition_one_of: Some(ConditionOneOf::Filter(filter)),
    }
}
