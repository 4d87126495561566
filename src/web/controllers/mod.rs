//! Controllers: one async function per route.
//!
//! Every controller takes the request [`Container`] and returns an
//! [`Outcome`]; the router turns the outcome into a response.

pub mod account;
pub mod comments;
pub mod stories;
pub mod submission;

use serde::Serialize;

use super::container::Container;
use super::error::{Failure, Outcome};

/// Position of an item in a listing, starting at 1.
#[derive(Debug, Serialize)]
pub struct Ranked<'a, T> {
    pub rank: i64,
    #[serde(flatten)]
    pub item: &'a T,
}

/// Rank `items` of a page starting at `offset`.
pub fn ranked<T>(items: &[T], offset: i64) -> Vec<Ranked<'_, T>> {
    (1..)
        .zip(items)
        .map(|(position, item)| Ranked {
            rank: offset.saturating_add(position),
            item,
        })
        .collect()
}

/// Positive integer query parameter `name`; anything else is a 404.
pub(crate) fn query_id(c: &Container, name: &str) -> Result<i64, Failure> {
    let raw = c.query().value(name);
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| Failure::not_found(format!("no record for {name}={raw:?}")))
}

/// Fallback for unknown paths.
pub async fn not_found(c: &mut Container) -> Outcome {
    Err(Failure::not_found(format!("no route for {}", c.uri().path())))
}
