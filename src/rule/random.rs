//! Uniform random selection.

use std::sync::Arc;

use crate::error::Result;
use crate::registry::Endpoint;
use crate::rule::{SelectionContext, SelectionRule};

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomRule;

impl SelectionRule for RandomRule {
    fn name(&self) -> &'static str {
        "random"
    }

    fn choose(&self, ctx: &SelectionContext<'_>) -> Result<Arc<Endpoint>> {
        if ctx.candidates.is_empty() {
            return Err(ctx.no_endpoint());
        }
        let index = fastrand::usize(..ctx.candidates.len());
        Ok(ctx.candidates[index].clone())
    }
}
