//! Include token validation: every requested token is honored or rejected, never dropped.

use crate::config::{IncludeDef, RelationPath, ResourceDescriptor};
use crate::error::AppError;

/// Validated, de-duplicated includes in descriptor order.
#[derive(Clone, Debug)]
pub struct IncludePlan<'d> {
    includes: Vec<&'d IncludeDef>,
}

impl<'d> IncludePlan<'d> {
    pub fn empty() -> Self {
        IncludePlan { includes: Vec::new() }
    }

    pub fn tokens(&self) -> impl Iterator<Item = &'d str> + '_ {
        self.includes.iter().map(|i| i.token.as_str())
    }

    /// Relation paths implied by the plan. May repeat; the query builder unions them.
    pub fn paths(&self) -> impl Iterator<Item = &'d RelationPath> + '_ {
        self.includes.iter().flat_map(|i| i.paths.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.includes.is_empty()
    }
}

/// Resolve raw tokens against the descriptor. The first unknown token fails the request.
pub fn resolve_includes<'d, S: AsRef<str>>(
    descriptor: &'d ResourceDescriptor,
    requested: &[S],
) -> Result<IncludePlan<'d>, AppError> {
    for token in requested {
        let token = token.as_ref();
        if descriptor.include(token).is_none() {
            return Err(AppError::InvalidInclude {
                resource: descriptor.path_segment.clone(),
                token: token.to_string(),
            });
        }
    }
    let includes = descriptor
        .includes
        .iter()
        .filter(|def| requested.iter().any(|t| t.as_ref() == def.token))
        .collect();
    Ok(IncludePlan { includes })
}
