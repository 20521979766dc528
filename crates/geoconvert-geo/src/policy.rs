//! CRS policy resolution
//!
//! Decides whether a conversion assigns a CRS, reprojects, both, or leaves
//! coordinates alone. User intent outranks the dataset's own CRS metadata.

use geoconvert_core::models::{CrsDirective, CrsIdentifier, TranslateDirective};

use crate::crs::crs_match;

/// Resolve the CRS directive for a conversion.
///
/// Priority order:
/// 1. source and target given and different: assign source, then transform
/// 2. only source given (or both equal): assign source
/// 3. only target given: assign it when the dataset has no CRS, otherwise
///    transform to it
/// 4. nothing given: no directive
pub fn resolve(
    source: Option<&CrsIdentifier>,
    target: Option<&CrsIdentifier>,
    dataset_has_crs: bool,
) -> CrsDirective {
    match (source, target) {
        (Some(source), Some(target)) if !crs_match(source, target) => {
            CrsDirective::AssignThenTransform { source: source.clone(), target: target.clone() }
        }
        (Some(source), _) => CrsDirective::AssignOnly(source.clone()),
        (None, Some(target)) if dataset_has_crs => CrsDirective::TransformOnly(target.clone()),
        (None, Some(target)) => CrsDirective::AssignOnly(target.clone()),
        (None, None) => CrsDirective::None,
    }
}

/// Translate directives implementing a CRS directive
pub fn to_directives(directive: &CrsDirective) -> Vec<TranslateDirective> {
    match directive {
        CrsDirective::None => Vec::new(),
        CrsDirective::AssignOnly(crs) => vec![TranslateDirective::AssignSrs(crs.as_engine_input())],
        CrsDirective::TransformOnly(target) => {
            vec![TranslateDirective::TargetSrs(target.as_engine_input())]
        }
        CrsDirective::AssignThenTransform { source, target } => vec![
            TranslateDirective::SourceSrs(source.as_engine_input()),
            TranslateDirective::TargetSrs(target.as_engine_input()),
        ],
    }
}
