//! MapDot pip size resolution over a parsed prefab document.
//!
//! The marker GameObject's radar footprint is its Transform's local scale
//! times the local scale of that Transform's father. Only those two levels
//! are read; deeper ancestors never contribute.

use std::collections::HashSet;

use rust_decimal::Decimal;
use tracing::debug;

use crate::document::{Document, Entry};
use crate::error::ResolveError;
use crate::types::{EntryId, PipSize, Scalar, Value};

/// Layer that radar marker objects live on.
const MAP_DOT_LAYER: &str = "14";

/// Unity's file id for "no object".
const NULL_FILE_ID: &str = "0";

/// Substring identifying the marker object by name.
const MAP_DOT_NAME: &str = "MapDot";

/// Resolve the pip size of the document's MapDot marker.
///
/// Steps, each first-match in document order:
/// 1. GameObject on layer 14 whose name contains `MapDot`;
/// 2. the ids referenced by its `m_Component` list;
/// 3. the Transform whose id is among them;
/// 4. that Transform's `m_Father` Transform;
/// 5. the pairwise product of both `m_LocalScale` x and z values.
///
/// # Errors
///
/// Returns `TargetEntryNotFound`, `TargetTransformNotFound` or
/// `ParentTransformNotFound` when a step finds nothing, `MissingAttribute`
/// or `InvalidScale` when a scale cannot be read, and `ScaleOverflow` when
/// the product leaves the decimal range.
pub fn resolve_pip_size(document: &Document) -> Result<PipSize, ResolveError> {
    let marker = find_map_dot(document)?;
    debug!(id = %marker.id, name = marker.scalar_text("m_Name").unwrap_or_default(), "found MapDot GameObject");

    let components = component_targets(marker);
    let transform = document
        .of_type("Transform")
        .find(|t| return components.contains(&t.id))
        .ok_or(ResolveError::TargetTransformNotFound)?;
    debug!(id = %transform.id, "found MapDot Transform");

    let father = find_father(document, transform)?;
    debug!(id = %father.id, class = %father.class_id, stripped = father.stripped, "found MapDot Transform father");

    let own = local_scale(transform)?;
    let parent = local_scale(father)?;
    return Ok(PipSize {
        x: multiply(own.0, parent.0, "x")?,
        z: multiply(own.1, parent.1, "z")?,
    });
}

/// Step 1: first GameObject on the marker layer with `MapDot` in its name.
///
/// # Errors
///
/// Returns `ResolveError::TargetEntryNotFound` when nothing matches.
fn find_map_dot(document: &Document) -> Result<&Entry, ResolveError> {
    return document
        .of_type("GameObject")
        .find(|entry| {
            let on_layer = entry.scalar_text("m_Layer") == Some(MAP_DOT_LAYER);
            let named = entry.scalar_text("m_Name").is_some_and(|n| return n.contains(MAP_DOT_NAME));
            return on_layer && named;
        })
        .ok_or(ResolveError::TargetEntryNotFound);
}

/// Step 2: ids of local references in the `m_Component` list. Items that
/// are not `component: {fileID: N}` pairs are skipped.
fn component_targets(marker: &Entry) -> HashSet<&EntryId> {
    let Some(items) = marker.attribute("m_Component").and_then(Value::as_sequence) else {
        return HashSet::new();
    };
    return items
        .iter()
        .filter_map(|item| return item.get("component")?.as_reference())
        .filter(|reference| return reference.is_local())
        .map(|reference| return &reference.target)
        .collect();
}

/// Step 4: dereference `m_Father` and require a Transform at the other end.
///
/// # Errors
///
/// Returns `ParentTransformNotFound` if there is no `m_Father` reference
/// (reported as the null id `0`), or if it dangles or names a non-Transform.
fn find_father<'d>(document: &'d Document, transform: &Entry) -> Result<&'d Entry, ResolveError> {
    let Some(reference) = transform.attribute("m_Father").and_then(Value::as_reference) else {
        debug!(id = %transform.id, "MapDot Transform has no m_Father");
        return Err(ResolveError::ParentTransformNotFound {
            father: EntryId::new(NULL_FILE_ID),
        });
    };

    let not_found = || {
        return ResolveError::ParentTransformNotFound {
            father: reference.target.clone(),
        };
    };
    let father = document.dereference(reference).map_err(|err| {
        debug!(%err, "m_Father does not resolve");
        return not_found();
    })?;
    if father.type_tag != "Transform" {
        return Err(not_found());
    }
    return Ok(father);
}

/// Step 5 input: `(x, z)` of a Transform's `m_LocalScale`.
///
/// # Errors
///
/// Returns `MissingAttribute` or `InvalidScale`.
fn local_scale(transform: &Entry) -> Result<(Decimal, Decimal), ResolveError> {
    let scale = transform
        .attribute("m_LocalScale")
        .ok_or_else(|| return ResolveError::MissingAttribute {
            attribute: "m_LocalScale",
            entry: transform.id.clone(),
        })?;
    let x = scale_component(transform, scale, "x")?;
    let z = scale_component(transform, scale, "z")?;
    return Ok((x, z));
}

/// One axis of a scale vector as an exact decimal.
///
/// # Errors
///
/// Returns `MissingAttribute` if the axis is absent, `InvalidScale` if it is
/// not a numeric literal.
fn scale_component(transform: &Entry, scale: &Value, axis: &'static str) -> Result<Decimal, ResolveError> {
    let missing = || {
        return ResolveError::MissingAttribute {
            attribute: match axis {
                "x" => "m_LocalScale.x",
                _ => "m_LocalScale.z",
            },
            entry: transform.id.clone(),
        };
    };
    let scalar = scale.get(axis).and_then(Value::as_scalar).ok_or_else(missing)?;
    let invalid = || {
        return ResolveError::InvalidScale {
            axis,
            entry: transform.id.clone(),
            literal: scalar.as_text().to_string(),
        };
    };
    return match scalar {
        Scalar::Integer(text) | Scalar::Decimal(text) => parse_decimal(text).ok_or_else(invalid),
        Scalar::Null | Scalar::Text(_) => Err(invalid()),
    };
}

/// Parse a numeric literal without rounding. Scientific notation is accepted.
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let unsigned = text.strip_prefix('+').unwrap_or(text);
    if unsigned.contains(['e', 'E']) {
        return Decimal::from_scientific(unsigned).ok();
    }
    return Decimal::from_str_exact(unsigned).ok();
}

/// Checked decimal product.
///
/// # Errors
///
/// Returns `ResolveError::ScaleOverflow` when the result does not fit.
fn multiply(own: Decimal, parent: Decimal, axis: &'static str) -> Result<Decimal, ResolveError> {
    return own.checked_mul(parent).ok_or(ResolveError::ScaleOverflow { axis });
}
