//! Checkpoint reconciliation.
//!
//! A saved parameter set is matched against the live one by name. The result
//! always carries exactly the live names, in live order:
//!
//! | saved entry                    | result      | diagnostic      |
//! |--------------------------------|-------------|-----------------|
//! | same name, same shape          | saved value | -               |
//! | same name, different shape     | live value  | `ShapeMismatch` |
//! | name not live                  | dropped     | `Dropped`       |
//! | live name absent from saved    | live value  | `Missing`       |
//!
//! Names written by data-parallel wrappers carry a `module.` prefix; it is
//! stripped before matching (names starting with `module_list` are left
//! alone).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::params::ParamSet;

const WRAPPER_PREFIX: &str = "module.";

/// A non-fatal finding of [`reconcile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckpointDiagnostic {
    /// The saved tensor has a different shape; the live value is kept.
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    /// The saved tensor has no live counterpart.
    Dropped { name: String },
    /// No saved tensor exists for a live parameter.
    Missing { name: String },
}

impl fmt::Display for CheckpointDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointDiagnostic::ShapeMismatch {
                name,
                expected,
                found,
            } => write!(
                f,
                "skip loading parameter {name}: required shape {expected:?}, loaded shape {found:?}"
            ),
            CheckpointDiagnostic::Dropped { name } => write!(f, "drop parameter {name}"),
            CheckpointDiagnostic::Missing { name } => write!(f, "no parameter {name}"),
        }
    }
}

/// Output of [`reconcile`].
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub params: ParamSet,
    pub diagnostics: Vec<CheckpointDiagnostic>,
}

/// Strips a leading `module.` unless the name belongs to a `module_list`.
pub fn normalize_name(name: &str) -> &str {
    if name.starts_with("module_list") {
        name
    } else {
        name.strip_prefix(WRAPPER_PREFIX).unwrap_or(name)
    }
}

/// Reconciles `saved` against `live`. Never fails.
///
/// Names are normalized first; when two saved names normalize to the same
/// key, the later entry wins. Diagnostics list shape mismatches and drops in
/// saved order, then missing entries in live order.
pub fn reconcile(saved: ParamSet, live: &ParamSet) -> Reconciled {
    let mut renamed = ParamSet::new();
    for (name, tensor) in saved {
        renamed.insert(normalize_name(&name), tensor);
    }

    let mut normalized = ParamSet::new();
    let mut diagnostics = Vec::new();
    for (name, tensor) in renamed {
        match live.shape(&name) {
            None => diagnostics.push(CheckpointDiagnostic::Dropped { name }),
            Some(expected) if expected != tensor.shape() => {
                diagnostics.push(CheckpointDiagnostic::ShapeMismatch {
                    expected: expected.to_vec(),
                    found: tensor.shape().to_vec(),
                    name,
                });
            }
            Some(_) => {
                normalized.insert(name, tensor);
            }
        }
    }

    let mut params = ParamSet::new();
    for (name, live_tensor) in live.iter() {
        match normalized.remove(name) {
            Some(tensor) => {
                params.insert(name, tensor);
            }
            None => {
                let mismatched = diagnostics.iter().any(|d| {
                    matches!(d, CheckpointDiagnostic::ShapeMismatch { name: n, .. } if n == name)
                });
                if !mismatched {
                    diagnostics.push(CheckpointDiagnostic::Missing {
                        name: name.to_string(),
                    });
                }
                params.insert(name, live_tensor.clone());
            }
        }
    }

    Reconciled {
        params,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};

    fn live() -> ParamSet {
        let mut set = ParamSet::new();
        set.insert("a.weight", arr2(&[[0.0f32, 0.0]]).into_dyn());
        set.insert("a.bias", arr1(&[0.0f32]).into_dyn());
        set.insert("b.bias", arr1(&[0.0f32, 0.0]).into_dyn());
        set
    }

    #[test]
    fn identical_names_and_shapes_take_saved_values() {
        let mut saved = ParamSet::new();
        saved.insert("b.bias", arr1(&[3.0f32, 4.0]).into_dyn());
        saved.insert("a.weight", arr2(&[[1.0f32, 2.0]]).into_dyn());
        saved.insert("a.bias", arr1(&[5.0f32]).into_dyn());

        let out = reconcile(saved, &live());
        assert!(out.diagnostics.is_empty());
        let names: Vec<&str> = out.params.names().collect();
        assert_eq!(names, vec!["a.weight", "a.bias", "b.bias"]);
        assert_eq!(out.params.get("b.bias"), Some(&arr1(&[3.0f32, 4.0]).into_dyn()));
    }

    #[test]
    fn empty_saved_reports_every_live_name_missing() {
        let out = reconcile(ParamSet::new(), &live());
        assert_eq!(out.params, live());
        assert_eq!(out.diagnostics.len(), 3);
        assert!(out
            .diagnostics
            .iter()
            .all(|d| matches!(d, CheckpointDiagnostic::Missing { .. })));
    }

    #[test]
    fn strips_wrapper_prefix() {
        assert_eq!(normalize_name("module.a.bias"), "a.bias");
        assert_eq!(normalize_name("module_list.0.weight"), "module_list.0.weight");
        assert_eq!(normalize_name("a.module.bias"), "a.module.bias");

        let mut saved = ParamSet::new();
        saved.insert("module.a.bias", arr1(&[9.0f32]).into_dyn());
        let out = reconcile(saved, &live());
        assert_eq!(out.params.get("a.bias"), Some(&arr1(&[9.0f32]).into_dyn()));
    }

    #[test]
    fn colliding_names_keep_the_later_entry() {
        let good = arr1(&[4.0f32]).into_dyn();
        let bad = arr1(&[4.0f32, 4.0]).into_dyn();

        let mut saved = ParamSet::new();
        saved.insert("module.a.bias", bad.clone());
        saved.insert("a.bias", good.clone());
        let out = reconcile(saved, &live());
        assert_eq!(out.params.get("a.bias"), Some(&good));
        assert!(!out
            .diagnostics
            .iter()
            .any(|d| matches!(d, CheckpointDiagnostic::ShapeMismatch { .. })));

        let mut saved = ParamSet::new();
        saved.insert("a.bias", good);
        saved.insert("module.a.bias", bad);
        let out = reconcile(saved, &live());
        assert_eq!(out.params.get("a.bias"), live().get("a.bias"));
        assert_eq!(
            out.diagnostics[0],
            CheckpointDiagnostic::ShapeMismatch {
                name: "a.bias".into(),
                expected: vec![1],
                found: vec![2],
            }
        );
    }

    #[test]
    fn mismatch_dropped_and_missing() {
        let mut saved = ParamSet::new();
        saved.insert("a.weight", arr2(&[[1.0f32], [2.0]]).into_dyn());
        saved.insert("extra", arr1(&[1.0f32]).into_dyn());
        saved.insert("a.bias", arr1(&[7.0f32]).into_dyn());

        let out = reconcile(saved, &live());
        assert_eq!(out.params.get("a.weight"), live().get("a.weight"));
        assert_eq!(out.params.get("a.bias"), Some(&arr1(&[7.0f32]).into_dyn()));
        insta::assert_json_snapshot!(out.diagnostics, @r###"
        [
          {
            "kind": "shape_mismatch",
            "name": "a.weight",
            "expected": [
              1,
              2
            ],
            "found": [
              2,
              1
            ]
          },
          {
            "kind": "dropped",
            "name": "extra"
          },
          {
            "kind": "missing",
            "name": "b.bias"
          }
        ]
        "###);
    }

    #[test]
    fn diagnostics_display() {
        let d = CheckpointDiagnostic::ShapeMismatch {
            name: "w".into(),
            expected: vec![2],
            found: vec![3],
        };
        assert_eq!(
            d.to_string(),
            "skip loading parameter w: required shape [2], loaded shape [3]"
        );
    }
}
