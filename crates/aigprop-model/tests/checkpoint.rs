//! Loading saved parameter sets into a live model.

use aigprop_core::CircuitBuilder;
use aigprop_model::{CheckpointDiagnostic, ExecutionContext, Model, ModelConfig, ParamSet};
use ndarray::{Array1, Array2};

fn config(seed: u64) -> ModelConfig {
    ModelConfig {
        dim_hidden: 8,
        dim_mlp: 8,
        param_seed: seed,
        ..ModelConfig::default()
    }
}

#[test]
fn matching_checkpoint_restores_saved_values() {
    let source = Model::new(config(1)).unwrap();
    let mut target = Model::new(config(2)).unwrap();
    assert_ne!(source.state_dict(), target.state_dict());

    let diagnostics = target.load_checkpoint(source.state_dict()).unwrap();
    assert!(diagnostics.is_empty());
    assert_eq!(target.state_dict(), source.state_dict());

    let mut b = CircuitBuilder::new();
    let x = b.add_input();
    let y = b.add_input();
    let a = b.and(x, y).unwrap();
    b.not(a).unwrap();
    let graph = b.build().unwrap();
    let ctx = ExecutionContext::cpu();
    assert_eq!(
        target.forward(&ctx, &graph).unwrap(),
        source.forward(&ctx, &graph).unwrap()
    );
}

#[test]
fn empty_checkpoint_keeps_live_defaults() {
    let mut model = Model::new(config(3)).unwrap();
    let before = model.state_dict();
    let diagnostics = model.load_checkpoint(ParamSet::new()).unwrap();
    assert_eq!(diagnostics.len(), before.len());
    assert!(diagnostics
        .iter()
        .all(|d| matches!(d, CheckpointDiagnostic::Missing { .. })));
    assert_eq!(model.state_dict(), before);
}

#[test]
fn wrong_shape_and_missing_entries() {
    let source = Model::new(config(1)).unwrap();
    let mut model = Model::new(config(2)).unwrap();
    let live = model.state_dict();

    let mut saved = source.state_dict();
    saved.insert(
        "aggr_and_strc.msg_q.layers.0.weight",
        Array2::<f32>::zeros((3, 3)).into_dyn(),
    );
    saved.remove("update_not_func.bias_hh_l0");
    saved.insert("module.readout_prob.layers.2.bias", Array1::<f32>::ones(1).into_dyn());
    saved.insert("encoder.extra", Array1::<f32>::ones(2).into_dyn());

    let diagnostics = model.load_checkpoint(saved).unwrap();
    assert_eq!(
        diagnostics,
        vec![
            CheckpointDiagnostic::ShapeMismatch {
                name: "aggr_and_strc.msg_q.layers.0.weight".into(),
                expected: vec![8, 8],
                found: vec![3, 3],
            },
            CheckpointDiagnostic::Dropped {
                name: "encoder.extra".into(),
            },
            CheckpointDiagnostic::Missing {
                name: "update_not_func.bias_hh_l0".into(),
            },
        ]
    );

    let loaded = model.state_dict();
    let names: Vec<&str> = loaded.names().collect();
    let live_names: Vec<&str> = live.names().collect();
    assert_eq!(names, live_names);
    assert_eq!(
        loaded.get("aggr_and_strc.msg_q.layers.0.weight"),
        live.get("aggr_and_strc.msg_q.layers.0.weight")
    );
    assert_eq!(
        loaded.get("update_not_func.bias_hh_l0"),
        live.get("update_not_func.bias_hh_l0")
    );
    assert_eq!(
        loaded.get("update_and_strc.weight_ih_l0"),
        source.state_dict().get("update_and_strc.weight_ih_l0")
    );
    assert_eq!(
        loaded.get("readout_prob.layers.2.bias"),
        Some(&Array1::<f32>::ones(1).into_dyn())
    );
}

#[test]
fn checkpoint_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checkpoint.json");
    let source = Model::new(config(4)).unwrap();
    source.state_dict().save(&path).unwrap();

    let mut model = Model::new(config(5)).unwrap();
    let diagnostics = model.load_checkpoint_file(&path).unwrap();
    assert!(diagnostics.is_empty());
    assert_eq!(model.state_dict(), source.state_dict());
}
