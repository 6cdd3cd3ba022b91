//! Collision rules. Pairs are found with a sweep over x per layer.

use crate::model::{Graph, LayerId, ObjectId, ObjectRef};
use crate::rules::{RuleId, RuleViolation, ViolationKey};
use std::collections::BTreeMap;

/// Boxes `[x0, y0, x1, y1]` of all gates, grouped by layer.
fn gate_boxes(graph: &Graph) -> BTreeMap<LayerId, Vec<(ObjectId, [f32; 4])>> {
    let mut by_layer: BTreeMap<LayerId, Vec<(ObjectId, [f32; 4])>> = BTreeMap::new();
    for gate in graph.gates() {
        if let Some(template) = graph.template(gate.template) {
            by_layer
                .entry(gate.layer)
                .or_default()
                .push((gate.id, gate.bounds(template)));
        }
    }
    by_layer
}

/// Index pairs whose boxes intersect with positive area.
fn intersecting_pairs(boxes: &mut [(ObjectId, [f32; 4])]) -> Vec<(ObjectId, ObjectId)> {
    boxes.sort_by(|a, b| a.1[0].total_cmp(&b.1[0]).then(a.0.cmp(&b.0)));
    let mut pairs = Vec::new();
    for (i, (id_a, a)) in boxes.iter().enumerate() {
        for (id_b, b) in &boxes[i + 1..] {
            if b[0] >= a[2] {
                break;
            }
            if b[1] < a[3] && a[1] < b[3] {
                pairs.push((*id_a, *id_b));
            }
        }
    }
    pairs
}

pub(super) fn overlapping_gates(graph: &Graph) -> Vec<RuleViolation> {
    let mut out = Vec::new();
    for (layer, mut boxes) in gate_boxes(graph) {
        for (a, b) in intersecting_pairs(&mut boxes) {
            out.push(RuleViolation::new(
                ViolationKey::new(
                    RuleId::OverlappingGates,
                    vec![ObjectRef::Gate(a), ObjectRef::Gate(b)],
                    Some(layer),
                ),
                format!("gates {a} and {b} overlap on layer {layer}"),
            ));
        }
    }
    out
}

pub(super) fn overlapping_vias(graph: &Graph) -> Vec<RuleViolation> {
    let mut by_layer: BTreeMap<LayerId, Vec<(ObjectId, [f32; 3])>> = BTreeMap::new();
    for via in graph.vias() {
        by_layer
            .entry(via.layer)
            .or_default()
            .push((via.id, [via.x, via.y, via.radius()]));
    }

    let mut out = Vec::new();
    for (layer, mut discs) in by_layer {
        discs.sort_by(|a, b| (a.1[0] - a.1[2]).total_cmp(&(b.1[0] - b.1[2])).then(a.0.cmp(&b.0)));
        for (i, (id_a, a)) in discs.iter().enumerate() {
            for (id_b, b) in &discs[i + 1..] {
                if b[0] - b[2] >= a[0] + a[2] {
                    break;
                }
                let reach = a[2] + b[2];
                let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
                if dx * dx + dy * dy < reach * reach {
                    out.push(RuleViolation::new(
                        ViolationKey::new(
                            RuleId::OverlappingVias,
                            vec![ObjectRef::Via(*id_a), ObjectRef::Via(*id_b)],
                            Some(layer),
                        ),
                        format!("vias {id_a} and {id_b} overlap on layer {layer}"),
                    ));
                }
            }
        }
    }
    out
}
