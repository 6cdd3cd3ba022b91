//! Connection and driver rules.

use crate::model::{Graph, LayerId, Net, ObjectRef, PortDirection};
use crate::rules::{NetIndex, RuleId, RuleViolation, ViolationKey};

pub(super) fn open_ports(graph: &Graph, nets: &NetIndex<'_>) -> Vec<RuleViolation> {
    let mut out = Vec::new();
    for gate in graph.gates() {
        let Some(template) = graph.template(gate.template) else {
            continue;
        };
        for port in template.ports() {
            let target = ObjectRef::Port {
                gate: gate.id,
                port: port.id,
            };
            if !nets.is_connected(&target) {
                out.push(RuleViolation::new(
                    ViolationKey::new(RuleId::OpenPort, vec![target], Some(gate.layer)),
                    format!(
                        "port '{}' of {} gate {} is not connected",
                        port.name,
                        template.name(),
                        gate.id
                    ),
                ));
            }
        }
    }
    out
}

pub(super) fn unconnected_vias(graph: &Graph, nets: &NetIndex<'_>) -> Vec<RuleViolation> {
    graph
        .vias()
        .filter(|via| !nets.is_connected(&ObjectRef::Via(via.id)))
        .map(|via| {
            RuleViolation::new(
                ViolationKey::new(
                    RuleId::UnconnectedVia,
                    vec![ObjectRef::Via(via.id)],
                    Some(via.layer),
                ),
                format!("via {} at ({:.1}, {:.1}) is not connected", via.id, via.x, via.y),
            )
        })
        .collect()
}

pub(super) fn unconnected_wires(graph: &Graph, nets: &NetIndex<'_>) -> Vec<RuleViolation> {
    graph
        .wires()
        .filter(|wire| !nets.is_connected(&ObjectRef::Wire(wire.id)))
        .map(|wire| {
            RuleViolation::new(
                ViolationKey::new(
                    RuleId::UnconnectedWire,
                    vec![ObjectRef::Wire(wire.id)],
                    Some(wire.layer),
                ),
                format!("wire {} is not connected", wire.id),
            )
        })
        .collect()
}

/// Ports of `net` with the given direction.
fn ports_with(graph: &Graph, net: &Net, direction: PortDirection) -> Vec<ObjectRef> {
    net.members
        .iter()
        .filter(|member| match member {
            ObjectRef::Port { gate, port } => graph
                .template_of(*gate)
                .and_then(|tpl| tpl.port(*port))
                .is_some_and(|p| p.direction == direction),
            _ => false,
        })
        .copied()
        .collect()
}

/// Layer shared by every target gate, if there is one.
fn common_layer(graph: &Graph, targets: &[ObjectRef]) -> Option<LayerId> {
    let mut layers = targets
        .iter()
        .filter_map(|t| graph.gate(t.object_id()).map(|g| g.layer));
    let first = layers.next()?;
    layers.all(|l| l == first).then_some(first)
}

pub(super) fn multiple_drivers(graph: &Graph) -> Vec<RuleViolation> {
    let mut out = Vec::new();
    for net in graph.nets() {
        let drivers = ports_with(graph, net, PortDirection::Out);
        if drivers.len() > 1 {
            let layer = common_layer(graph, &drivers);
            let count = drivers.len();
            out.push(RuleViolation::new(
                ViolationKey::new(RuleId::MultipleDrivers, drivers, layer),
                format!("net {} is driven by {count} outputs", net.id),
            ));
        }
    }
    out
}

pub(super) fn undriven_nets(graph: &Graph) -> Vec<RuleViolation> {
    let mut out = Vec::new();
    for net in graph.nets() {
        let inputs = ports_with(graph, net, PortDirection::In);
        if !inputs.is_empty() && ports_with(graph, net, PortDirection::Out).is_empty() {
            let layer = common_layer(graph, &inputs);
            let count = inputs.len();
            out.push(RuleViolation::new(
                ViolationKey::new(RuleId::UndrivenNet, inputs, layer),
                format!("net {} feeds {count} inputs but has no driver", net.id),
            ));
        }
    }
    out
}
