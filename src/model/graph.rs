use crate::candidate::{CandidateSource, MatchCandidate};
use crate::geometry::Rect;
use crate::model::{
    GateInstance, GateLibrary, GateTemplate, LayerId, NetId, ObjectId, ObjectRef, TemplateId,
};
use crate::util::{ChipMatchError, ChipMatchResult};
use std::collections::{BTreeMap, BTreeSet};

/// Direction of an interlayer connection, relative to the layer it sits on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViaDirection {
    #[default]
    Undefined,
    Up,
    Down,
}

/// Interlayer connection; `x`/`y` is the disc center.
#[derive(Clone, Debug, PartialEq)]
pub struct Via {
    pub id: ObjectId,
    pub layer: LayerId,
    pub x: f32,
    pub y: f32,
    pub diameter: f32,
    pub direction: ViaDirection,
}

impl Via {
    pub fn new(layer: LayerId, x: f32, y: f32, diameter: f32, direction: ViaDirection) -> Self {
        Self {
            id: ObjectId(0),
            layer,
            x,
            y,
            diameter,
            direction,
        }
    }

    /// Via centered on a via-match candidate.
    pub fn from_candidate(candidate: &MatchCandidate, layer: LayerId, diameter: f32) -> Option<Self> {
        match candidate.source {
            CandidateSource::Via(direction) => {
                let (x, y) = candidate.center();
                Some(Self::new(layer, x, y, diameter, direction))
            }
            CandidateSource::Template(_) => None,
        }
    }

    pub fn radius(&self) -> f32 {
        self.diameter * 0.5
    }
}

/// Metal trace described by its centerline.
#[derive(Clone, Debug, PartialEq)]
pub struct Wire {
    pub id: ObjectId,
    pub layer: LayerId,
    pub points: Vec<[f32; 2]>,
    pub diameter: f32,
}

impl Wire {
    pub fn new(layer: LayerId, points: Vec<[f32; 2]>, diameter: f32) -> Self {
        Self {
            id: ObjectId(0),
            layer,
            points,
            diameter,
        }
    }
}

/// Free text attached to a rectangle of a layer.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub id: ObjectId,
    pub layer: LayerId,
    pub bounds: Rect,
    pub text: String,
}

impl Annotation {
    pub fn new(layer: LayerId, bounds: Rect, text: impl Into<String>) -> Self {
        Self {
            id: ObjectId(0),
            layer,
            bounds,
            text: text.into(),
        }
    }
}

/// Set of electrically joined ports, vias and wires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Net {
    pub id: NetId,
    pub members: BTreeSet<ObjectRef>,
}

impl Net {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, member: &ObjectRef) -> bool {
        self.members.contains(member)
    }
}

/// Structural graph of a project: gate library, placed objects and nets.
///
/// Mutating operations keep the graph well formed. [`Graph::from_parts`] is
/// the unchecked entry point for data restored from elsewhere; run
/// [`Graph::validate`] on such graphs before trusting them.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    library: GateLibrary,
    gates: BTreeMap<ObjectId, GateInstance>,
    vias: BTreeMap<ObjectId, Via>,
    wires: BTreeMap<ObjectId, Wire>,
    annotations: BTreeMap<ObjectId, Annotation>,
    nets: BTreeMap<NetId, Net>,
    next_object: u64,
    next_net: u64,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assembles a graph from existing objects without validation.
    ///
    /// Ids are taken as given; fresh ids continue after the largest one.
    pub fn from_parts(
        library: GateLibrary,
        gates: Vec<GateInstance>,
        vias: Vec<Via>,
        wires: Vec<Wire>,
        annotations: Vec<Annotation>,
        nets: Vec<Net>,
    ) -> Self {
        let mut graph = Self {
            library,
            gates: gates.into_iter().map(|g| (g.id, g)).collect(),
            vias: vias.into_iter().map(|v| (v.id, v)).collect(),
            wires: wires.into_iter().map(|w| (w.id, w)).collect(),
            annotations: annotations.into_iter().map(|a| (a.id, a)).collect(),
            nets: nets.into_iter().map(|n| (n.id, n)).collect(),
            next_object: 0,
            next_net: 0,
        };
        graph.next_object = graph
            .gates
            .keys()
            .chain(graph.vias.keys())
            .chain(graph.wires.keys())
            .chain(graph.annotations.keys())
            .map(|id| id.0 + 1)
            .max()
            .unwrap_or(0);
        graph.next_net = graph.nets.keys().map(|id| id.0 + 1).max().unwrap_or(0);
        graph
    }

    pub fn library(&self) -> &GateLibrary {
        &self.library
    }

    pub fn template(&self, id: TemplateId) -> Option<&GateTemplate> {
        self.library.get(id)
    }

    pub fn add_template(&mut self, template: GateTemplate) -> TemplateId {
        self.library.add(template)
    }

    /// Deletes a template together with its instances and their net
    /// memberships. Returns the ids of the removed instances.
    pub fn remove_template(&mut self, id: TemplateId) -> ChipMatchResult<Vec<ObjectId>> {
        self.library
            .remove(id)
            .ok_or(ChipMatchError::UnknownTemplate { id: id.0 })?;
        let doomed: Vec<ObjectId> = self
            .gates
            .values()
            .filter(|gate| gate.template == id)
            .map(|gate| gate.id)
            .collect();
        for gate in &doomed {
            self.gates.remove(gate);
            self.detach_where(|member| member.object_id() == *gate);
        }
        Ok(doomed)
    }

    /// Deletes every gate, via, wire and annotation on `layer` together with
    /// their net memberships. Returns the removed ids in ascending order.
    pub fn remove_layer_objects(&mut self, layer: LayerId) -> Vec<ObjectId> {
        let doomed: BTreeSet<ObjectId> = self
            .layer_refs()
            .filter(|&(_, on)| on == layer)
            .map(|(id, _)| id)
            .collect();
        for id in &doomed {
            self.gates.remove(id);
            self.vias.remove(id);
            self.wires.remove(id);
            self.annotations.remove(id);
        }
        self.detach_where(|member| doomed.contains(&member.object_id()));
        doomed.into_iter().collect()
    }

    /// Every object id with the layer it sits on.
    pub fn layer_refs(&self) -> impl Iterator<Item = (ObjectId, LayerId)> + '_ {
        let gates = self.gates.values().map(|g| (g.id, g.layer));
        let vias = self.vias.values().map(|v| (v.id, v.layer));
        let wires = self.wires.values().map(|w| (w.id, w.layer));
        let notes = self.annotations.values().map(|a| (a.id, a.layer));
        gates.chain(vias).chain(wires).chain(notes)
    }

    /// Places a gate; its template must exist in the library.
    pub fn add_gate(&mut self, mut gate: GateInstance) -> ChipMatchResult<ObjectId> {
        if !self.library.contains(gate.template) {
            return Err(ChipMatchError::UnknownTemplate {
                id: gate.template.0,
            });
        }
        gate.id = self.alloc_object();
        let id = gate.id;
        self.gates.insert(id, gate);
        Ok(id)
    }

    pub fn add_via(&mut self, mut via: Via) -> ObjectId {
        via.id = self.alloc_object();
        let id = via.id;
        self.vias.insert(id, via);
        id
    }

    pub fn add_wire(&mut self, mut wire: Wire) -> ObjectId {
        wire.id = self.alloc_object();
        let id = wire.id;
        self.wires.insert(id, wire);
        id
    }

    pub fn add_annotation(&mut self, mut annotation: Annotation) -> ObjectId {
        annotation.id = self.alloc_object();
        let id = annotation.id;
        self.annotations.insert(id, annotation);
        id
    }

    /// Deletes any object and drops it (or its ports) from every net.
    pub fn remove_object(&mut self, id: ObjectId) -> ChipMatchResult<ObjectRef> {
        let removed = if self.gates.remove(&id).is_some() {
            ObjectRef::Gate(id)
        } else if self.vias.remove(&id).is_some() {
            ObjectRef::Via(id)
        } else if self.wires.remove(&id).is_some() {
            ObjectRef::Wire(id)
        } else if self.annotations.remove(&id).is_some() {
            ObjectRef::Annotation(id)
        } else {
            return Err(ChipMatchError::UnknownObject { id: id.0 });
        };
        self.detach_where(|member| member.object_id() == id);
        Ok(removed)
    }

    /// Joins `a` and `b` into one net, merging their nets if needed.
    pub fn connect(&mut self, a: ObjectRef, b: ObjectRef) -> ChipMatchResult<NetId> {
        for member in [a, b] {
            if !member.is_connectable() {
                return Err(ChipMatchError::InvalidConfig {
                    reason: "only ports, vias and wires can be connected",
                });
            }
            if !self.contains(&member) {
                return Err(ChipMatchError::UnknownObject {
                    id: member.object_id().0,
                });
            }
        }

        let net_a = self.net_id_of(&a);
        let net_b = self.net_id_of(&b);
        let target = match (net_a, net_b) {
            (Some(x), Some(y)) if x == y => return Ok(x),
            (Some(x), Some(y)) => {
                let (keep, drop) = if x < y { (x, y) } else { (y, x) };
                let moved = self
                    .nets
                    .remove(&drop)
                    .map(|net| net.members)
                    .unwrap_or_default();
                if let Some(net) = self.nets.get_mut(&keep) {
                    net.members.extend(moved);
                }
                keep
            }
            (Some(x), None) | (None, Some(x)) => x,
            (None, None) => {
                let id = NetId(self.next_net);
                self.next_net += 1;
                self.nets.insert(
                    id,
                    Net {
                        id,
                        members: BTreeSet::new(),
                    },
                );
                id
            }
        };
        if let Some(net) = self.nets.get_mut(&target) {
            net.members.insert(a);
            net.members.insert(b);
        }
        Ok(target)
    }

    /// Removes `member` from its net; empty nets disappear.
    pub fn disconnect(&mut self, member: ObjectRef) -> ChipMatchResult<()> {
        if self.net_id_of(&member).is_none() {
            return Err(ChipMatchError::UnknownObject {
                id: member.object_id().0,
            });
        }
        self.detach_where(|m| *m == member);
        Ok(())
    }

    pub fn net_of(&self, member: &ObjectRef) -> Option<&Net> {
        self.nets.values().find(|net| net.contains(member))
    }

    fn net_id_of(&self, member: &ObjectRef) -> Option<NetId> {
        self.net_of(member).map(|net| net.id)
    }

    /// Returns true if the referenced object (and port) exists.
    pub fn contains(&self, member: &ObjectRef) -> bool {
        match *member {
            ObjectRef::Gate(id) => self.gates.contains_key(&id),
            ObjectRef::Port { gate, port } => self
                .gates
                .get(&gate)
                .and_then(|g| self.library.get(g.template))
                .is_some_and(|tpl| tpl.port(port).is_some()),
            ObjectRef::Via(id) => self.vias.contains_key(&id),
            ObjectRef::Wire(id) => self.wires.contains_key(&id),
            ObjectRef::Annotation(id) => self.annotations.contains_key(&id),
        }
    }

    pub fn gate(&self, id: ObjectId) -> Option<&GateInstance> {
        self.gates.get(&id)
    }

    pub fn via(&self, id: ObjectId) -> Option<&Via> {
        self.vias.get(&id)
    }

    pub fn wire(&self, id: ObjectId) -> Option<&Wire> {
        self.wires.get(&id)
    }

    pub fn annotation(&self, id: ObjectId) -> Option<&Annotation> {
        self.annotations.get(&id)
    }

    pub fn gates(&self) -> impl Iterator<Item = &GateInstance> + '_ {
        self.gates.values()
    }

    pub fn vias(&self) -> impl Iterator<Item = &Via> + '_ {
        self.vias.values()
    }

    pub fn wires(&self) -> impl Iterator<Item = &Wire> + '_ {
        self.wires.values()
    }

    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> + '_ {
        self.annotations.values()
    }

    pub fn nets(&self) -> impl Iterator<Item = &Net> + '_ {
        self.nets.values()
    }

    /// Template of a placed gate, if both exist.
    pub fn template_of(&self, gate: ObjectId) -> Option<&GateTemplate> {
        self.gates
            .get(&gate)
            .and_then(|g| self.library.get(g.template))
    }

    /// Checks the structural invariants the rule checker relies on.
    pub fn validate(&self) -> ChipMatchResult<()> {
        for gate in self.gates.values() {
            if !self.library.contains(gate.template) {
                return Err(malformed(format!(
                    "gate {} references missing template {}",
                    gate.id, gate.template
                )));
            }
        }

        let mut seen: BTreeMap<ObjectRef, NetId> = BTreeMap::new();
        for net in self.nets.values() {
            for member in &net.members {
                if !member.is_connectable() {
                    return Err(malformed(format!(
                        "net {} contains non-connectable {member}",
                        net.id
                    )));
                }
                if !self.contains(member) {
                    return Err(malformed(format!(
                        "net {} references missing {member}",
                        net.id
                    )));
                }
                if let Some(other) = seen.insert(*member, net.id) {
                    return Err(malformed(format!(
                        "{member} belongs to nets {other} and {}",
                        net.id
                    )));
                }
            }
        }
        Ok(())
    }

    fn alloc_object(&mut self) -> ObjectId {
        let id = ObjectId(self.next_object);
        self.next_object += 1;
        id
    }

    fn detach_where<F>(&mut self, mut pred: F)
    where
        F: FnMut(&ObjectRef) -> bool,
    {
        for net in self.nets.values_mut() {
            net.members.retain(|member| !pred(member));
        }
        self.nets.retain(|_, net| !net.is_empty());
    }
}

fn malformed(reason: String) -> ChipMatchError {
    ChipMatchError::MalformedGraph { reason }
}

#[cfg(test)]
mod tests {
    use super::{Graph, Via, ViaDirection, Wire};
    use crate::bank::Orientation;
    use crate::model::{
        GateInstance, GateTemplate, LayerId, ObjectId, ObjectRef, PortDirection, PortId,
    };
    use crate::util::ChipMatchError;

    fn gate(template: crate::model::TemplateId) -> GateInstance {
        GateInstance {
            id: ObjectId(0),
            template,
            layer: LayerId(0),
            x: 0.0,
            y: 0.0,
            orientation: Orientation::Normal,
        }
    }

    #[test]
    fn connect_merges_nets() {
        let mut graph = Graph::new();
        let a = ObjectRef::Via(graph.add_via(Via::new(LayerId(0), 1.0, 1.0, 4.0, ViaDirection::Up)));
        let b = ObjectRef::Via(graph.add_via(Via::new(LayerId(0), 9.0, 1.0, 4.0, ViaDirection::Up)));
        let w = ObjectRef::Wire(graph.add_wire(Wire::new(
            LayerId(0),
            vec![[20.0, 0.0], [30.0, 0.0]],
            3.0,
        )));
        let wire_b = ObjectRef::Wire(graph.add_wire(Wire::new(
            LayerId(0),
            vec![[40.0, 0.0], [50.0, 0.0]],
            3.0,
        )));

        let n1 = graph.connect(a, w).unwrap();
        let n2 = graph.connect(b, wire_b).unwrap();
        assert_ne!(n1, n2);
        let merged = graph.connect(w, b).unwrap();
        assert_eq!(graph.nets().count(), 1);
        assert_eq!(graph.net_of(&wire_b).unwrap().id, merged);
        assert_eq!(graph.net_of(&a).unwrap().len(), 4);
        graph.validate().unwrap();
    }

    #[test]
    fn template_removal_cascades() {
        let mut graph = Graph::new();
        let mut tpl = GateTemplate::new("buf", 8, 8);
        let port = tpl.add_port("Y", 7.0, 4.0, PortDirection::Out);
        let tid = graph.add_template(tpl);
        let g = graph.add_gate(gate(tid)).unwrap();
        let via = ObjectRef::Via(graph.add_via(Via::new(LayerId(0), 3.0, 3.0, 2.0, ViaDirection::Down)));
        graph.connect(ObjectRef::Port { gate: g, port }, via).unwrap();

        assert_eq!(graph.remove_template(tid).unwrap(), vec![g]);
        assert!(graph.gate(g).is_none());
        assert!(graph.net_of(&via).is_none());
        graph.validate().unwrap();
    }

    #[test]
    fn layer_removal_cascades() {
        let mut graph = Graph::new();
        let top = LayerId(1);
        let kept = graph.add_via(Via::new(LayerId(0), 1.0, 1.0, 2.0, ViaDirection::Up));
        let via = graph.add_via(Via::new(top, 1.0, 1.0, 2.0, ViaDirection::Down));
        let wire = graph.add_wire(Wire::new(top, vec![[0.0, 0.0], [9.0, 0.0]], 2.0));
        graph
            .connect(ObjectRef::Via(kept), ObjectRef::Wire(wire))
            .unwrap();

        assert_eq!(graph.remove_layer_objects(top), vec![via, wire]);
        assert!(graph.via(via).is_none() && graph.wire(wire).is_none());
        assert_eq!(graph.net_of(&ObjectRef::Via(kept)).unwrap().len(), 1);
        assert!(graph.layer_refs().all(|(_, layer)| layer == LayerId(0)));
        graph.validate().unwrap();
    }

    #[test]
    fn rejects_unknown_template_and_port() {
        let mut graph = Graph::new();
        let err = graph.add_gate(gate(crate::model::TemplateId(7))).unwrap_err();
        assert_eq!(err, ChipMatchError::UnknownTemplate { id: 7 });

        let tid = graph.add_template(GateTemplate::new("nop", 4, 4));
        let g = graph.add_gate(gate(tid)).unwrap();
        let v = ObjectRef::Via(graph.add_via(Via::new(LayerId(0), 0.0, 0.0, 2.0, ViaDirection::Up)));
        let missing = ObjectRef::Port {
            gate: g,
            port: PortId(3),
        };
        assert!(graph.connect(missing, v).is_err());
        assert!(graph.connect(ObjectRef::Gate(g), v).is_err());
    }
}
