use crate::bank::TemplateSource;
use crate::candidate::MatchCandidate;
use crate::geometry::Rect;
use crate::model::{GateInstance, Graph, LayerId, LayerStack, ObjectId, TemplateId, Via, Wire};
use crate::rules::{CheckReport, RuleChecker, ViolationKey};
use crate::run::{Detection, RunContext, RunGate};
use crate::search::{run_template_match, GridConfig, TemplateMatchConfig};
use crate::util::{ChipMatchError, ChipMatchResult};
use crate::via::{run_via_match, ViaMatchConfig};
use crate::wire::{run_wire_match, WireMatchConfig, WirePolyline};
use std::sync::Arc;

/// Top-level state of one reverse-engineering project.
///
/// Detectors read the layers and a snapshot of the graph; results are
/// applied afterwards through the `add_*` methods. Graph edits are
/// copy-on-write, so snapshots handed out earlier stay unchanged.
#[derive(Debug, Default)]
pub struct Project {
    layers: LayerStack,
    graph: Arc<Graph>,
    grid: GridConfig,
    run_gate: RunGate,
    checker: RuleChecker,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut LayerStack {
        &mut self.layers
    }

    /// Removes a layer and every graph object on it.
    ///
    /// Returns the ids of the removed objects.
    pub fn remove_layer(&mut self, id: LayerId) -> ChipMatchResult<Vec<ObjectId>> {
        self.layers.remove(id)?;
        Ok(self.edit(|graph| graph.remove_layer_objects(id)))
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Immutable graph snapshot for a checker or a worker thread.
    pub fn snapshot(&self) -> Arc<Graph> {
        Arc::clone(&self.graph)
    }

    /// Applies an edit to the graph, cloning it first if a snapshot is alive.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut Graph) -> R) -> R {
        f(Arc::make_mut(&mut self.graph))
    }

    pub fn grid(&self) -> &GridConfig {
        &self.grid
    }

    pub fn set_grid(&mut self, grid: GridConfig) -> ChipMatchResult<()> {
        grid.validate()?;
        self.grid = grid;
        Ok(())
    }

    /// Claims the project's single detection slot.
    ///
    /// The returned context releases the slot when dropped. Fails with
    /// `RunInProgress` while another run holds it.
    pub fn start_detection(&self) -> ChipMatchResult<RunContext> {
        Ok(RunContext::with_permit(self.run_gate.try_begin()?))
    }

    pub fn is_detecting(&self) -> bool {
        self.run_gate.is_active()
    }

    /// Bitmaps of `ids` for the type of `layer`.
    ///
    /// Templates without a bitmap for that layer type are skipped.
    pub fn template_sources<'g>(
        &self,
        graph: &'g Graph,
        layer: LayerId,
        ids: &[TemplateId],
    ) -> ChipMatchResult<Vec<TemplateSource<'g>>> {
        let layer_type = self.layers.get(layer)?.layer_type();
        let mut out = Vec::with_capacity(ids.len());
        for &id in ids {
            let template = graph
                .template(id)
                .ok_or(ChipMatchError::UnknownTemplate { id: id.0 })?;
            if let Some(source) = template.source(layer_type) {
                out.push(source);
            }
        }
        Ok(out)
    }

    /// Template matching of `ids` on `layer` with the project grid.
    ///
    /// Like every `detect_*` method it runs under the project's run gate:
    /// `ctx` either comes from [`Project::start_detection`] or the call
    /// claims the gate itself and fails with `RunInProgress` while another
    /// run holds it.
    pub fn detect_gates(
        &self,
        layer: LayerId,
        region: Rect,
        ids: &[TemplateId],
        cfg: &TemplateMatchConfig,
        ctx: &RunContext,
    ) -> ChipMatchResult<Detection<MatchCandidate>> {
        let _permit = self.run_gate.admit(ctx)?;
        let graph = self.snapshot();
        let sources = self.template_sources(&graph, layer, ids)?;
        let image = self.layers.get(layer)?.require_image()?;
        run_template_match(image.view(), region, &sources, cfg, &self.grid, ctx)
    }

    pub fn detect_vias(
        &self,
        base: LayerId,
        region: Rect,
        cfg: &ViaMatchConfig,
        ctx: &RunContext,
    ) -> ChipMatchResult<Detection<MatchCandidate>> {
        let _permit = self.run_gate.admit(ctx)?;
        run_via_match(&self.layers, base, region, cfg, ctx)
    }

    pub fn detect_wires(
        &self,
        layer: LayerId,
        region: Rect,
        cfg: &WireMatchConfig,
        ctx: &RunContext,
    ) -> ChipMatchResult<Detection<WirePolyline>> {
        let _permit = self.run_gate.admit(ctx)?;
        let image = self.layers.get(layer)?.require_image()?;
        run_wire_match(image.view(), region, cfg, ctx)
    }

    /// Turns template-match candidates into gates on `layer`.
    ///
    /// Either every gate is added or, if a candidate names a template that
    /// is not in the library, none is.
    pub fn add_gates(
        &mut self,
        layer: LayerId,
        candidates: &[MatchCandidate],
    ) -> ChipMatchResult<Vec<ObjectId>> {
        self.layers.get(layer)?;
        let gates: Vec<GateInstance> = candidates
            .iter()
            .filter_map(|c| GateInstance::from_candidate(c, layer))
            .collect();
        if let Some(gate) = gates.iter().find(|g| self.graph.template(g.template).is_none()) {
            return Err(ChipMatchError::UnknownTemplate {
                id: gate.template.0,
            });
        }
        self.edit(|graph| gates.into_iter().map(|gate| graph.add_gate(gate)).collect())
    }

    /// Turns via candidates into vias of `diameter` on `layer`.
    pub fn add_vias(
        &mut self,
        layer: LayerId,
        candidates: &[MatchCandidate],
        diameter: f32,
    ) -> ChipMatchResult<Vec<ObjectId>> {
        self.layers.get(layer)?;
        Ok(self.edit(|graph| {
            candidates
                .iter()
                .filter_map(|c| Via::from_candidate(c, layer, diameter))
                .map(|via| graph.add_via(via))
                .collect()
        }))
    }

    pub fn add_wires(
        &mut self,
        layer: LayerId,
        polylines: &[WirePolyline],
    ) -> ChipMatchResult<Vec<ObjectId>> {
        self.layers.get(layer)?;
        Ok(self.edit(|graph| {
            polylines
                .iter()
                .map(|p| graph.add_wire(Wire::new(layer, p.points.clone(), p.diameter)))
                .collect()
        }))
    }

    /// Runs the rule checker on the current graph.
    ///
    /// Objects on a layer that is no longer in the stack make the graph
    /// malformed.
    pub fn check_rules(&mut self) -> ChipMatchResult<CheckReport> {
        let graph = self.snapshot();
        if let Some((id, layer)) = graph
            .layer_refs()
            .find(|&(_, layer)| self.layers.get(layer).is_err())
        {
            return Err(ChipMatchError::MalformedGraph {
                reason: format!("object {id} references missing layer {layer}"),
            });
        }
        self.checker.run(&graph)
    }

    pub fn accept_violation(&mut self, key: ViolationKey) -> bool {
        self.checker.accept(key)
    }

    pub fn unaccept_violation(&mut self, key: &ViolationKey) -> bool {
        self.checker.unaccept(key)
    }

    pub fn checker(&self) -> &RuleChecker {
        &self.checker
    }
}

#[cfg(test)]
mod tests {
    use super::Project;
    use crate::bank::Orientation;
    use crate::candidate::{CandidateSource, MatchCandidate};
    use crate::model::{GateTemplate, LayerId, LayerType, TemplateId, Via, ViaDirection, Wire};
    use crate::util::ChipMatchError;

    fn candidate(template: TemplateId, x: f32) -> MatchCandidate {
        MatchCandidate {
            x,
            y: 0.0,
            width: 8.0,
            height: 8.0,
            orientation: Orientation::Normal,
            score: 0.9,
            source: CandidateSource::Template(template),
        }
    }

    #[test]
    fn one_detection_at_a_time() {
        let project = Project::new();
        let ctx = project.start_detection().unwrap();
        assert!(project.is_detecting());
        assert_eq!(
            project.start_detection().err(),
            Some(ChipMatchError::RunInProgress)
        );
        drop(ctx);
        assert!(!project.is_detecting());
    }

    #[test]
    fn snapshots_are_isolated_from_edits() {
        let mut project = Project::new();
        let layer = project.layers_mut().push(LayerType::Metal);
        let before = project.snapshot();
        project.edit(|g| g.add_via(Via::new(layer, 4.0, 4.0, 3.0, ViaDirection::Up)));
        assert_eq!(before.vias().count(), 0);
        assert_eq!(project.graph().vias().count(), 1);
    }

    #[test]
    fn add_gates_is_all_or_nothing() {
        let mut project = Project::new();
        let layer = project.layers_mut().push(LayerType::Logic);
        let known = project.edit(|g| g.add_template(GateTemplate::new("INV", 8, 8)));
        let missing = TemplateId(known.0 + 5);

        let err = project
            .add_gates(layer, &[candidate(known, 0.0), candidate(missing, 20.0)])
            .unwrap_err();
        assert_eq!(err, ChipMatchError::UnknownTemplate { id: missing.0 });
        assert_eq!(project.graph().gates().count(), 0);

        let ids = project.add_gates(layer, &[candidate(known, 0.0)]).unwrap();
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn removing_a_layer_drops_its_objects() {
        let mut project = Project::new();
        let logic = project.layers_mut().push(LayerType::Logic);
        let metal = project.layers_mut().push(LayerType::Metal);
        let kept = project.edit(|g| g.add_via(Via::new(logic, 2.0, 2.0, 2.0, ViaDirection::Up)));
        let wire = project.edit(|g| g.add_wire(Wire::new(metal, vec![[0.0, 5.0], [9.0, 5.0]], 2.0)));

        assert_eq!(project.remove_layer(metal).unwrap(), vec![wire]);
        assert!(project.graph().via(kept).is_some());
        assert!(project.check_rules().is_ok());

        project.edit(|g| g.add_via(Via::new(LayerId(42), 0.0, 0.0, 2.0, ViaDirection::Up)));
        assert!(matches!(
            project.check_rules(),
            Err(ChipMatchError::MalformedGraph { .. })
        ));
    }
}
