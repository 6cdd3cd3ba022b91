use crate::bank::{Orientation, TemplateSource};
use crate::candidate::{CandidateSource, MatchCandidate};
use crate::image::OwnedImage;
use crate::model::{LayerId, LayerType, ObjectId, PortId, TemplateId};
use crate::util::{ChipMatchError, ChipMatchResult};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Signal direction of a template port.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PortDirection {
    #[default]
    Undefined,
    In,
    Out,
}

/// Descriptive logic family of a template. Not used by the detectors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LogicClass {
    #[default]
    Undefined,
    Generic,
    Inverter,
    Buffer,
    Nand,
    Nor,
    And,
    Or,
    Xor,
    Xnor,
    Multiplexer,
    Demultiplexer,
    Latch,
    FlipFlop,
    HalfAdder,
    FullAdder,
}

/// Named connection point, positioned relative to the template's top-left.
#[derive(Clone, Debug, PartialEq)]
pub struct TemplatePort {
    pub id: PortId,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub direction: PortDirection,
}

/// Reusable standard-cell definition with one bitmap per layer type.
#[derive(Clone, Debug)]
pub struct GateTemplate {
    id: TemplateId,
    name: String,
    width: usize,
    height: usize,
    logic_class: LogicClass,
    images: BTreeMap<LayerType, Arc<OwnedImage>>,
    ports: Vec<TemplatePort>,
}

impl GateTemplate {
    /// Creates an empty template; the library assigns the id on insertion.
    pub fn new(name: impl Into<String>, width: usize, height: usize) -> Self {
        Self {
            id: TemplateId(0),
            name: name.into(),
            width,
            height,
            logic_class: LogicClass::default(),
            images: BTreeMap::new(),
            ports: Vec::new(),
        }
    }

    pub fn with_logic_class(mut self, logic_class: LogicClass) -> Self {
        self.logic_class = logic_class;
        self
    }

    /// Attaches the bitmap for `layer_type`; it must match the template size.
    pub fn with_image(mut self, layer_type: LayerType, image: OwnedImage) -> ChipMatchResult<Self> {
        if image.width() != self.width || image.height() != self.height {
            return Err(ChipMatchError::InvalidDimensions {
                width: image.width(),
                height: image.height(),
            });
        }
        self.images.insert(layer_type, Arc::new(image));
        Ok(self)
    }

    /// Adds a port and returns its id.
    pub fn add_port(
        &mut self,
        name: impl Into<String>,
        x: f32,
        y: f32,
        direction: PortDirection,
    ) -> PortId {
        let id = PortId(self.ports.iter().map(|p| p.id.0 + 1).max().unwrap_or(0));
        self.ports.push(TemplatePort {
            id,
            name: name.into(),
            x,
            y,
            direction,
        });
        id
    }

    pub fn id(&self) -> TemplateId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn logic_class(&self) -> LogicClass {
        self.logic_class
    }

    pub fn ports(&self) -> &[TemplatePort] {
        &self.ports
    }

    pub fn port(&self, id: PortId) -> Option<&TemplatePort> {
        self.ports.iter().find(|port| port.id == id)
    }

    pub fn image(&self, layer_type: LayerType) -> Option<&OwnedImage> {
        self.images.get(&layer_type).map(|img| img.as_ref())
    }

    /// Matching input for the bitmap of `layer_type`, if present.
    pub fn source(&self, layer_type: LayerType) -> Option<TemplateSource<'_>> {
        self.image(layer_type).map(|img| TemplateSource {
            source: CandidateSource::Template(self.id),
            image: img.view(),
        })
    }
}

/// Registry of gate templates owned by the project.
#[derive(Clone, Debug, Default)]
pub struct GateLibrary {
    templates: BTreeMap<TemplateId, GateTemplate>,
    next_id: u64,
}

impl GateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `template` under a fresh id.
    pub fn add(&mut self, mut template: GateTemplate) -> TemplateId {
        let id = TemplateId(self.next_id);
        self.next_id += 1;
        template.id = id;
        self.templates.insert(id, template);
        id
    }

    pub fn get(&self, id: TemplateId) -> Option<&GateTemplate> {
        self.templates.get(&id)
    }

    pub fn contains(&self, id: TemplateId) -> bool {
        self.templates.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GateTemplate> + '_ {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Removes the template only; instances are handled by [`Graph`].
    ///
    /// [`Graph`]: crate::model::Graph
    pub(crate) fn remove(&mut self, id: TemplateId) -> Option<GateTemplate> {
        self.templates.remove(&id)
    }
}

/// Placed standard cell.
///
/// `id` is assigned by [`Graph::add_gate`](crate::model::Graph::add_gate).
#[derive(Clone, Debug, PartialEq)]
pub struct GateInstance {
    pub id: ObjectId,
    pub template: TemplateId,
    pub layer: LayerId,
    pub x: f32,
    pub y: f32,
    pub orientation: Orientation,
}

impl GateInstance {
    /// Builds an (unregistered) instance from a template-match candidate.
    ///
    /// Returns `None` for candidates that did not come from a gate template.
    pub fn from_candidate(candidate: &MatchCandidate, layer: LayerId) -> Option<Self> {
        match candidate.source {
            CandidateSource::Template(template) => Some(Self {
                id: ObjectId(0),
                template,
                layer,
                x: candidate.x,
                y: candidate.y,
                orientation: candidate.orientation,
            }),
            CandidateSource::Via(_) => None,
        }
    }

    /// Bounding box `[x0, y0, x1, y1]` given the instance's template.
    pub fn bounds(&self, template: &GateTemplate) -> [f32; 4] {
        [
            self.x,
            self.y,
            self.x + template.width() as f32,
            self.y + template.height() as f32,
        ]
    }

    /// Absolute position of `port`, honouring the orientation.
    pub fn port_position(&self, template: &GateTemplate, port: PortId) -> Option<(f32, f32)> {
        let port = template.port(port)?;
        let (x, y) = self.orientation.transform_point(
            port.x,
            port.y,
            template.width() as f32,
            template.height() as f32,
        );
        Some((self.x + x, self.y + y))
    }
}
