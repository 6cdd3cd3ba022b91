use crate::image::OwnedImage;
use crate::model::{LayerId, ViaDirection};
use crate::util::{ChipMatchError, ChipMatchResult};
use std::sync::Arc;

/// Physical role of a layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerType {
    #[default]
    Undefined,
    Transistor,
    Logic,
    Metal,
}

/// One chip layer with its (shared, read-only) images.
#[derive(Clone, Debug)]
pub struct Layer {
    id: LayerId,
    position: usize,
    layer_type: LayerType,
    enabled: bool,
    image: Option<Arc<OwnedImage>>,
    background: Option<Arc<OwnedImage>>,
}

impl Layer {
    pub fn id(&self) -> LayerId {
        self.id
    }

    /// Stack position, 0 is the bottom layer.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn layer_type(&self) -> LayerType {
        self.layer_type
    }

    pub fn set_layer_type(&mut self, layer_type: LayerType) {
        self.layer_type = layer_type;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn image(&self) -> Option<&OwnedImage> {
        self.image.as_deref()
    }

    /// Shared handle for handing the image to a worker thread.
    pub fn image_handle(&self) -> Option<Arc<OwnedImage>> {
        self.image.clone()
    }

    pub fn set_image(&mut self, image: OwnedImage) {
        self.image = Some(Arc::new(image));
    }

    pub fn background(&self) -> Option<&OwnedImage> {
        self.background.as_deref()
    }

    pub fn set_background(&mut self, image: Option<OwnedImage>) {
        self.background = image.map(Arc::new);
    }

    /// Returns the image or a `MissingImage` resource error.
    pub fn require_image(&self) -> ChipMatchResult<&OwnedImage> {
        self.image()
            .ok_or(ChipMatchError::MissingImage { id: self.id.0 })
    }
}

/// Layers ordered bottom to top.
#[derive(Clone, Debug, Default)]
pub struct LayerStack {
    layers: Vec<Layer>,
    next_id: u32,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an enabled layer on top of the stack.
    pub fn push(&mut self, layer_type: LayerType) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        self.layers.push(Layer {
            id,
            position: self.layers.len(),
            layer_type,
            enabled: true,
            image: None,
            background: None,
        });
        id
    }

    /// Removes a layer and closes the gap in positions.
    ///
    /// Objects of a project graph are not touched; use
    /// [`Project::remove_layer`](crate::model::Project::remove_layer) there.
    pub fn remove(&mut self, id: LayerId) -> ChipMatchResult<Layer> {
        let idx = self.index_of(id)?;
        let removed = self.layers.remove(idx);
        for (position, layer) in self.layers.iter_mut().enumerate() {
            layer.position = position;
        }
        Ok(removed)
    }

    pub fn get(&self, id: LayerId) -> ChipMatchResult<&Layer> {
        let idx = self.index_of(id)?;
        Ok(&self.layers[idx])
    }

    pub fn get_mut(&mut self, id: LayerId) -> ChipMatchResult<&mut Layer> {
        let idx = self.index_of(id)?;
        Ok(&mut self.layers[idx])
    }

    pub fn at_position(&self, position: usize) -> Option<&Layer> {
        self.layers.get(position)
    }

    /// Layer a via in `direction` leads to: one position up or down.
    pub fn adjacent(&self, base: LayerId, direction: ViaDirection) -> ChipMatchResult<&Layer> {
        let position = self.get(base)?.position;
        let target = match direction {
            ViaDirection::Up => position.checked_add(1),
            ViaDirection::Down => position.checked_sub(1),
            ViaDirection::Undefined => {
                return Err(ChipMatchError::InvalidConfig {
                    reason: "via direction must be up or down",
                })
            }
        };
        target
            .and_then(|p| self.layers.get(p))
            .ok_or(ChipMatchError::NoAdjacentLayer { base: base.0 })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> + '_ {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    fn index_of(&self, id: LayerId) -> ChipMatchResult<usize> {
        self.layers
            .iter()
            .position(|layer| layer.id == id)
            .ok_or(ChipMatchError::UnknownLayer { id: id.0 })
    }
}
