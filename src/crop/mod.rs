//! Interactive crop-region state machine
//!
//! The crop region is a square in display space. All mutation goes through
//! [`CropState::apply`], which turns one [`CropEvent`] into either a new
//! region that satisfies every invariant or no change at all.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::errors::DomainError;
use crate::domain::geometry;
use crate::domain::model::*;

/// Smallest allowed crop edge, in display pixels
pub const DEFAULT_MIN_SIZE: f64 = 50.0;

/// Initial crop edge as a fraction of the smaller display dimension
pub const DEFAULT_INITIAL_FRACTION: f64 = 0.4;

/// Distance from a corner, in display pixels, that still grabs its handle
pub const DEFAULT_HANDLE_RADIUS: f64 = 8.0;

/// How the region reacts when the container changes size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizePolicy {
    /// Keep pixel coordinates, only clamp back inside the container
    #[default]
    Reclamp,
    /// Scale the region with the media's new display rect
    Refit,
}

/// Tunables for the crop controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropSettings {
    pub min_size: f64,
    pub initial_fraction: f64,
    pub handle_radius: f64,
    pub resize_policy: ResizePolicy,
}

impl Default for CropSettings {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_SIZE,
            initial_fraction: DEFAULT_INITIAL_FRACTION,
            handle_radius: DEFAULT_HANDLE_RADIUS,
            resize_policy: ResizePolicy::Reclamp,
        }
    }
}

/// Current pointer interaction
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    /// Moving the whole region; `grab_offset` is pointer minus region origin
    Dragging { grab_offset: Point },
    /// Dragging `corner` while the opposite corner stays at `anchor`
    Resizing { corner: Corner, anchor: Point },
}

/// What a pointer-down landed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerTarget {
    Body,
    #[serde(untagged)]
    Handle(Corner),
}

/// Keyboard keys relevant to the focused region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Other(String),
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        match name.as_str() {
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            "ArrowUp" => Key::ArrowUp,
            "ArrowDown" => Key::ArrowDown,
            _ => Key::Other(name),
        }
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        match key {
            Key::ArrowLeft => "ArrowLeft".to_string(),
            Key::ArrowRight => "ArrowRight".to_string(),
            Key::ArrowUp => "ArrowUp".to_string(),
            Key::ArrowDown => "ArrowDown".to_string(),
            Key::Other(name) => name,
        }
    }
}

/// Input events consumed by the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CropEvent {
    /// Pointer pressed; without a target the controller hit-tests the point
    PointerDown {
        x: f64,
        y: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<PointerTarget>,
    },
    PointerMove { x: f64, y: f64 },
    PointerUp,
    KeyDown {
        key: Key,
        #[serde(default)]
        modifier: bool,
    },
    ContainerResized { width: f64, height: f64 },
}

/// Result of applying one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The region moved or changed size
    Applied,
    /// The event was consumed but the region is unchanged (including rejected resizes)
    NoChange,
    /// The event is not for the crop region; the caller keeps its default handling
    Ignored,
}

/// Complete controller state: container, media, region and interaction
#[derive(Debug, Clone, PartialEq)]
pub struct CropState {
    pub container: Size,
    pub media: MediaDimensions,
    pub region: CropRegion,
    pub interaction: InteractionState,
}

impl CropState {
    /// Place the default region for freshly loaded media
    pub fn new(container: Size, media: MediaDimensions, settings: &CropSettings) -> Result<Self, DomainError> {
        let region = initial_region(container, media, settings)?;
        Ok(Self {
            container,
            media,
            region,
            interaction: InteractionState::Idle,
        })
    }

    pub fn display_rect(&self) -> DisplayRect {
        geometry::compute_display_rect(self.container, self.media)
    }

    /// Region in native media pixels
    pub fn source_crop(&self) -> SourceCropParams {
        geometry::to_source_crop(&self.region, &self.display_rect(), self.media)
    }

    /// Apply one event atomically
    pub fn apply(&mut self, event: &CropEvent, settings: &CropSettings) -> Result<EventOutcome, DomainError> {
        match event {
            CropEvent::PointerDown { x, y, target } => {
                let pointer = Point::new(*x, *y);
                let target = match target {
                    Some(t) => Some(*t),
                    None => hit_test(&self.region, pointer, settings.handle_radius),
                };
                self.interaction = match target {
                    Some(PointerTarget::Body) => InteractionState::Dragging {
                        grab_offset: Point::new(pointer.x - self.region.x, pointer.y - self.region.y),
                    },
                    Some(PointerTarget::Handle(corner)) => InteractionState::Resizing {
                        corner,
                        anchor: self.region.corner(corner.opposite()),
                    },
                    None => InteractionState::Idle,
                };
                debug!("Pointer down at ({}, {}): {:?}", x, y, self.interaction);
                Ok(EventOutcome::NoChange)
            }
            CropEvent::PointerMove { x, y } => {
                let pointer = Point::new(*x, *y);
                let candidate = match self.interaction {
                    InteractionState::Idle => return Ok(EventOutcome::NoChange),
                    InteractionState::Dragging { grab_offset } => {
                        drag_region(&self.region, self.container, pointer, grab_offset)
                    }
                    InteractionState::Resizing { corner, anchor } => {
                        resize_region(self.container, settings.min_size, corner, anchor, pointer)
                    }
                };
                Ok(self.commit(candidate, settings.min_size))
            }
            CropEvent::PointerUp => {
                self.interaction = InteractionState::Idle;
                Ok(EventOutcome::NoChange)
            }
            CropEvent::KeyDown { key, modifier } => {
                let step = if *modifier { 10.0 } else { 1.0 };
                match nudge_region(&self.region, self.container, key, step) {
                    Some(candidate) => Ok(self.commit(Some(candidate), settings.min_size)),
                    None => Ok(EventOutcome::Ignored),
                }
            }
            CropEvent::ContainerResized { width, height } => {
                let container = Size::new(*width, *height)?;
                let candidate = match settings.resize_policy {
                    ResizePolicy::Reclamp => reclamp_region(&self.region, container, settings.min_size)?,
                    ResizePolicy::Refit => {
                        let old_rect = self.display_rect();
                        let new_rect = geometry::compute_display_rect(container, self.media);
                        let refit = refit_region(&self.region, &old_rect, &new_rect);
                        reclamp_region(&refit, container, settings.min_size)?
                    }
                };
                candidate.validate(container, settings.min_size)?;
                debug!(
                    "Container resized to {}x{} ({:?})",
                    container.width, container.height, settings.resize_policy
                );
                self.container = container;
                // An anchor captured against the old layout is meaningless now
                self.interaction = InteractionState::Idle;
                Ok(self.commit(Some(candidate), settings.min_size))
            }
        }
    }

    /// Adopt `candidate` only if it satisfies every invariant in the current container
    fn commit(&mut self, candidate: Option<CropRegion>, min_size: f64) -> EventOutcome {
        match candidate {
            Some(region) if region != self.region && region.satisfies(self.container, min_size) => {
                self.region = region;
                EventOutcome::Applied
            }
            _ => EventOutcome::NoChange,
        }
    }
}

/// Largest origin for which `origin + size <= extent` holds in floating point
pub fn max_origin(extent: f64, size: f64) -> f64 {
    let mut origin = (extent - size).max(0.0);
    while origin > 0.0 && origin + size > extent {
        origin = f64::from_bits(origin.to_bits() - 1);
    }
    origin
}

/// Default region: `initial_fraction` of the smaller display side, centered in the display rect
pub fn initial_region(container: Size, media: MediaDimensions, settings: &CropSettings) -> Result<CropRegion, DomainError> {
    let max_size = container.min_side();
    if max_size < settings.min_size {
        return Err(DomainError::InvalidInput(format!(
            "Container {}x{} cannot hold a {}px crop region",
            container.width, container.height, settings.min_size
        )));
    }

    let rect = geometry::compute_display_rect(container, media);
    let size = (rect.min_side() * settings.initial_fraction).clamp(settings.min_size, max_size);
    let x = rect.offset_x + (rect.width - size) / 2.0;
    let y = rect.offset_y + (rect.height - size) / 2.0;

    Ok(CropRegion::new(
        x.clamp(0.0, max_origin(container.width, size)),
        y.clamp(0.0, max_origin(container.height, size)),
        size,
    ))
}

/// Which part of the region a point lands on; corner handles win over the body
pub fn hit_test(region: &CropRegion, point: Point, handle_radius: f64) -> Option<PointerTarget> {
    let near = |corner: Point| (point.x - corner.x).abs() <= handle_radius && (point.y - corner.y).abs() <= handle_radius;

    if let Some(corner) = Corner::ALL.into_iter().find(|c| near(region.corner(*c))) {
        return Some(PointerTarget::Handle(corner));
    }
    if region.contains(point) {
        return Some(PointerTarget::Body);
    }
    None
}

/// Follow the pointer while keeping the whole region inside the container
pub fn drag_region(region: &CropRegion, container: Size, pointer: Point, grab_offset: Point) -> Option<CropRegion> {
    if !(pointer.x.is_finite() && pointer.y.is_finite()) {
        return None;
    }
    let max_x = max_origin(container.width, region.size);
    let max_y = max_origin(container.height, region.size);
    Some(CropRegion::new(
        (pointer.x - grab_offset.x).max(0.0).min(max_x),
        (pointer.y - grab_offset.y).max(0.0).min(max_y),
        region.size,
    ))
}

/// Resize from `corner` with the opposite corner fixed at `anchor`.
///
/// The edge is the smaller of the two axis distances from the anchor, so the
/// region stays square when the pointer moves diagonally. Returns `None` when
/// the resulting square would leave the container.
pub fn resize_region(container: Size, min_size: f64, corner: Corner, anchor: Point, pointer: Point) -> Option<CropRegion> {
    if !(pointer.x.is_finite() && pointer.y.is_finite()) {
        return None;
    }
    let max_size = container.min_side();
    if max_size < min_size {
        return None;
    }

    let east = matches!(corner, Corner::Ne | Corner::Se);
    let south = matches!(corner, Corner::Sw | Corner::Se);

    let dx = if east { pointer.x - anchor.x } else { anchor.x - pointer.x };
    let dy = if south { pointer.y - anchor.y } else { anchor.y - pointer.y };
    let size = dx.min(dy).clamp(min_size, max_size);

    // A west or north origin derived from an anchor on the far edge can overshoot it by one ulp
    let x = if east { anchor.x } else { (anchor.x - size).min(max_origin(container.width, size)) };
    let y = if south { anchor.y } else { (anchor.y - size).min(max_origin(container.height, size)) };

    let candidate = CropRegion::new(x, y, size);
    candidate.satisfies(container, min_size).then_some(candidate)
}

/// Arrow-key nudge; `None` means the key is not ours
pub fn nudge_region(region: &CropRegion, container: Size, key: &Key, step: f64) -> Option<CropRegion> {
    let max_x = max_origin(container.width, region.size);
    let max_y = max_origin(container.height, region.size);
    let mut next = *region;
    match key {
        Key::ArrowLeft => next.x = (region.x - step).max(0.0),
        Key::ArrowRight => next.x = (region.x + step).min(max_x),
        Key::ArrowUp => next.y = (region.y - step).max(0.0),
        Key::ArrowDown => next.y = (region.y + step).min(max_y),
        Key::Other(_) => return None,
    }
    Some(next)
}

/// Clamp an existing region into a new container without rescaling it
pub fn reclamp_region(region: &CropRegion, container: Size, min_size: f64) -> Result<CropRegion, DomainError> {
    let max_size = container.min_side();
    if max_size < min_size {
        return Err(DomainError::InvalidInput(format!(
            "Container {}x{} is too small for a {}px crop region",
            container.width, container.height, min_size
        )));
    }
    let size = region.size.clamp(min_size, max_size);
    Ok(CropRegion::new(
        region.x.max(0.0).min(max_origin(container.width, size)),
        region.y.max(0.0).min(max_origin(container.height, size)),
        size,
    ))
}

/// Move and scale a region so it covers the same media pixels under a new display rect
pub fn refit_region(region: &CropRegion, old_rect: &DisplayRect, new_rect: &DisplayRect) -> CropRegion {
    let scale = new_rect.width / old_rect.width;
    CropRegion::new(
        new_rect.offset_x + (region.x - old_rect.offset_x) * scale,
        new_rect.offset_y + (region.y - old_rect.offset_y) * scale,
        region.size * scale,
    )
}

/// Owner of the crop state for one session
#[derive(Debug, Default)]
pub struct CropRegionController {
    settings: CropSettings,
    state: Option<CropState>,
}

impl CropRegionController {
    /// Create a controller with no media loaded
    pub fn new(settings: CropSettings) -> Self {
        Self { settings, state: None }
    }

    pub fn settings(&self) -> &CropSettings {
        &self.settings
    }

    /// Place the default region once media metadata and final layout are known
    pub fn initialize(&mut self, container: Size, media: MediaDimensions) -> Result<CropRegion, DomainError> {
        let state = CropState::new(container, media, &self.settings)?;
        let region = state.region;
        debug!(
            "Crop region initialized at ({:.2}, {:.2}) size {:.2} in {}x{}",
            region.x, region.y, region.size, container.width, container.height
        );
        self.state = Some(state);
        Ok(region)
    }

    /// Place a caller-chosen region, validating every invariant first
    pub fn set_region(&mut self, region: CropRegion) -> Result<(), DomainError> {
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| DomainError::InvalidInput("No media loaded".to_string()))?;
        region.validate(state.container, self.settings.min_size)?;
        state.region = region;
        state.interaction = InteractionState::Idle;
        Ok(())
    }

    /// Feed one event; before initialization every event is ignored
    pub fn handle(&mut self, event: &CropEvent) -> Result<EventOutcome, DomainError> {
        match self.state.as_mut() {
            Some(state) => state.apply(event, &self.settings),
            None => Ok(EventOutcome::Ignored),
        }
    }

    pub fn pointer_down(&mut self, point: Point, target: Option<PointerTarget>) -> Result<EventOutcome, DomainError> {
        self.handle(&CropEvent::PointerDown { x: point.x, y: point.y, target })
    }

    pub fn pointer_move(&mut self, point: Point) -> Result<EventOutcome, DomainError> {
        self.handle(&CropEvent::PointerMove { x: point.x, y: point.y })
    }

    pub fn pointer_up(&mut self) -> Result<EventOutcome, DomainError> {
        self.handle(&CropEvent::PointerUp)
    }

    pub fn key_down(&mut self, key: Key, modifier: bool) -> Result<EventOutcome, DomainError> {
        self.handle(&CropEvent::KeyDown { key, modifier })
    }

    pub fn resize_container(&mut self, container: Size) -> Result<EventOutcome, DomainError> {
        self.handle(&CropEvent::ContainerResized {
            width: container.width,
            height: container.height,
        })
    }

    pub fn hit_test(&self, point: Point) -> Option<PointerTarget> {
        let state = self.state.as_ref()?;
        hit_test(&state.region, point, self.settings.handle_radius)
    }

    pub fn state(&self) -> Option<&CropState> {
        self.state.as_ref()
    }

    pub fn region(&self) -> Option<CropRegion> {
        self.state.as_ref().map(|s| s.region)
    }

    pub fn interaction(&self) -> InteractionState {
        self.state.as_ref().map(|s| s.interaction).unwrap_or_default()
    }

    pub fn source_crop(&self) -> Option<SourceCropParams> {
        self.state.as_ref().map(CropState::source_crop)
    }

    /// Forget the media and region
    pub fn reset(&mut self) {
        self.state = None;
    }
}
