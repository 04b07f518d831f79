// Session interactor - Replays interaction events through the crop controller

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::crop::{CropEvent, CropRegionController, CropSettings, EventOutcome, InteractionState};
use crate::domain::errors::*;
use crate::domain::model::*;

/// A recorded interaction session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionScript {
    pub container: Size,
    pub media: MediaDimensions,
    /// Replaces the default centered region before replay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<CropRegion>,
    #[serde(default)]
    pub events: Vec<CropEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StepOutcome {
    Applied,
    NoChange,
    Ignored,
    Rejected { reason: String },
}

impl From<EventOutcome> for StepOutcome {
    fn from(outcome: EventOutcome) -> Self {
        match outcome {
            EventOutcome::Applied => StepOutcome::Applied,
            EventOutcome::NoChange => StepOutcome::NoChange,
            EventOutcome::Ignored => StepOutcome::Ignored,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStep {
    pub index: usize,
    pub event: CropEvent,
    pub outcome: StepOutcome,
    pub region: CropRegion,
    pub interaction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub initial_region: CropRegion,
    pub steps: Vec<SessionStep>,
    pub final_region: CropRegion,
    pub container: Size,
    pub display_rect: DisplayRect,
    pub source_crop: SourceCropParams,
}

fn describe(interaction: InteractionState) -> String {
    match interaction {
        InteractionState::Idle => "idle".to_string(),
        InteractionState::Dragging { .. } => "dragging".to_string(),
        InteractionState::Resizing { corner, .. } => format!("resizing {}", corner),
    }
}

/// Interactor for replaying crop sessions
pub struct SessionInteractor {
    settings: CropSettings,
}

impl SessionInteractor {
    pub fn new(settings: CropSettings) -> Self {
        Self { settings }
    }

    pub fn execute(&self, script: &SessionScript) -> Result<SessionReport, DomainError> {
        let mut controller = CropRegionController::new(self.settings);
        let initial_region = controller.initialize(script.container, script.media)?;
        if let Some(region) = script.region {
            controller.set_region(region)?;
        }
        let initial_region = controller.region().unwrap_or(initial_region);
        info!("Replaying {} events", script.events.len());

        let mut steps = Vec::with_capacity(script.events.len());
        for (index, event) in script.events.iter().enumerate() {
            let outcome = match controller.handle(event) {
                Ok(outcome) => outcome.into(),
                Err(e) => StepOutcome::Rejected { reason: e.to_string() },
            };
            let region = controller.region().unwrap_or(initial_region);
            debug!("#{} {:?} -> {:?}", index, event, outcome);
            steps.push(SessionStep {
                index,
                event: event.clone(),
                outcome,
                region,
                interaction: describe(controller.interaction()),
            });
        }

        let state = controller
            .state()
            .ok_or_else(|| DomainError::InvalidInput("Crop controller was not initialized".to_string()))?;

        Ok(SessionReport {
            initial_region,
            steps,
            final_region: state.region,
            container: state.container,
            display_rect: state.display_rect(),
            source_crop: state.source_crop(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(events: &str) -> SessionScript {
        serde_json::from_str(&format!(
            r#"{{"container": {{"width": 800, "height": 450}},
                "media": {{"width": 1920, "height": 1080}},
                "events": {}}}"#,
            events
        ))
        .unwrap()
    }

    #[test]
    fn test_replay_drag_session() {
        let report = SessionInteractor::new(CropSettings::default())
            .execute(&script(
                r#"[
                    {"type": "pointer_down", "x": 400, "y": 225},
                    {"type": "pointer_move", "x": 390, "y": 258.75},
                    {"type": "pointer_up"}
                ]"#,
            ))
            .unwrap();

        assert_eq!(report.initial_region, CropRegion::new(310.0, 135.0, 180.0));
        assert_eq!(report.steps.len(), 3);
        assert_eq!(report.steps[0].interaction, "dragging");
        assert_eq!(report.steps[1].outcome, StepOutcome::Applied);
        assert_eq!(report.steps[2].interaction, "idle");
        assert_eq!(report.final_region, CropRegion::new(300.0, 168.75, 180.0));
        assert_eq!(report.source_crop, SourceCropParams::new(720, 405, 432));
    }

    #[test]
    fn test_rejected_container_resize_is_recorded() {
        let report = SessionInteractor::new(CropSettings::default())
            .execute(&script(r#"[{"type": "container_resized", "width": 30, "height": 30}]"#))
            .unwrap();

        assert!(matches!(report.steps[0].outcome, StepOutcome::Rejected { .. }));
        assert_eq!(report.final_region, report.initial_region);
        assert_eq!(report.container, Size::new(800.0, 450.0).unwrap());
    }

    #[test]
    fn test_scripted_start_region_must_be_valid() {
        let mut bad = script("[]");
        bad.region = Some(CropRegion::new(700.0, 0.0, 180.0));
        assert!(SessionInteractor::new(CropSettings::default()).execute(&bad).is_err());
    }
}
