// Application layer - Use case interactors

pub mod container;
pub mod generate_interactor;
pub mod inspect_interactor;
pub mod session_interactor;

// Re-export interactors
pub use container::{AppContainer, DefaultAppContainer};
pub use generate_interactor::{CropSelection, GenerateCommand, GenerateInteractor};
pub use inspect_interactor::{InspectFormat, InspectInteractor, InspectRequest, InspectResponse};
pub use session_interactor::{SessionInteractor, SessionReport, SessionScript};
