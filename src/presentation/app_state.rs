// Application state for HTTP handlers
use crate::application::intensity_service::CarbonIntensityService;

#[derive(Clone)]
pub struct AppState {
    pub intensity_service: CarbonIntensityService,
}
