use std::sync::Arc;

use nr_pipeline::Pipeline;

pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}
