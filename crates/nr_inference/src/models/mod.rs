use std::sync::Arc;

use nr_core::{Error, Paraphraser, Result};

use crate::Config;

pub mod dummy;
pub mod remote;

pub use dummy::DummyModel;
pub use remote::RemoteParaphraser;

pub fn create_model(config: Option<Config>) -> Result<Arc<dyn Paraphraser>> {
    let config = config.unwrap_or_default();
    match config.model_name.as_str() {
        "remote" => Ok(Arc::new(RemoteParaphraser::new(&config)?)),
        "dummy" => Ok(Arc::new(DummyModel::new())),
        other => Err(Error::Paraphrase(format!("Unknown paraphraser: {}", other))),
    }
}
