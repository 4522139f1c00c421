mod client;
pub use client::*;
#[cfg(feature = "mongodb")]
mod mongo;
#[cfg(feature = "mongodb")]
pub use mongo::MongoIndex;
mod sqlite;
pub use sqlite::SqliteIndex;

use crate::config::Config;
use crate::error::EngineError;

/// Opens the Landmark Index backend selected by `cfg.db_type` ("sqlite" or
/// "mongo"). Unrecognized types, or "mongo" without the `mongodb` Cargo
/// feature enabled, are a startup-time error.
pub fn open_index(cfg: &Config) -> Result<Box<dyn LandmarkIndex>, EngineError> {
    match cfg.db_type.as_str() {
        "sqlite" => {
            let pool_size = num_cpus::get();
            let index = SqliteIndex::open(&cfg.db_file, pool_size)?;
            Ok(Box::new(index))
        }
        "mongo" => {
            #[cfg(feature = "mongodb")]
            {
                let uri = if cfg.db_user.is_empty() || cfg.db_pass.is_empty() {
                    format!("mongodb://{}:{}", cfg.db_host, cfg.db_port)
                } else {
                    format!(
                        "mongodb://{}:{}@{}:{}",
                        cfg.db_user, cfg.db_pass, cfg.db_host, cfg.db_port
                    )
                };
                let index = mongo::MongoIndex::open(&uri, &cfg.db_name)?;
                Ok(Box::new(index))
            }
            #[cfg(not(feature = "mongodb"))]
            {
                Err(EngineError::Index(
                    "mongo backend requested but crate was built without the \"mongodb\" feature".into(),
                ))
            }
        }
        other => Err(EngineError::Index(format!("unsupported db type: {}", other))),
    }
}
