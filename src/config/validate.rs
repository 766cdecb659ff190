// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, SimpleMrError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::SimpleMrError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.job, raw.worker))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_job(cfg)?;
    validate_worker(cfg)?;
    Ok(())
}

fn validate_job(cfg: &RawConfigFile) -> Result<()> {
    // `backend` and `progress` are strongly typed and validated during
    // deserialization.
    if cfg.job.parallelism == 0 {
        return Err(SimpleMrError::ConfigError(
            "[job].parallelism must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_worker(cfg: &RawConfigFile) -> Result<()> {
    let Some(worker) = &cfg.worker else {
        return Ok(());
    };

    if worker.program.as_os_str().is_empty() {
        return Err(SimpleMrError::ConfigError(
            "[worker].program must not be empty".to_string(),
        ));
    }

    Ok(())
}
