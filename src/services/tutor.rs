use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::storage::{ProgressRecord, UserSettings};

const PIN_MIN_LEN: usize = 4;
const PIN_MAX_LEN: usize = 8;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TutorError {
    #[error("incorrect tutor PIN")]
    IncorrectPin,
    #[error("PIN must be 4-8 digits")]
    InvalidPin,
}

pub fn hash_pin(pin: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pin.as_bytes());
    hex::encode(hasher.finalize())
}

/// 校验导师 PIN，不做去空白处理，也没有错误次数限制
pub fn verify_pin(settings: &UserSettings, attempt: &str) -> Result<(), TutorError> {
    if hash_pin(&settings.pin) == hash_pin(attempt) {
        Ok(())
    } else {
        tracing::info!("tutor PIN rejected");
        Err(TutorError::IncorrectPin)
    }
}

pub fn validate_pin(pin: &str) -> Result<(), TutorError> {
    let len_ok = (PIN_MIN_LEN..=PIN_MAX_LEN).contains(&pin.len());
    if len_ok && pin.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(TutorError::InvalidPin)
    }
}

/// 修改 PIN：先校验旧 PIN，再校验新 PIN 格式
pub fn change_pin(
    record: &ProgressRecord,
    current: &str,
    new_pin: &str,
) -> Result<ProgressRecord, TutorError> {
    verify_pin(&record.settings, current)?;
    validate_pin(new_pin)?;

    let mut next = record.clone();
    next.settings.pin = new_pin.to_string();
    tracing::info!("tutor PIN changed");
    Ok(next)
}
