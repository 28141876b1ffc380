use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Maximum encoded length of a proposal label, in bytes.
pub const MAX_LABEL_BYTES: usize = 32;

/// Short, opaque proposal name.
///
/// Labels are fixed-width on the wire (32 bytes), so the UTF-8 encoding of a
/// label may not exceed [`MAX_LABEL_BYTES`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProposalLabel(String);

impl ProposalLabel {
    pub fn new(label: impl Into<String>) -> Result<Self, TypeError> {
        let label = label.into();
        if label.len() > MAX_LABEL_BYTES {
            return Err(TypeError::LabelTooLong {
                max: MAX_LABEL_BYTES,
                actual: label.len(),
            });
        }
        Ok(Self(label))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProposalLabel {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProposalLabel> for String {
    fn from(label: ProposalLabel) -> Self {
        label.0
    }
}

impl fmt::Display for ProposalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
