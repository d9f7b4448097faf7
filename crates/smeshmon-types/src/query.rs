use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => f.write_str("ASC"),
            SortOrder::Desc => f.write_str("DESC"),
        }
    }
}

/// A bounded, ordered request for timestamped records in `[from, to]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowQuery {
    pub order: SortOrder,
    pub to: Millis,
    pub from: Option<Millis>,
    pub limit: usize,
}

impl WindowQuery {
    pub fn contains(&self, time: Millis) -> bool {
        time <= self.to && self.from.map_or(true, |from| time >= from)
    }
}
