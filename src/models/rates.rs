use std::collections::HashMap;

use serde::Deserialize;

/// Exchange rate table as served by the backend: a base currency and a
/// map of ISO 4217 codes to units-per-base rates.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RatesPayload {
    pub base: String,
    pub rates: HashMap<String, f64>,
}
